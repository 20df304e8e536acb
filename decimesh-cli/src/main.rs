//! `decimesh`: decimate an OBJ mesh to a fraction of its triangles

use anyhow::{bail, Context, Result};
use clap::Parser;
use decimesh_simplification::{
    simplify_with_options, DecimationOptions, MIN_INPUT_ELEMENTS, MIN_TARGET_TRIANGLES,
};
use std::path::PathBuf;
use std::time::Instant;

/// Quadric mesh decimation.
#[derive(Parser, Debug)]
#[command(name = "decimesh", version, about)]
struct Args {
    /// Existing OBJ format mesh
    input: PathBuf,

    /// Name for the decimated OBJ format mesh
    output: PathBuf,

    /// Fraction of triangles to keep, e.g. 0.2 removes 80% of them
    #[arg(default_value_t = 0.5)]
    ratio: f32,

    /// Faster (higher) or better (lower) decimation
    #[arg(default_value_t = 7.0)]
    aggressiveness: f64,

    /// Percentile of flattest triangles eligible for collapse, in (0, 100]; 100 disables the limit
    #[arg(default_value_t = 10.0)]
    normal_threshold_ratio: f64,

    /// Upper bound on threshold passes
    #[arg(long, default_value_t = 100)]
    max_passes: usize,

    /// Refresh stale collapse candidates on one thread
    #[arg(long)]
    sequential: bool,

    /// Log per-pass progress (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Triangle target for `ratio` of `triangles`; ratios above one keep every
/// triangle.
fn resolve_target(triangles: usize, ratio: f32) -> Result<usize> {
    if !(ratio > 0.0) {
        bail!("Ratio must be between zero and one");
    }
    let ratio = f64::from(ratio.min(1.0));
    let target = (triangles as f64 * ratio).round() as usize;
    if target < MIN_TARGET_TRIANGLES {
        bail!("Object will not survive such extreme decimation");
    }
    Ok(target)
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let mesh = decimesh_io::read_mesh(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    if mesh.face_count() < MIN_INPUT_ELEMENTS || mesh.vertex_count() < MIN_INPUT_ELEMENTS {
        bail!(
            "{} is too small to decimate: {} vertices, {} triangles",
            args.input.display(),
            mesh.vertex_count(),
            mesh.face_count()
        );
    }
    let target = resolve_target(mesh.face_count(), args.ratio)?;

    let options = DecimationOptions::new()
        .with_target_count(target)
        .with_aggressiveness(args.aggressiveness)
        .with_normal_threshold_ratio(args.normal_threshold_ratio)
        .with_max_passes(args.max_passes)
        .with_parallel(!args.sequential);

    let start = Instant::now();
    println!(
        "Input: {} vertices, {} triangles (target {})",
        mesh.vertex_count(),
        mesh.face_count(),
        target
    );
    let (simplified, report) =
        simplify_with_options(&mesh, &options).context("decimation failed")?;
    if simplified.face_count() >= mesh.face_count() {
        println!("Unable to reduce mesh.");
    }

    decimesh_io::write_mesh(&simplified, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "Output: {} vertices, {} triangles ({:.6} reduction; {:.4} sec)",
        simplified.vertex_count(),
        simplified.face_count(),
        report.reduction(),
        start.elapsed().as_secs_f64()
    );
    log::info!("{:?} after {} passes", report.state, report.passes);
    Ok(())
}
