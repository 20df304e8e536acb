//! OBJ format support
//!
//! Only vertex positions and faces are read; texture coordinates, normals,
//! materials and groups are ignored. Polygons are fan-triangulated.

use crate::{MeshReader, MeshWriter};
use decimesh_core::{Error, Point3f, Result, TriangleMesh};
use obj::ObjData;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

impl ObjReader {
    /// Parse an OBJ document from any reader.
    pub fn read_obj<R: Read>(reader: R) -> Result<TriangleMesh> {
        let data = ObjData::load_buf(reader).map_err(|e| Error::Parse(format!("OBJ: {}", e)))?;

        let vertices: Vec<Point3f> = data
            .position
            .iter()
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();

        let mut faces = Vec::new();
        let mut skipped = 0;
        for group in data.objects.iter().flat_map(|o| o.groups.iter()) {
            for poly in &group.polys {
                let corners = &poly.0;
                if corners.len() < 3 {
                    skipped += 1;
                    continue;
                }
                for i in 1..corners.len() - 1 {
                    faces.push([corners[0].0, corners[i].0, corners[i + 1].0]);
                }
            }
        }
        if skipped > 0 {
            log::warn!("skipped {} OBJ faces with fewer than 3 corners", skipped);
        }

        let mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        mesh.validate_indices()?;
        log::debug!(
            "read OBJ mesh: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.face_count()
        );
        Ok(mesh)
    }
}

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        Self::read_obj(BufReader::new(file))
    }
}

impl ObjWriter {
    /// Write `mesh` as `v` and 1-based `f` records.
    pub fn write_obj<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for f in &mesh.faces {
            writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_obj(mesh, &mut writer)
    }
}
