//! Small generated meshes shared by the unit tests

use decimesh_core::{Point3f, TriangleMesh};

pub(crate) fn make_tetrahedron() -> TriangleMesh {
    // Consistently wound: each shared edge appears in opposite directions
    TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.5, 1.0, 0.0),
            Point3f::new(0.5, 0.5, 1.0),
        ],
        vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    )
}

/// Unit cube, outward winding, 8 vertices and 12 triangles.
pub(crate) fn make_cube() -> TriangleMesh {
    TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
        ],
        vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ],
    )
}

/// Open cylinder band of unit radius and height: two rings of `segments`
/// vertices, so every vertex lies on the boundary.
pub(crate) fn make_open_cylinder(segments: usize) -> TriangleMesh {
    let ring = |z: f32| {
        (0..segments).map(move |i| {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            Point3f::new(angle.cos(), angle.sin(), z)
        })
    };
    let vertices: Vec<Point3f> = ring(1.0).chain(ring(0.0)).collect();
    let mut faces = Vec::with_capacity(segments * 2);
    for i in 0..segments {
        let (tl, tr) = (i, (i + 1) % segments);
        let (bl, br) = (tl + segments, tr + segments);
        faces.push([tl, bl, tr]);
        faces.push([tr, bl, br]);
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

pub(crate) fn make_plane_grid(size: usize) -> TriangleMesh {
    make_height_grid(size, |_, _| 0.0)
}

pub(crate) fn make_curved_surface(size: usize) -> TriangleMesh {
    make_height_grid(size, |x, y| {
        let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
        let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
        (fx.sin() * fy.sin()) * 2.0
    })
}

fn make_height_grid(size: usize, height: impl Fn(usize, usize) -> f32) -> TriangleMesh {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            vertices.push(Point3f::new(x as f32, y as f32, height(x, y)));
        }
    }
    let mut faces = Vec::with_capacity((size - 1) * (size - 1) * 2);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}
