//! STL (stereolithography) format support.
//!
//! STL stores an unindexed triangle soup, so loading merges corners closer
//! than [`EPSILON`] before pairing. Saving triangulates polygons on the fly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::algo::triangulate::triangulate_polygon;
use crate::error::{MeshError, Result};
use crate::mesh::{build_from_facelist, FacelistOptions, HalfEdgeMesh, MeshIndex, EPSILON};

/// Load a mesh from an STL file, binary or ASCII.
///
/// # Example
///
/// ```no_run
/// use hemesh::io::stl;
/// use hemesh::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = stl::load("model.stl").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let stl = stl_io::read_stl(&mut file).map_err(|e| MeshError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if stl.faces.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "STL file contains no triangles".to_string(),
        });
    }

    let vertices: Vec<Point3<f64>> = stl
        .vertices
        .iter()
        .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect();
    let faces: Vec<[usize; 3]> = stl.faces.iter().map(|t| t.vertices).collect();

    let options = FacelistOptions::new()
        .with_merge_duplicates(true)
        .with_epsilon(EPSILON);
    build_from_facelist(&vertices, &faces, &options)
}

fn to_stl_vertex(p: &Point3<f64>) -> stl_io::Vertex {
    stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])
}

/// Save a mesh to a binary STL file.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &HalfEdgeMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();

    let mut triangles: Vec<stl_io::Triangle> = Vec::with_capacity(mesh.num_faces());
    for f in mesh.face_ids() {
        let corners: Vec<Point3<f64>> = mesh.face_vertices(f).map(|v| *mesh.position(v)).collect();
        let n = mesh.face_normal(f);
        for [a, b, c] in triangulate_polygon(&corners) {
            triangles.push(stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [
                    to_stl_vertex(&corners[a]),
                    to_stl_vertex(&corners[b]),
                    to_stl_vertex(&corners[c]),
                ],
            });
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_quads;

    #[test]
    fn test_save_then_load_merges_corners() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        let mesh: HalfEdgeMesh =
            build_from_quads(&vertices, &[[0, 1, 2, 3], [1, 4, 5, 2]]).unwrap();

        let path = std::env::temp_dir().join("hemesh_stl_roundtrip.stl");
        save(&mesh, &path).unwrap();
        let loaded: HalfEdgeMesh = load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.num_faces(), 4);
        assert_eq!(loaded.num_vertices(), 6);
        assert!(loaded.face_ids().all(|f| loaded.face_order(f) == 3));
        assert!((loaded.surface_area() - 2.0).abs() < 1e-6);
        assert!(loaded.is_valid());
    }
}
