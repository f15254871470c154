//! Wavefront OBJ format support.
//!
//! Only `v` and `f` records are read. Texture coordinates, normals, groups and
//! materials are skipped. Face corners may use the `v/vt/vn` forms and
//! negative (relative) indices.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_facelist, to_facelist, FacelistOptions, HalfEdgeMesh, MeshIndex};

/// Load a mesh from an OBJ file.
///
/// # Example
///
/// ```no_run
/// use hemesh::io::obj;
/// use hemesh::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read(BufReader::new(file), path)
}

/// Parse OBJ text from `reader`. `path` is only used in error messages.
pub fn read<R: BufRead, I: MeshIndex>(reader: R, path: &Path) -> Result<HalfEdgeMesh<I>> {
    let load_error = |line: usize, message: String| MeshError::LoadError {
        path: path.to_path_buf(),
        message: format!("line {}: {}", line, message),
    };

    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<Vec<usize>> = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = n + 1;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(|t| t.parse::<f64>())
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| load_error(line_no, e.to_string()))?;
                if coords.len() != 3 {
                    return Err(load_error(line_no, "vertex needs three coordinates".into()));
                }
                vertices.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let mut face = Vec::new();
                for corner in tokens {
                    let index = corner.split('/').next().unwrap_or(corner);
                    let raw: i64 = index
                        .parse()
                        .map_err(|_| load_error(line_no, format!("bad face index {:?}", corner)))?;
                    let resolved = if raw > 0 {
                        raw - 1
                    } else {
                        vertices.len() as i64 + raw
                    };
                    if raw == 0 || resolved < 0 {
                        return Err(load_error(line_no, format!("face index {} out of range", raw)));
                    }
                    face.push(resolved as usize);
                }
                faces.push(face);
            }
            _ => {}
        }
    }

    if faces.is_empty() {
        return Err(MeshError::LoadError {
            path: path.to_path_buf(),
            message: "OBJ file contains no faces".to_string(),
        });
    }
    build_from_facelist(&vertices, &faces, &FacelistOptions::default())
}

/// Save a mesh to an OBJ file.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &HalfEdgeMesh<I>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write `mesh` as OBJ text.
pub fn write<W: Write, I: MeshIndex>(mesh: &HalfEdgeMesh<I>, writer: &mut W) -> Result<()> {
    let (vertices, faces) = to_facelist(mesh);
    writeln!(writer, "# hemesh")?;
    for v in &vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for f in &faces {
        write!(writer, "f")?;
        for i in f {
            write!(writer, " {}", i + 1)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CUBE_TOP: &str = "\
# open box lid
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
vt 0 0
f 1/1 2/1 3/1 4/1
";

    #[test]
    fn test_read_polygon() {
        let mesh: HalfEdgeMesh = read(Cursor::new(CUBE_TOP), Path::new("lid.obj")).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.face_order(mesh.face_at(0).unwrap()), 4);
        assert_eq!(mesh.num_halfedges(), 8);
        assert_eq!(mesh.num_unpaired_halfedges(), 0);
    }

    #[test]
    fn test_relative_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh: HalfEdgeMesh = read(Cursor::new(text), Path::new("tri.obj")).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_vertices(), 3);
    }

    #[test]
    fn test_read_errors() {
        let path = Path::new("bad.obj");
        let no_faces = "v 0 0 0\n";
        assert!(read::<_, u32>(Cursor::new(no_faces), path).is_err());

        let zero_index = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n";
        assert!(matches!(
            read::<_, u32>(Cursor::new(zero_index), path),
            Err(MeshError::LoadError { .. })
        ));

        let out_of_range = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n";
        assert!(matches!(
            read::<_, u32>(Cursor::new(out_of_range), path),
            Err(MeshError::InvalidVertexIndex { face: 0, vertex: 8 })
        ));
    }

    #[test]
    fn test_write_then_read() {
        let mesh: HalfEdgeMesh = read(Cursor::new(CUBE_TOP), Path::new("lid.obj")).unwrap();
        let mut buffer = Vec::new();
        write(&mesh, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.lines().any(|l| l == "f 1 2 3 4"));
        let again: HalfEdgeMesh = read(Cursor::new(text), Path::new("lid.obj")).unwrap();
        assert_eq!(again.num_faces(), 1);
        assert_eq!(again.num_vertices(), 4);
    }
}
