//! PLY codec built on ply-rs. The reader tolerates double-precision
//! coordinates, any integer flavor of index list, and unknown properties
//! (colors, normals, confidences) by skipping them; the writer emits binary
//! little-endian files.

use crate::mesh::{MeshError, TriangleMesh};
use nalgebra::Vector3;
use ply_rs::parser;
use ply_rs::ply;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use std::io::{BufReader, BufWriter};
use std::path::Path;

struct VertexWrapper(Vector3<f32>);

struct FaceWrapper(Vec<usize>);

impl ply::PropertyAccess for VertexWrapper {
    fn new() -> Self {
        VertexWrapper(Vector3::zeros())
    }

    fn set_property(&mut self, key: String, property: ply::Property) {
        // Coordinates may be declared with any scalar type; everything
        // list-typed is skipped.
        let value = match property {
            Property::Float(v) => v,
            Property::Double(v) => v as f32,
            Property::Char(v) => v as f32,
            Property::UChar(v) => v as f32,
            Property::Short(v) => v as f32,
            Property::UShort(v) => v as f32,
            Property::Int(v) => v as f32,
            Property::UInt(v) => v as f32,
            _ => return,
        };
        match key.as_ref() {
            "x" => self.0.x = value,
            "y" => self.0.y = value,
            "z" => self.0.z = value,
            _ => {}
        }
    }
}

impl ply::PropertyAccess for FaceWrapper {
    fn new() -> Self {
        FaceWrapper(Vec::new())
    }

    fn set_property(&mut self, key: String, property: ply::Property) {
        if key != "vertex_indices" && key != "vertex_index" {
            return;
        }
        self.0 = match property {
            Property::ListInt(vec) => vec.into_iter().map(|i| i as usize).collect(),
            Property::ListUInt(vec) => vec.into_iter().map(|i| i as usize).collect(),
            Property::ListShort(vec) => vec.into_iter().map(|i| i as usize).collect(),
            Property::ListUShort(vec) => vec.into_iter().map(|i| i as usize).collect(),
            Property::ListChar(vec) => vec.into_iter().map(|i| i as usize).collect(),
            Property::ListUChar(vec) => vec.into_iter().map(|i| i as usize).collect(),
            _ => return,
        };
    }
}

/// Read a TriangleMesh in from a ply file. Faces with more than three
/// indices are fanned into triangles; degenerate lists are rejected.
pub fn read_ply_file(path: &Path) -> Result<TriangleMesh, MeshError> {
    let input_file = std::fs::File::open(path).map_err(|source| MeshError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut input_reader = BufReader::new(input_file);

    let parse_error = |details: String| MeshError::Parse {
        path: path.to_path_buf(),
        details,
    };

    let vertex_parser = parser::Parser::<VertexWrapper>::new();
    let face_parser = parser::Parser::<FaceWrapper>::new();
    let header = vertex_parser
        .read_header(&mut input_reader)
        .map_err(|e| parse_error(e.to_string()))?;
    let mut vertex_list = Vec::new();
    let mut face_list = Vec::new();
    for (_ignore_key, element) in &header.elements {
        match element.name.as_ref() {
            "vertex" => {
                vertex_list = vertex_parser
                    .read_payload_for_element(&mut input_reader, element, &header)
                    .map_err(|e| parse_error(e.to_string()))?;
            }
            "face" => {
                face_list = face_parser
                    .read_payload_for_element(&mut input_reader, element, &header)
                    .map_err(|e| parse_error(e.to_string()))?;
            }
            // Other elements (edge, material, ...) carry nothing we keep,
            // but their payload must still be consumed to keep the stream
            // aligned for the elements that follow.
            _ => {
                vertex_parser
                    .read_payload_for_element(&mut input_reader, element, &header)
                    .map_err(|e| parse_error(e.to_string()))?;
            }
        }
    }

    let mut result = TriangleMesh::with_capacity(vertex_list.len(), face_list.len());
    for VertexWrapper(position) in vertex_list {
        result.add_node(position);
    }
    for FaceWrapper(indices) in face_list {
        if indices.len() < 3 {
            return Err(parse_error(format!(
                "face with {} indices, need at least 3",
                indices.len()
            )));
        }
        if let Some(&out_of_range) = indices.iter().find(|&&i| i >= result.node_len()) {
            return Err(parse_error(format!(
                "face index {} out of range ({} vertices)",
                out_of_range,
                result.node_len()
            )));
        }
        // Fan triangulation for quads and larger polygons.
        for i in 1..indices.len() - 1 {
            result.add_triangle([indices[0], indices[i], indices[i + 1]]);
        }
    }
    Ok(result)
}

/// Reconcile header counts with the payload. This happens on the export
/// path, so a failure here is a write error against the destination, not a
/// parse error.
fn finalize_ply(ply: &mut Ply<DefaultElement>, path: &Path) -> Result<(), MeshError> {
    ply.make_consistent().map_err(|e| MeshError::Write {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
    })
}

/// Write a TriangleMesh out as binary little-endian ply.
pub fn write_ply_file(path: &Path, mesh: &TriangleMesh) -> Result<(), MeshError> {
    let write_error = |source: std::io::Error| MeshError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::BinaryLittleEndian;

    let mut vertex_element = ElementDef::new("vertex".to_string());
    for name in ["x", "y", "z"] {
        vertex_element.properties.add(PropertyDef::new(
            name.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    }
    ply.header.elements.add(vertex_element);

    let mut face_element = ElementDef::new("face".to_string());
    face_element.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    ply.header.elements.add(face_element);

    let mut vertices = Vec::with_capacity(mesh.node_len());
    for position in &mesh.node_positions {
        let mut vertex = DefaultElement::new();
        vertex.insert("x".to_string(), Property::Float(position.x));
        vertex.insert("y".to_string(), Property::Float(position.y));
        vertex.insert("z".to_string(), Property::Float(position.z));
        vertices.push(vertex);
    }
    ply.payload.insert("vertex".to_string(), vertices);

    let mut faces = Vec::with_capacity(mesh.triangle_len());
    for &[a, b, c] in &mesh.triangle_indices {
        let mut face = DefaultElement::new();
        face.insert(
            "vertex_indices".to_string(),
            Property::ListInt(vec![a as i32, b as i32, c as i32]),
        );
        faces.push(face);
    }
    ply.payload.insert("face".to_string(), faces);

    finalize_ply(&mut ply, path)?;

    let output_file = std::fs::File::create(path).map_err(write_error)?;
    let mut output_writer = BufWriter::new(output_file);
    let writer = Writer::new();
    writer.write_ply(&mut output_writer, &mut ply).map_err(write_error)?;
    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use nalgebra::vector;

    fn write_fixture(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    const BLOCK_PLY: &str = "\
ply
format ascii 1.0
element vertex 8
property float x
property float y
property float z
element face 12
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
0 0 1
1 0 1
1 1 1
0 1 1
3 0 1 2
3 0 2 3
3 4 6 5
3 4 7 6
3 0 4 5
3 0 5 1
3 1 5 6
3 1 6 2
3 2 6 7
3 2 7 3
3 3 7 4
3 3 4 0
";

    #[test]
    fn read_ascii_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "block.ply", BLOCK_PLY);

        let mesh = read_ply_file(&path).unwrap();
        assert_eq!(mesh.node_len(), 8);
        assert_eq!(mesh.triangle_len(), 12);
        assert_eq!(*mesh.node(6), vector![1.0, 1.0, 1.0]);
        assert_eq!(*mesh.triangle(0), [0, 1, 2]);
    }

    #[test]
    fn read_skips_unknown_vertex_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "colored.ply",
            "\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255 0 0
1 0 0 0 255 0
0 1 0 0 0 255
3 0 1 2
",
        );

        let mesh = read_ply_file(&path).unwrap();
        assert_eq!(mesh.node_len(), 3);
        assert_eq!(mesh.triangle_len(), 1);
        assert_eq!(*mesh.node(1), vector![1.0, 0.0, 0.0]);
    }

    #[test]
    fn read_int_typed_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "int_coords.ply",
            "\
ply
format ascii 1.0
element vertex 3
property int x
property int y
property int z
element face 1
property list uchar int vertex_indices
end_header
10 0 0
0 10 0
0 0 10
3 0 1 2
",
        );

        let mesh = read_ply_file(&path).unwrap();
        assert_eq!(mesh.node_len(), 3);
        assert_eq!(*mesh.node(0), vector![10.0, 0.0, 0.0]);
        assert_eq!(*mesh.node(1), vector![0.0, 10.0, 0.0]);
        assert_eq!(*mesh.node(2), vector![0.0, 0.0, 10.0]);
    }

    #[test]
    fn read_double_typed_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "double_coords.ply",
            "\
ply
format ascii 1.0
element vertex 3
property double x
property double y
property double z
element face 1
property list uchar int vertex_indices
end_header
0.5 0 0
0 0.5 0
0 0 0.5
3 0 1 2
",
        );

        let mesh = read_ply_file(&path).unwrap();
        assert_eq!(*mesh.node(0), vector![0.5, 0.0, 0.0]);
        assert_eq!(*mesh.node(2), vector![0.0, 0.0, 0.5]);
    }

    #[test]
    fn read_fans_quad_faces() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "quad.ply",
            "\
ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
",
        );

        let mesh = read_ply_file(&path).unwrap();
        assert_eq!(mesh.node_len(), 4);
        assert_eq!(mesh.triangle_len(), 2);
        assert_eq!(*mesh.triangle(0), [0, 1, 2]);
        assert_eq!(*mesh.triangle(1), [0, 2, 3]);
    }

    #[test]
    fn read_rejects_out_of_range_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            dir.path(),
            "bad_index.ply",
            "\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 9
",
        );

        let result = read_ply_file(&path);
        assert!(matches!(result, Err(MeshError::Parse { .. })));
    }

    #[test]
    fn read_rejects_garbage_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "garbage.ply", "this is not a ply file\n");

        let result = read_ply_file(&path);
        assert!(matches!(result, Err(MeshError::Parse { .. })));
    }

    #[test]
    fn write_and_read_back() {
        let mut mesh = TriangleMesh::new();
        let indices = [
            mesh.add_node(vector![0.0, 0.0, 0.0]),
            mesh.add_node(vector![1.0, 0.0, 0.0]),
            mesh.add_node(vector![0.0, 1.0, 0.0]),
        ];
        mesh.add_triangle(indices);
        mesh.add_triangle([indices[2], indices[1], indices[0]]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ply");
        write_ply_file(&path, &mesh).unwrap();

        let reloaded = read_ply_file(&path).unwrap();
        assert_eq!(reloaded.node_len(), 3);
        assert_eq!(reloaded.triangle_len(), 2);
        assert_eq!(*reloaded.node(1), vector![1.0, 0.0, 0.0]);
        assert_eq!(*reloaded.triangle(1), [2, 1, 0]);
    }

    #[test]
    fn finalize_inconsistency_is_write_error() {
        // A payload element the header never declared cannot be made
        // consistent; that failure must read as an export problem.
        let mut ply = Ply::<DefaultElement>::new();
        ply.payload.insert("ghost".to_string(), vec![DefaultElement::new()]);

        let result = finalize_ply(&mut ply, Path::new("out.ply"));
        match result {
            Err(MeshError::Write { ref path, .. }) => {
                assert_eq!(path, Path::new("out.ply"));
            }
            other => panic!("expected write error, got {:?}", other),
        }
        let text = result.unwrap_err().to_string();
        assert!(text.starts_with("failed to write out.ply"), "{}", text);
    }

    #[test]
    fn write_to_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.ply");
        let result = write_ply_file(&path, &TriangleMesh::new());
        assert!(matches!(result, Err(MeshError::Write { .. })));
    }
}
