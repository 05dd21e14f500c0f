//! OBJ reader built on tobj. Input only; the converter never writes OBJ.

use crate::mesh::{MeshError, TriangleMesh};
use nalgebra::Vector3;
use std::path::Path;
use tracing::debug;

/// Read a TriangleMesh in from an obj file. All models in the file are
/// merged into one mesh, which is the normalization policy the converter
/// relies on for multi-object inputs.
pub fn read_obj_file(path: &Path) -> Result<TriangleMesh, MeshError> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| MeshError::Parse {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    let mut result = TriangleMesh::new();
    for model in &models {
        let mut part = TriangleMesh::with_capacity(
            model.mesh.positions.len() / 3,
            model.mesh.indices.len() / 3,
        );
        for chunk in model.mesh.positions.chunks_exact(3) {
            part.add_node(Vector3::new(chunk[0], chunk[1], chunk[2]));
        }
        for chunk in model.mesh.indices.chunks_exact(3) {
            let indices = [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize];
            if let Some(&out_of_range) = indices.iter().find(|&&i| i >= part.node_len()) {
                return Err(MeshError::Parse {
                    path: path.to_path_buf(),
                    details: format!(
                        "model {:?}: face index {} out of range ({} vertices)",
                        model.name,
                        out_of_range,
                        part.node_len()
                    ),
                });
            }
            part.add_triangle(indices);
        }
        result.append(&part);
    }

    debug!(
        "obj {:?}: {} models merged into {} nodes, {} triangles",
        path,
        models.len(),
        result.node_len(),
        result.triangle_len()
    );
    Ok(result)
}
