//! Mesh file I/O: format detection and the load/export entry points used by
//! the conversion dispatcher.

pub mod obj;
pub mod ply;
pub mod stl;
pub mod triangle_mesh;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use triangle_mesh::TriangleMesh;

/// Supported mesh file formats. OBJ is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Ply,
    Obj,
}

impl MeshFormat {
    /// Detect format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "stl" => Some(MeshFormat::Stl),
                "ply" => Some(MeshFormat::Ply),
                "obj" => Some(MeshFormat::Obj),
                _ => None,
            })
    }
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("unsupported mesh format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("cannot export {} as OBJ, output must be stl or ply", path.display())]
    ExportUnsupported { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {details}", path.display())]
    Parse { path: PathBuf, details: String },

    #[error("{} contains no triangles", path.display())]
    Empty { path: PathBuf },
}

/// Load a mesh, auto-detecting the format from the file extension.
///
/// Containers holding several sub-objects (OBJ models) come back merged into
/// one mesh. An input that parses but holds no triangles is an error.
pub fn load(path: &Path) -> Result<TriangleMesh, MeshError> {
    let format = MeshFormat::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let mesh = match format {
        MeshFormat::Stl => stl::read_stl_file(path)?,
        MeshFormat::Ply => ply::read_ply_file(path)?,
        MeshFormat::Obj => obj::read_obj_file(path)?,
    };

    if mesh.is_empty() {
        return Err(MeshError::Empty {
            path: path.to_path_buf(),
        });
    }

    debug!(
        "loaded {:?}: {} nodes, {} triangles",
        path,
        mesh.node_len(),
        mesh.triangle_len()
    );
    Ok(mesh)
}

/// Export a mesh, auto-detecting the format from the destination extension.
pub fn export(mesh: &TriangleMesh, path: &Path) -> Result<(), MeshError> {
    let format = MeshFormat::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    match format {
        MeshFormat::Stl => stl::write_stl_file(path, mesh)?,
        MeshFormat::Ply => ply::write_ply_file(path, mesh)?,
        MeshFormat::Obj => {
            return Err(MeshError::ExportUnsupported {
                path: path.to_path_buf(),
            })
        }
    }

    debug!("wrote {:?} ({} triangles)", path, mesh.triangle_len());
    Ok(())
}
