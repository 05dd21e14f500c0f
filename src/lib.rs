//! meshport: batch conversion of STL, PLY, and OBJ mesh files.
//!
//! The library side is the conversion machinery (mesh I/O, the batch
//! dispatcher, and session state); the `app` module carries the egui shell
//! the binary wraps around it.

pub mod app;
pub mod convert;
pub mod mesh;
pub mod session;

pub use convert::{convert_one, run_batch, ConversionResult, ConversionTask};
pub use mesh::{MeshError, TriangleMesh};
pub use session::{BatchOutcome, OutputFormat, Session, SessionError};
