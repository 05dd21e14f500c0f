//! Batch conversion dispatcher: fans independent file conversions out over a
//! bounded worker pool and collects one result per task.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::mesh::{self, MeshError};

/// One file to convert. The output format is implied by the output path's
/// extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTask {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl ConversionTask {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        ConversionTask {
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }
}

/// Outcome of one conversion task. `error` is empty exactly when `success`
/// is true, and `size_delta_percent` is 0.0 whenever the task failed or the
/// input file was empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub input_path: PathBuf,
    pub success: bool,
    pub error: String,
    pub size_delta_percent: f64,
}

/// Percentage shrink from original to converted file size. Negative when the
/// output grew; 0.0 for a zero-byte original (not an error, just no ratio).
fn size_delta_percent(original: u64, converted: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - converted as f64) / original as f64 * 100.0
}

fn try_convert(task: &ConversionTask) -> Result<f64, MeshError> {
    let stat = |path: &Path| -> Result<u64, MeshError> {
        std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|source| MeshError::Read {
                path: path.to_path_buf(),
                source,
            })
    };

    let original_size = stat(&task.input_path)?;
    let mesh = mesh::load(&task.input_path)?;
    mesh::export(&mesh, &task.output_path)?;
    let converted_size = stat(&task.output_path)?;
    Ok(size_delta_percent(original_size, converted_size))
}

/// Convert a single file. Never fails outward: every error is absorbed into
/// the returned result so one bad file cannot take down a batch.
pub fn convert_one(task: &ConversionTask) -> ConversionResult {
    match try_convert(task) {
        Ok(size_delta_percent) => {
            info!(
                "converted {:?} -> {:?} ({:+.1}%)",
                task.input_path, task.output_path, size_delta_percent
            );
            ConversionResult {
                input_path: task.input_path.clone(),
                success: true,
                error: String::new(),
                size_delta_percent,
            }
        }
        Err(e) => {
            warn!("conversion of {:?} failed: {}", task.input_path, e);
            ConversionResult {
                input_path: task.input_path.clone(),
                success: false,
                error: e.to_string(),
                size_delta_percent: 0.0,
            }
        }
    }
}

/// Run a batch of conversions on a pool of `min(core count, task count)`
/// workers. Blocks until every task has finished and returns results in task
/// order. The pool lives only for this call. An empty batch returns an empty
/// vec; callers are expected to validate beforehand.
pub fn run_batch(tasks: &[ConversionTask]) -> Vec<ConversionResult> {
    if tasks.is_empty() {
        return Vec::new();
    }

    let workers = num_cpus::get().min(tasks.len());
    info!("running batch of {} tasks on {} workers", tasks.len(), workers);

    let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(e) => {
            // No pool, no parallelism; the batch still runs.
            warn!("failed to build worker pool, converting serially: {}", e);
            return tasks.iter().map(convert_one).collect();
        }
    };

    pool.install(|| tasks.par_iter().map(convert_one).collect())
}
