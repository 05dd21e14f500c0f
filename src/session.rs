//! Conversion session state: the user's selections, validation ahead of a
//! batch, and classification of a finished batch. Lives outside the widgets
//! so the dispatcher never reads ambient UI state.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::convert::{ConversionResult, ConversionTask};

/// Extensions accepted as batch input, lowercase.
pub const INPUT_EXTENSIONS: [&str; 3] = ["stl", "ply", "obj"];

/// The two formats the converter can write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Ply,
    Stl,
}

impl OutputFormat {
    /// Parse UI text like "PLY" or "stl", case-insensitively.
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_lowercase().as_str() {
            "ply" => Some(OutputFormat::Ply),
            "stl" => Some(OutputFormat::Stl),
            _ => None,
        }
    }

    /// Lowercase output file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Ply => "ply",
            OutputFormat::Stl => "stl",
        }
    }

    /// Display name for the format combo.
    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Ply => "PLY",
            OutputFormat::Stl => "STL",
        }
    }
}

/// Why a batch could not be started. These surface as blocking warnings
/// before any task is dispatched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("please select or drop input mesh files")]
    NoInputFiles,

    #[error("please select an output folder")]
    NoOutputDir,

    #[error("only .stl, .ply, or .obj files can be converted")]
    NoConvertibleFiles,
}

fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .is_some_and(|ext| INPUT_EXTENSIONS.contains(&ext.as_str()))
}

/// User selections for one conversion run.
#[derive(Debug, Default, Clone)]
pub struct Session {
    pub input_files: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Session {
    /// Add a file to the input list. Directories and repeats are ignored;
    /// extension filtering happens when tasks are built, so the list shows
    /// the user exactly what they dropped.
    pub fn add_file(&mut self, path: PathBuf) {
        if path.is_file() && !self.input_files.contains(&path) {
            self.input_files.push(path);
        }
    }

    pub fn clear_files(&mut self) {
        self.input_files.clear();
    }

    /// Validate the session and build one task per convertible input file.
    /// Output name = input base name with the chosen format's extension.
    pub fn build_tasks(&self) -> Result<Vec<ConversionTask>, SessionError> {
        if self.input_files.is_empty() {
            return Err(SessionError::NoInputFiles);
        }
        let output_dir = self.output_dir.as_ref().ok_or(SessionError::NoOutputDir)?;

        let tasks: Vec<ConversionTask> = self
            .input_files
            .iter()
            .filter(|path| has_input_extension(path))
            .map(|path| {
                let stem = path.file_stem().unwrap_or_default().to_string_lossy();
                let output_path =
                    output_dir.join(format!("{}.{}", stem, self.format.extension()));
                ConversionTask::new(path.clone(), output_path)
            })
            .collect();

        if tasks.is_empty() {
            return Err(SessionError::NoConvertibleFiles);
        }
        Ok(tasks)
    }
}

/// Aggregate classification of a finished batch, the one notification shown
/// next to the per-file log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    AllSucceeded(usize),
    AllFailed(usize),
    Partial { succeeded: usize, total: usize },
}

impl BatchOutcome {
    pub fn classify(results: &[ConversionResult]) -> BatchOutcome {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.success).count();
        if succeeded == total {
            BatchOutcome::AllSucceeded(total)
        } else if succeeded == 0 {
            BatchOutcome::AllFailed(total)
        } else {
            BatchOutcome::Partial { succeeded, total }
        }
    }

    pub fn message(&self) -> String {
        match self {
            BatchOutcome::AllSucceeded(n) => format!("All {} files converted.", n),
            BatchOutcome::AllFailed(_) => "All files failed to convert.".to_string(),
            BatchOutcome::Partial { succeeded, total } => {
                format!("{} of {} files converted.", succeeded, total)
            }
        }
    }
}
