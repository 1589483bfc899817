//! Conversion jobs and their per-file outcomes.
//!
//! A [`ConversionJob`] is an immutable snapshot of the queued paths and the
//! [`Settings`] in effect when the user started the batch.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Extension given to every output file.
pub const OUTPUT_EXTENSION: &str = "webp";

/// User-facing conversion settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Encoder quality, 1 to 100.
    pub quality: u8,
    /// Encode losslessly; quality then only affects effort.
    pub lossless: bool,
    /// Leave source files in place after conversion.
    pub keep_original: bool,
    /// Directory for outputs; `None` writes next to each source.
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: 90,
            lossless: false,
            keep_original: true,
            output_dir: None,
        }
    }
}

impl Settings {
    /// Rejects settings the encoder cannot honor.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(Error::InvalidQuality(self.quality));
        }
        Ok(())
    }
}

/// The files and settings of one conversion run.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    files: Vec<PathBuf>,
    settings: Settings,
}

impl ConversionJob {
    /// Builds a job, rejecting an empty file list and invalid settings.
    pub fn new(files: Vec<PathBuf>, settings: Settings) -> Result<Self> {
        if files.is_empty() {
            return Err(Error::EmptyQueue);
        }
        settings.validate()?;

        Ok(Self { files, settings })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Assigns every source its output path, in order.
    ///
    /// Outputs are `<stem>.webp` in the configured directory or next to the
    /// source. When two sources of the same batch would land on the same
    /// path, later ones get a `-2`, `-3`, ... suffix. An output never lands
    /// on a source of the same batch, its own included.
    ///
    /// Paths are compared in absolute form, so a relative output directory
    /// cannot alias an absolute source.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        let sources: HashSet<PathBuf> = self.files.iter().map(|p| absolute(p)).collect();
        let mut taken = HashSet::new();

        self.files
            .iter()
            .map(|source| {
                let dir = self.output_dir_for(source);
                let stem = source
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "output".to_string());

                let mut candidate = dir.join(format!("{stem}.{OUTPUT_EXTENSION}"));
                let mut n = 2;
                loop {
                    let key = absolute(&candidate);
                    if !sources.contains(&key) && taken.insert(key) {
                        break;
                    }
                    candidate = dir.join(format!("{stem}-{n}.{OUTPUT_EXTENSION}"));
                    n += 1;
                }
                candidate
            })
            .collect()
    }

    /// Directory the output for `source` is written to.
    pub fn output_dir_for(&self, source: &Path) -> PathBuf {
        match &self.settings.output_dir {
            Some(dir) => dir.clone(),
            None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }
}

/// A successfully converted file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub source: PathBuf,
    pub output: PathBuf,
    pub original_size: u64,
    pub new_size: u64,
    /// `(1 - new/original) * 100`; negative when the output grew.
    pub reduction: f64,
}

impl ConversionResult {
    pub(crate) fn new(source: PathBuf, output: PathBuf, original_size: u64, new_size: u64) -> Self {
        Self {
            source,
            output,
            original_size,
            new_size,
            reduction: reduction_percent(original_size, new_size),
        }
    }
}

impl fmt::Display for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({:.1}KB -> {:.1}KB, reduction: {:.1}%)",
            file_name(&self.source),
            file_name(&self.output),
            self.original_size as f64 / 1024.0,
            self.new_size as f64 / 1024.0,
            self.reduction,
        )
    }
}

/// A file that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub source: PathBuf,
    pub message: String,
}

impl ConversionError {
    pub(crate) fn new(source: PathBuf, error: &Error) -> Self {
        Self {
            source,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to convert {}: {}", self.source.display(), self.message)
    }
}

/// Size reduction in percent. Callers guarantee `original > 0`.
pub fn reduction_percent(original: u64, new: u64) -> f64 {
    (1.0 - new as f64 / original as f64) * 100.0
}

/// Lexically absolute form of `path`, resolved against the working directory.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
