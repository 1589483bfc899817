//! The conversion worker.
//!
//! Files are converted strictly one after another. Every file yields one
//! [`WorkerEvent::Converted`] or [`WorkerEvent::Failed`] followed by a
//! [`WorkerEvent::Progress`]; the run always ends with a single
//! [`WorkerEvent::Finished`]. Cancellation is honored between files only.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::encoder::{Encoder, EncoderConfig};
use crate::error::{Error, Result};
use crate::job::{ConversionError, ConversionJob, ConversionResult};
use crate::source;

/// Something the worker reports back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Converted(ConversionResult),
    Failed(ConversionError),
    /// Percentage of files processed, 0 to 100.
    Progress(u8),
    Finished(BatchSummary),
}

/// Tally of a finished or cancelled run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    /// Files that were neither converted nor failed.
    pub fn skipped(&self) -> usize {
        self.total - self.converted - self.failed
    }
}

/// Shared flag asking the worker to stop at the next file boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Converts every file of a [`ConversionJob`] to WebP.
pub struct Worker {
    job: ConversionJob,
    cancel: CancelHandle,
}

impl Worker {
    pub fn new(job: ConversionJob) -> Self {
        Self {
            job,
            cancel: CancelHandle::default(),
        }
    }

    /// Get a handle for stopping the run from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs the batch on the current thread, handing each event to `sink`.
    pub fn run(&self, mut sink: impl FnMut(WorkerEvent)) -> BatchSummary {
        let files = self.job.files();
        let outputs = self.job.output_paths();
        let mut summary = BatchSummary {
            total: files.len(),
            ..BatchSummary::default()
        };

        info!(files = summary.total, "Conversion started");

        let config = {
            let settings = self.job.settings();
            EncoderConfig::new(settings.quality as f32, settings.lossless)
        };

        for (index, (source, output)) in files.iter().zip(outputs).enumerate() {
            if self.cancel.is_cancelled() {
                debug!(processed = index, "Cancellation observed");
                summary.cancelled = true;
                break;
            }

            let outcome = match &config {
                Ok(config) => self.convert_one(source, output, config),
                Err(_) => Err(Error::InvalidConfig),
            };

            match outcome {
                Ok(result) => {
                    info!(
                        source = %result.source.display(),
                        output = %result.output.display(),
                        original = result.original_size,
                        new = result.new_size,
                        "Converted ({:.1}% smaller)",
                        result.reduction
                    );
                    summary.converted += 1;
                    sink(WorkerEvent::Converted(result));
                }
                Err(e) => {
                    warn!(source = %source.display(), "Conversion failed: {e}");
                    summary.failed += 1;
                    sink(WorkerEvent::Failed(ConversionError::new(source.clone(), &e)));
                }
            }

            sink(WorkerEvent::Progress(progress_percent(index + 1, summary.total)));
        }

        info!(
            converted = summary.converted,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Conversion finished"
        );
        sink(WorkerEvent::Finished(summary));
        summary
    }

    /// Moves the worker onto a background thread.
    pub fn spawn(self) -> WorkerHandle {
        let (tx, rx) = mpsc::channel();
        let cancel = self.cancel_handle();

        let thread = thread::spawn(move || {
            self.run(|event| {
                if tx.send(event).is_err() {
                    debug!("No receiver for worker event");
                }
            })
        });

        WorkerHandle { events: rx, cancel, thread }
    }

    fn convert_one(&self, source: &Path, output: PathBuf, config: &EncoderConfig) -> Result<ConversionResult> {
        let original_size = fs::metadata(source)
            .map_err(|e| Error::io("failed to read", source, e))?
            .len();
        if original_size == 0 {
            return Err(Error::EmptySource);
        }

        let image = source::load(source)?;

        if let Some(dir) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| Error::io("failed to create", dir, e))?;
            debug!(dir = %dir.display(), "Output directory ready");
        }

        let webp = Encoder::from_image(&image)?.encode(config)?;
        write_atomically(&output, &webp)?;
        let new_size = webp.len() as u64;

        if !self.job.settings().keep_original && !same_file(source, &output) {
            fs::remove_file(source).map_err(|e| Error::io("failed to remove", source, e))?;
            debug!(source = %source.display(), "Removed original");
        }

        Ok(ConversionResult::new(source.to_path_buf(), output, original_size, new_size))
    }
}

/// A worker running on its own thread.
pub struct WorkerHandle {
    events: Receiver<WorkerEvent>,
    cancel: CancelHandle,
    thread: JoinHandle<BatchSummary>,
}

impl WorkerHandle {
    /// Events in the order the worker produced them. The channel closes
    /// after [`WorkerEvent::Finished`].
    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker thread and returns its summary.
    pub fn join(self) -> BatchSummary {
        match self.thread.join() {
            Ok(summary) => summary,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Cancels and waits for the thread, discarding pending events and a
    /// worker panic alike.
    pub fn stop(self) {
        self.cancel();
        if self.thread.join().is_err() {
            warn!("Worker thread panicked");
        }
    }
}

/// `round(done / total * 100)`, clamped to 100.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100 + total / 2) / total).min(100) as u8
}

/// Writes to a hidden sibling first so `path` only ever holds complete data.
fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = path.with_file_name(format!(".{file_name}.part"));

    fs::write(&partial, data).map_err(|e| Error::io("failed to write", &partial, e))?;
    if let Err(e) = fs::rename(&partial, path) {
        let _ = fs::remove_file(&partial);
        return Err(Error::io("failed to write", path, e));
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
