//! Headless front-end state: the queue, the settings, and at most one
//! running worker.

use std::sync::mpsc::TryRecvError;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::job::{ConversionJob, Settings};
use crate::queue::FileQueue;
use crate::worker::{BatchSummary, CancelHandle, Worker, WorkerEvent, WorkerHandle};

/// Owns what a user edits between runs and guards the single worker.
///
/// Dropping a session with a batch in flight cancels the batch and waits for
/// the file in progress to finish.
#[derive(Default)]
pub struct Session {
    queue: FileQueue,
    settings: Settings,
    running: Option<WorkerHandle>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            queue: FileQueue::new(),
            settings,
            running: None,
        }
    }

    pub fn queue(&self) -> &FileQueue {
        &self.queue
    }

    /// Mutable access to the queue, refused while a batch runs.
    pub fn queue_mut(&mut self) -> Result<&mut FileQueue> {
        self.ensure_idle()?;
        Ok(&mut self.queue)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings, refused while a batch runs.
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        self.ensure_idle()?;
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Handle for stopping the running batch from another thread.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.running.as_ref().map(WorkerHandle::cancel_handle)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Snapshots queue and settings into a job and starts a worker for it.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let job = ConversionJob::new(self.queue.snapshot(), self.settings.clone())?;
        info!(files = job.len(), "Starting batch");

        self.running = Some(Worker::new(job).spawn());
        Ok(())
    }

    /// Drains events produced so far without blocking.
    pub fn poll(&mut self) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        let mut done = false;

        if let Some(handle) = &self.running {
            loop {
                match handle.events().try_recv() {
                    Ok(event) => {
                        done |= matches!(event, WorkerEvent::Finished(_));
                        events.push(event);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        done = true;
                        break;
                    }
                }
            }
        }

        if done {
            self.finish();
        }
        events
    }

    /// Blocks until the running batch ends, handing every event to
    /// `on_event`. Returns `None` if nothing was running.
    pub fn wait(&mut self, mut on_event: impl FnMut(&WorkerEvent)) -> Option<BatchSummary> {
        let handle = self.running.take()?;
        for event in handle.events().iter() {
            on_event(&event);
        }
        Some(handle.join())
    }

    /// Asks the worker to stop after the current file and waits for it.
    /// Events not yet drained are returned.
    pub fn cancel(&mut self) -> Vec<WorkerEvent> {
        let Some(handle) = self.running.take() else {
            return Vec::new();
        };

        debug!("Cancelling batch");
        handle.cancel();
        let events: Vec<_> = handle.events().iter().collect();
        handle.join();
        events
    }

    fn finish(&mut self) {
        if let Some(handle) = self.running.take() {
            handle.join();
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_running() {
            return Err(Error::Busy);
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.running.take() {
            debug!("Session dropped with a running batch");
            handle.stop();
        }
    }
}
