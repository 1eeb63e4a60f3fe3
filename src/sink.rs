//! Error sink for failures that have no caller to return to.
//!
//! The background sweep reports through here. The default writes to stderr;
//! callers can swap it at any time via [`SharedSink::replace`], which also
//! redirects a sweep that is already running.

use std::io::Write;
use std::sync::{Arc, Mutex, RwLock};

use crate::errors::StoreError;

pub trait ErrorSink: Send + Sync {
    fn report(&self, err: &StoreError);
}

/// Writes `[ERROR]:<message>` lines to the process's standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn report(&self, err: &StoreError) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "[ERROR]:{}", err);
    }
}

/// Adapts any writer (a file, a buffer) into a sink.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> ErrorSink for WriterSink<W> {
    fn report(&self, err: &StoreError) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(writer, "[ERROR]:{}", err) {
            tracing::warn!(error = %e, "error sink write failed");
        }
    }
}

/// Swappable sink slot shared between the store and its sweep task.
#[derive(Clone)]
pub struct SharedSink {
    slot: Arc<RwLock<Arc<dyn ErrorSink>>>,
}

impl SharedSink {
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(sink)),
        }
    }

    pub fn replace(&self, sink: Arc<dyn ErrorSink>) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = sink;
    }

    pub fn report(&self, err: &StoreError) {
        // clone out so a slow sink never holds the lock
        let sink = self.slot.read().unwrap_or_else(|e| e.into_inner()).clone();
        sink.report(err);
    }
}

impl Default for SharedSink {
    fn default() -> Self {
        Self::new(Arc::new(StderrSink))
    }
}
