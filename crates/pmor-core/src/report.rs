//! User-feedback sinks.
//!
//! Library stores report progress and soft failures through a [`Reporter`]
//! they own, instead of writing to the console directly. The default
//! [`LogReporter`] forwards to the `log` facade.

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use log::Level;

pub trait Reporter: Send + Sync {
    fn report(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.report(Level::Error, message);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, level: Level, message: &str) {
        log::log!(target: "pmor", level, "{message}");
    }
}

/// Writes `LEVEL: message` lines to any [`Write`] sink.
pub struct WriterReporter<W: Write + Send> {
    sink: Mutex<W>,
    min_level: Level,
}

impl<W: Write + Send> WriterReporter<W> {
    pub fn new(sink: W, min_level: Level) -> Self {
        Self {
            sink: Mutex::new(sink),
            min_level,
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WriterReporter<std::io::Stderr> {
    pub fn stderr(min_level: Level) -> Self {
        Self::new(std::io::stderr(), min_level)
    }
}

impl<W: Write + Send> Reporter for WriterReporter<W> {
    fn report(&self, level: Level, message: &str) {
        if level > self.min_level {
            return;
        }
        let mut sink = self.sink.lock().unwrap_or_else(|p| p.into_inner());
        // Feedback is best effort; a closed sink must not fail the operation.
        let _ = writeln!(sink, "{level}: {message}");
    }
}

/// Records every message; used to assert on feedback in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    entries: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: Level, message: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.push((level, message.to_string()));
    }
}
