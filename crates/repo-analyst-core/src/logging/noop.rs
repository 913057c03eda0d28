//! No-op logger implementation

use std::sync::Arc;

use super::traits::{Logger, SharedLogger};

/// A logger that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }

    /// A shared handle, ready to pass to components under test
    pub fn shared() -> SharedLogger {
        Arc::new(Self)
    }
}

impl Logger for NoOpLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
