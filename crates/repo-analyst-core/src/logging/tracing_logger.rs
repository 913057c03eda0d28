//! Logger backed by the `tracing` crate

use super::traits::Logger;

/// A logger that emits `tracing` events
///
/// Each event carries the component name as a `component` field so the
/// subscriber's filter and formatter can tell the tool server, the client and
/// the orchestrator apart.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: String,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingLogger {
    /// Create a tracing logger for the whole crate
    pub fn new() -> Self {
        Self::for_component("repo_analyst")
    }

    /// Create a tracing logger tagged with a component name
    pub fn for_component(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(component = %self.component, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(component = %self.component, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(component = %self.component, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(component = %self.component, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_logger_creation() {
        let logger = TracingLogger::new();
        assert_eq!(logger.component(), "repo_analyst");

        let custom = TracingLogger::for_component("tool_server");
        assert_eq!(custom.component(), "tool_server");
    }

    #[test]
    fn test_tracing_logger_without_subscriber() {
        // No subscriber installed: events are dropped, nothing panics
        let logger = TracingLogger::new();
        logger.debug("debug message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");
    }
}
