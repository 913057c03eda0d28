//! Tool registry
//!
//! Maps tool names to their spec and executor. Tools are registered
//! explicitly through a builder at startup; the built registry is immutable
//! and shared behind an `Arc`.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;

use crate::logging::{NoOpLogger, SharedLogger};
use crate::types::{Tool, ToolOutput};

use super::schema;

/// Registration and invocation faults
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool '{name}' is already registered")]
    DuplicateTool { name: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },
}

/// Failure reported by a tool's executor
///
/// Never escapes the registry: `ToolRegistry::invoke` turns it into an error
/// `ToolOutput`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ToolExecutionError {
    pub message: String,
}

impl ToolExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ToolExecutionError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// The executable half of a tool
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolExecutionError>;
}

type ExecFn = dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolExecutionError>> + Send + Sync;

/// Adapts a closure returning a boxed future into a `ToolExecutor`
pub struct FnExecutor {
    f: Box<ExecFn>,
}

impl FnExecutor {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, Result<Value, ToolExecutionError>> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl ToolExecutor for FnExecutor {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolExecutionError> {
        (self.f)(arguments).await
    }
}

/// A registered tool
#[derive(Clone)]
pub struct ToolEntry {
    pub spec: Tool,
    pub executor: Arc<dyn ToolExecutor>,
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEntry").field("spec", &self.spec).finish()
    }
}

/// Collects tool registrations
pub struct ToolRegistryBuilder {
    entries: BTreeMap<String, ToolEntry>,
    logger: SharedLogger,
}

impl ToolRegistryBuilder {
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Register a tool, rejecting duplicate names
    pub fn register(
        mut self,
        spec: Tool,
        executor: Arc<dyn ToolExecutor>,
    ) -> Result<Self, ToolError> {
        if self.entries.contains_key(&spec.name) {
            return Err(ToolError::DuplicateTool { name: spec.name });
        }
        self.logger
            .debug(&format!("[ToolRegistry] Registered tool: {}", spec.name));
        self.entries
            .insert(spec.name.clone(), ToolEntry { spec, executor });
        Ok(self)
    }

    pub fn build(self) -> ToolRegistry {
        self.logger.info(&format!(
            "[ToolRegistry] Built registry with {} tools",
            self.entries.len()
        ));
        ToolRegistry {
            entries: self.entries,
            logger: self.logger,
        }
    }
}

/// Immutable name → tool mapping
pub struct ToolRegistry {
    entries: BTreeMap<String, ToolEntry>,
    logger: SharedLogger,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Render a success payload: strings pass through, everything else is pretty JSON
fn render_payload(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder {
            entries: BTreeMap::new(),
            logger: NoOpLogger::shared(),
        }
    }

    /// Registered tool specs, sorted by name
    pub fn list(&self) -> Vec<Tool> {
        self.entries.values().map(|e| e.spec.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check a call's arguments against the tool's input schema
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<&ToolEntry, ToolError> {
        let entry = self.entries.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;

        schema::validate(&entry.spec.input_schema, arguments).map_err(|message| {
            ToolError::InvalidArguments {
                tool: name.to_string(),
                message,
            }
        })?;

        Ok(entry)
    }

    /// Validate and execute a tool
    ///
    /// Only lookup and validation faults are returned as `Err`; anything the
    /// executor does, including panicking, ends up in the `ToolOutput`.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let entry = self.validate(name, &arguments)?;
        self.logger.info(&format!("[ToolRegistry] Executing tool: {}", name));

        let executor = Arc::clone(&entry.executor);
        let outcome = AssertUnwindSafe(executor.execute(arguments))
            .catch_unwind()
            .await;

        let output = match outcome {
            Ok(Ok(value)) => ToolOutput::ok(render_payload(value)),
            Ok(Err(e)) => {
                self.logger
                    .warn(&format!("[ToolRegistry] Tool '{}' failed: {}", name, e));
                ToolOutput::error(e.message)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.logger
                    .error(&format!("[ToolRegistry] Tool '{}' panicked: {}", name, message));
                ToolOutput::error(format!("Tool '{}' crashed: {}", name, message))
            }
        };
        Ok(output)
    }
}
