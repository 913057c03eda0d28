//! Logging abstractions
//!
//! Components take an `Arc<dyn Logger>`; binaries pass a `TracingLogger` and
//! install a `tracing-subscriber`, tests pass a `NoOpLogger`.

mod traits;
mod noop;
mod tracing_logger;

pub use traits::{Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use tracing_logger::TracingLogger;
