//! Tool management module
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  ToolRegistryBuilder         │  register(spec, executor) at startup
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │  ToolRegistry (immutable)    │  list() / invoke(name, args)
//! │   - schema validation        │
//! │   - executor errors/panics   │
//! │     become error outputs     │
//! └──────────────┬───────────────┘
//!                ▼
//!        ToolServer (mcp::server)
//! ```

mod registry;
pub mod schema;

pub use registry::{
    FnExecutor, ToolEntry, ToolError, ToolExecutionError, ToolExecutor, ToolRegistry,
    ToolRegistryBuilder,
};
pub use schema::input_schema_for;
