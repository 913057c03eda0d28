//! Conversation orchestration
//!
//! ```text
//! AwaitingUserInput
//!        │ run_turn(prompt)
//!        ▼
//! AwaitingModelResponse ◄──────────────┐
//!        │                             │
//!        ├── no tool calls ──► FinalAnswerReady ──► AwaitingUserInput
//!        ▼                             │
//! ToolCallsPending                     │
//!        ▼                             │
//! ExecutingTools ── results appended ──┘
//! ```
//!
//! The number of `ExecutingTools` rounds per turn is bounded by the round
//! limit. A failed or cancelled turn leaves the history as it was before the
//! prompt.

mod response;
mod session;
mod turn;

pub use response::{ModelResponse, ModelResponseParseError};
pub use session::{Session, TurnState};
pub use turn::{ConversationOrchestrator, TurnError, DEFAULT_ROUND_LIMIT};
