//! The chat pipeline: transcript, session context and turn orchestration.

mod conversation;
mod orchestrator;
mod session;

pub use conversation::{Conversation, Message, Role, GREETING};
pub use orchestrator::{Orchestrator, TurnOutcome, TurnState, NO_ROWS_RESPONSE};
pub use session::{Session, MISSING_DATABASE_NOTICE, MISSING_LLM_NOTICE};
