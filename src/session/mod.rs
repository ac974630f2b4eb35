//! Session Management: game state machine, prompt scheduling, shared access
//!
//! # Components
//! - `state.rs`: GameSession state machine and its Snapshot projection
//! - `prompt.rs`: PromptScheduler, duration schedules, Simon Says sequences
//! - `shared.rs`: Mutex-guarded handle for concurrent hosts

pub mod prompt;
pub mod shared;
pub mod state;

pub use prompt::{EmotionSequence, Prompt, PromptScheduler, PromptTiming};
pub use shared::SharedSession;
pub use state::{GameRules, GameSession, GameState, Snapshot};
