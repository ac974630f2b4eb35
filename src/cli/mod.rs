//! CLI Interface: User input and terminal rendering
//!
//! # Components
//! - `input.rs`: Keystroke capture and action mapping using crossterm
//! - `display.rs`: Terminal rendering of menu, HUD and game over

pub mod display;
pub mod input;

pub use display::Display;
pub use input::{HostAction, InputHandler};
