//! Mood Blaster - facial-expression reaction game
//!
//! # Components
//! - `facs`: landmark geometry, feature extraction, rule-based emotion classification
//! - `session`: game state machine, prompt scheduling, shared session handle
//! - `source`: per-tick detection sources for the terminal host
//! - `server`: length-prefixed JSON host over TCP
//! - `cli`: terminal input and rendering
//! - `config`: JSON configuration with defaults

pub mod cli;
pub mod config;
pub mod error;
pub mod facs;
pub mod server;
pub mod session;
pub mod source;
