//! ChatBox CLI library
//!
//! This library provides the pieces of the `chatbox` terminal front end:
//! argument parsing, configuration loading, the interactive line interface and
//! the command dispatcher that wires them to the routing engine.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod terminal;

pub use cli::{Cli, Commands};
pub use config::AppConfig;
pub use error::{CliError, Result};

// Re-export commonly used types
pub use chatbox_runtime::{EngineBuilder, EngineHandle, EngineSnapshot, Mode, PeerId};
