//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand, ValueEnum};

use chatbox_core::Mode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Display name, overriding the configuration
    #[arg(short, long)]
    pub name: Option<String>,

    /// Seed for every simulated random choice
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat interface
    Chat {
        /// Mode to start in
        #[arg(short, long, value_enum, default_value_t = ModeArg::Simulated)]
        mode: ModeArg,
    },
    /// Send one message through the simulation, print the replies and exit
    Send {
        /// Direct message recipient (simulated peer id)
        #[arg(short, long)]
        to: Option<String>,
        /// How long to wait for replies, in milliseconds
        #[arg(short, long, default_value_t = 1500)]
        wait_ms: u64,
        /// Message content
        message: String,
    },
    /// Print the effective configuration and the initial engine state
    Status,
    /// Print the effective configuration as TOML
    Config,
}

/// Mode selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Simulated,
    Real,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Simulated => Mode::Simulated,
            ModeArg::Real => Mode::Real,
        }
    }
}
