//! ChatBox CLI Configuration Management
//!
//! Configuration is read from an optional TOML file. The engine sections
//! (`[identity]`, `[engine]`, `[simulation]`, `[telemetry]`) sit at the top
//! level next to the CLI-only `[cli]` section. Missing sections and fields
//! take their defaults; command line flags override the file.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chatbox_core::ChatboxConfig;

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the ChatBox CLI application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine configuration
    #[serde(flatten)]
    pub chatbox: ChatboxConfig,

    /// Terminal front end settings
    pub cli: CliConfig,
}

/// Terminal front end settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Prompt printed before each input line
    pub prompt: String,

    /// Messages shown per thread by `/history`
    pub max_recent_messages: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            prompt: "chatbox> ".to_string(),
            max_recent_messages: 20,
        }
    }
}

impl AppConfig {
    /// Load and validate a TOML configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply command line overrides, then re-validate
    pub fn with_overrides(mut self, name: Option<String>, seed: Option<u64>) -> Result<Self> {
        if let Some(name) = name {
            self.chatbox.identity.display_name = name;
        }
        if let Some(seed) = seed {
            self.chatbox.simulation.seed = Some(seed);
            self.chatbox.telemetry.seed = Some(seed.wrapping_add(1));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.chatbox.validate()?;
        if self.cli.max_recent_messages == 0 {
            return Err(CliError::Config(
                "cli.max_recent_messages must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
