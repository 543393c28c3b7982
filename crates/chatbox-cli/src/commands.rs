//! Command handlers for the ChatBox CLI

use std::time::Duration;

use tracing::info;

use chatbox_core::{Mode, PeerId};
use chatbox_runtime::{EngineBuilder, EngineHandle};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::terminal::{format_message, format_station, format_status, TerminalInterface};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Chat { mode } => Self::handle_chat_command(config, mode.into()).await,
            Commands::Send {
                to,
                wait_ms,
                message,
            } => Self::handle_send_command(config, to, message, wait_ms).await,
            Commands::Status => Self::handle_status_command(config).await,
            Commands::Config => {
                println!("{}", config.to_toml()?);
                Ok(())
            }
        }
    }

    /// Start an engine for this process
    ///
    /// The CLI has no wireless stack, so real mode reports that no real
    /// transport is available and the engine stays in simulation.
    pub async fn start_engine(config: &AppConfig, mode: Mode) -> Result<EngineHandle> {
        let engine_config = config.chatbox.clone().with_initial_mode(mode);
        Ok(EngineBuilder::new(engine_config).build_and_start().await?)
    }

    /// Handle the interactive chat command
    async fn handle_chat_command(config: AppConfig, mode: Mode) -> Result<()> {
        info!(
            "Starting interactive chat as {}",
            config.chatbox.identity.display_name
        );
        let handle = Self::start_engine(&config, mode).await?;

        let terminal = TerminalInterface::new(handle.clone(), config.cli.clone());
        let result = terminal.run().await;

        handle.shutdown().await?;
        result
    }

    /// Handle the one-shot send command
    async fn handle_send_command(
        config: AppConfig,
        to: Option<String>,
        message: String,
        wait_ms: u64,
    ) -> Result<()> {
        if message.trim().is_empty() {
            return Err(CliError::InvalidInput("message must not be empty".to_string()));
        }
        let handle = Self::start_engine(&config, Mode::Simulated).await?;

        let thread = to.map(PeerId::new);
        match &thread {
            Some(peer_id) => {
                if handle.snapshot().peer(peer_id).is_none() {
                    handle.shutdown().await?;
                    return Err(CliError::InvalidInput(format!("unknown peer {}", peer_id)));
                }
                handle.send_direct(peer_id.clone(), message).await?;
            }
            None => {
                handle.send_public(message).await?;
            }
        }

        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
        let snapshot = handle.snapshot();
        let messages = match &thread {
            Some(peer_id) => snapshot.direct(peer_id),
            None => snapshot.public.as_slice(),
        };
        for message in messages.iter().filter(|m| !m.is_system()) {
            println!("{}", format_message(message, thread.as_ref()));
        }

        handle.shutdown().await?;
        Ok(())
    }

    /// Handle the status command
    async fn handle_status_command(config: AppConfig) -> Result<()> {
        let handle = Self::start_engine(&config, config.chatbox.engine.initial_mode).await?;
        let snapshot = handle.snapshot();

        println!("{}", format_status(&snapshot));
        println!("service id {}", config.chatbox.identity.service_id);
        for view in &snapshot.stations {
            println!("{}", format_station(view));
        }

        handle.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_start_engine_in_real_mode_without_transport_stays_simulated() {
        let mut config = AppConfig::default();
        config.chatbox = chatbox_core::ChatboxConfig::testing();

        let handle = CommandDispatcher::start_engine(&config, Mode::Real)
            .await
            .unwrap();
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.mode, Mode::Simulated);
        assert!(snapshot
            .notices()
            .any(|m| m.body == "No real transport available"));

        handle.shutdown().await.unwrap();
    }
}
