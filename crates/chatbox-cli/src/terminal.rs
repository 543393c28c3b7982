//! Terminal Interface Implementation
//!
//! A line-oriented front end: each input line is parsed into an
//! [`InputCommand`] and forwarded to the engine, while a printer task follows
//! the engine's snapshots and prints every message, notice and peer change
//! as it appears.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info};

use chatbox_core::telemetry::StationView;
use chatbox_core::{ChatMessage, Mode, Peer, PeerId};
use chatbox_runtime::{CommandOutcome, EngineHandle, EngineSnapshot};

use crate::config::CliConfig;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Input Parsing
// ----------------------------------------------------------------------------

/// One parsed line of user input
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    Public(String),
    Direct { peer_id: PeerId, text: String },
    SetMode(Mode),
    StartTransport,
    StopTransport,
    SetProximity(f32),
    Peers,
    Stations,
    History(Option<PeerId>),
    Status,
    Help,
    Quit,
    Empty,
}

pub const HELP: &str = "\
Commands:
  <text>                 send to the public channel
  /pub <text>            send to the public channel
  /dm <peer-id> <text>   send a direct message
  /mode sim|real         switch transport mode
  /start, /stop          start or stop the real network
  /proximity <value>     move the telemetry proximity parameter
  /peers                 list peers
  /stations              list bike stations
  /history [peer-id]     show the public stream or one direct thread
  /status                show mode, transport and counters
  /help                  show this help
  /quit                  leave";

/// Parse one input line
pub fn parse_line(line: &str) -> Result<InputCommand> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(InputCommand::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(InputCommand::Public(line.to_string()));
    };

    let (verb, args) = match rest.split_once(char::is_whitespace) {
        Some((verb, args)) => (verb, args.trim()),
        None => (rest, ""),
    };

    let command = match verb {
        "pub" | "p" => InputCommand::Public(args.to_string()),
        "dm" | "d" => {
            let (peer, text) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| CliError::InvalidInput("usage: /dm <peer-id> <text>".to_string()))?;
            InputCommand::Direct {
                peer_id: PeerId::new(peer),
                text: text.trim().to_string(),
            }
        }
        "mode" => match args {
            "sim" | "simulated" => InputCommand::SetMode(Mode::Simulated),
            "real" => InputCommand::SetMode(Mode::Real),
            other => {
                return Err(CliError::InvalidInput(format!(
                    "unknown mode '{}', expected sim or real",
                    other
                )))
            }
        },
        "start" => InputCommand::StartTransport,
        "stop" => InputCommand::StopTransport,
        "proximity" | "prox" => {
            let value = args.parse::<f32>().map_err(|_| {
                CliError::InvalidInput(format!("'{}' is not a number", args))
            })?;
            InputCommand::SetProximity(value)
        }
        "peers" => InputCommand::Peers,
        "stations" => InputCommand::Stations,
        "history" => InputCommand::History((!args.is_empty()).then(|| PeerId::new(args))),
        "status" => InputCommand::Status,
        "help" | "?" => InputCommand::Help,
        "quit" | "exit" | "q" => InputCommand::Quit,
        other => {
            return Err(CliError::InvalidInput(format!(
                "unknown command '/{}', try /help",
                other
            )))
        }
    };
    Ok(command)
}

// ----------------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------------

pub fn format_message(message: &ChatMessage, thread: Option<&PeerId>) -> String {
    let prefix = match thread {
        Some(peer) => format!("[dm {}] ", peer),
        None => String::new(),
    };
    if message.is_system() {
        format!("{}* {}", prefix, message.body)
    } else {
        format!("{}<{}> {}", prefix, message.sender, message.body)
    }
}

pub fn format_peer(peer: &Peer) -> String {
    let origin = if peer.simulated { "sim" } else { "real" };
    format!(
        "{:<12} {:<16} {:<12} {}",
        peer.id.as_str(),
        peer.name,
        peer.state.to_string(),
        origin
    )
}

pub fn format_station(view: &StationView) -> String {
    let station = &view.station;
    format!(
        "{} {:<8} {:<16} {:>3}/{:<3} at {:>5.1}",
        if view.near { "*" } else { " " },
        station.id,
        station.name,
        station.available,
        station.capacity,
        station.position
    )
}

pub fn format_status(snapshot: &EngineSnapshot) -> String {
    let stats = &snapshot.stats;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} as {} | transport {} | generation {}",
        snapshot.mode,
        snapshot.display_name,
        if snapshot.transport_active { "active" } else { "stopped" },
        snapshot.generation
    );
    let _ = writeln!(
        out,
        "peers {} ({} connected) | proximity {:.1}",
        snapshot.peers.len(),
        snapshot.connected_peers().count(),
        snapshot.proximity
    );
    let _ = write!(
        out,
        "sent {} | received {} | send failures {} | dropped {} stale, {} malformed | ticks {}",
        stats.messages_sent,
        stats.messages_received,
        stats.send_failures,
        stats.stale_events_dropped,
        stats.malformed_payloads_dropped,
        stats.telemetry_ticks
    );
    out
}

/// Tracks what has been printed so only new lines are shown
#[derive(Debug, Default)]
pub struct Printer {
    public_seen: usize,
    direct_seen: HashMap<PeerId, usize>,
    peers: Vec<Peer>,
}

impl Printer {
    /// Printer that treats everything in `snapshot` as already shown
    pub fn caught_up(snapshot: &EngineSnapshot) -> Self {
        Self {
            public_seen: snapshot.public.len(),
            direct_seen: snapshot
                .direct
                .iter()
                .map(|(peer, thread)| (peer.clone(), thread.len()))
                .collect(),
            peers: snapshot.peers.clone(),
        }
    }

    /// Lines that are new in `snapshot` since the last call
    pub fn new_lines(&mut self, snapshot: &EngineSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        for message in snapshot.public.iter().skip(self.public_seen) {
            lines.push(format_message(message, None));
        }
        self.public_seen = snapshot.public.len();

        for (peer, thread) in &snapshot.direct {
            let seen = self.direct_seen.entry(peer.clone()).or_default();
            for message in thread.iter().skip(*seen) {
                lines.push(format_message(message, Some(peer)));
            }
            *seen = thread.len();
        }

        for peer in &snapshot.peers {
            let previous = self.peers.iter().find(|p| p.id == peer.id);
            if previous.map(|p| p.state) != Some(peer.state) {
                lines.push(format!("~ {} ({}) is {}", peer.name, peer.id, peer.state));
            }
        }
        self.peers = snapshot.peers.clone();

        lines
    }
}

// ----------------------------------------------------------------------------
// Interactive Loop
// ----------------------------------------------------------------------------

/// Interactive session bound to a running engine
pub struct TerminalInterface {
    handle: EngineHandle,
    config: CliConfig,
}

impl TerminalInterface {
    pub fn new(handle: EngineHandle, config: CliConfig) -> Self {
        Self { handle, config }
    }

    /// Read commands from stdin until `/quit` or end of input
    pub async fn run(&self) -> Result<()> {
        println!("{}", HELP);
        let initial = self.handle.snapshot();
        for line in Printer::default().new_lines(&initial) {
            println!("{}", line);
        }

        let printer = tokio::spawn(follow(self.handle.subscribe(), Printer::caught_up(&initial)));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        loop {
            stdout.write_all(self.config.prompt.as_bytes()).await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                debug!("End of input");
                break;
            };
            match parse_line(&line) {
                Ok(InputCommand::Quit) => break,
                Ok(command) => match self.execute(command).await {
                    Ok(Some(output)) => println!("{}", output),
                    Ok(None) => {}
                    Err(CliError::Chatbox(e)) if !e.is_recoverable() => return Err(e.into()),
                    Err(e) => println!("{}", e),
                },
                Err(e) => println!("{}", e),
            }
        }

        printer.abort();
        info!("Leaving interactive session");
        Ok(())
    }

    /// Apply one command; returns text to print, if any
    pub async fn execute(&self, command: InputCommand) -> Result<Option<String>> {
        let outcome = match command {
            InputCommand::Public(text) => self.handle.send_public(text).await?,
            InputCommand::Direct { peer_id, text } => {
                let known = self.handle.snapshot().peer(&peer_id).is_some();
                let outcome = self.handle.send_direct(peer_id.clone(), text).await?;
                if !known {
                    return Ok(Some(format!("Unknown peer {}", peer_id)));
                }
                outcome
            }
            InputCommand::SetMode(mode) => self.handle.set_mode(mode).await?,
            InputCommand::StartTransport => self.handle.start_transport().await?,
            InputCommand::StopTransport => self.handle.stop_transport().await?,
            InputCommand::SetProximity(value) => {
                self.handle.set_proximity(value).await?;
                return Ok(Some(self.stations()));
            }
            InputCommand::Peers => return Ok(Some(self.peers())),
            InputCommand::Stations => return Ok(Some(self.stations())),
            InputCommand::History(thread) => return Ok(Some(self.history(thread.as_ref()))),
            InputCommand::Status => return Ok(Some(format_status(&self.handle.snapshot()))),
            InputCommand::Help => return Ok(Some(HELP.to_string())),
            InputCommand::Quit | InputCommand::Empty => return Ok(None),
        };

        // Notices already reach the screen through the printer
        debug!("Command outcome: {:?}", outcome);
        if outcome == CommandOutcome::Ignored {
            return Ok(Some("(nothing to do)".to_string()));
        }
        Ok(None)
    }

    fn peers(&self) -> String {
        let snapshot = self.handle.snapshot();
        if snapshot.peers.is_empty() {
            return "No peers".to_string();
        }
        snapshot
            .peers
            .iter()
            .map(format_peer)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn stations(&self) -> String {
        let snapshot = self.handle.snapshot();
        let mut lines = vec![format!("proximity {:.1}", snapshot.proximity)];
        lines.extend(snapshot.stations.iter().map(format_station));
        lines.join("\n")
    }

    fn history(&self, thread: Option<&PeerId>) -> String {
        let snapshot = self.handle.snapshot();
        let messages = match thread {
            Some(peer) => snapshot.direct(peer),
            None => snapshot.public.as_slice(),
        };
        let skip = messages.len().saturating_sub(self.config.max_recent_messages);
        let lines: Vec<String> = messages
            .iter()
            .skip(skip)
            .map(|message| format_message(message, thread))
            .collect();
        if lines.is_empty() {
            "No messages".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Print new lines for every snapshot until the engine goes away
async fn follow(mut updates: watch::Receiver<Arc<EngineSnapshot>>, mut printer: Printer) {
    while updates.changed().await.is_ok() {
        let snapshot = Arc::clone(&updates.borrow_and_update());
        for line in printer.new_lines(&snapshot) {
            println!("\r{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_public() {
        assert_eq!(
            parse_line("  hola a todos ").unwrap(),
            InputCommand::Public("hola a todos".to_string())
        );
        assert_eq!(parse_line("   ").unwrap(), InputCommand::Empty);
    }

    #[test]
    fn test_direct_message_keeps_the_whole_text() {
        assert_eq!(
            parse_line("/dm SIM-A hi there | friend").unwrap(),
            InputCommand::Direct {
                peer_id: PeerId::new("SIM-A"),
                text: "hi there | friend".to_string(),
            }
        );
        assert!(parse_line("/dm SIM-A").is_err());
    }

    #[test]
    fn test_mode_and_proximity_arguments() {
        assert_eq!(
            parse_line("/mode real").unwrap(),
            InputCommand::SetMode(Mode::Real)
        );
        assert_eq!(
            parse_line("/mode sim").unwrap(),
            InputCommand::SetMode(Mode::Simulated)
        );
        assert!(parse_line("/mode wifi").is_err());
        assert_eq!(
            parse_line("/proximity 12.5").unwrap(),
            InputCommand::SetProximity(12.5)
        );
        assert!(parse_line("/proximity far").is_err());
    }

    #[test]
    fn test_misc_commands() {
        assert_eq!(parse_line("/quit").unwrap(), InputCommand::Quit);
        assert_eq!(parse_line("/history").unwrap(), InputCommand::History(None));
        assert_eq!(
            parse_line("/history SIM-B").unwrap(),
            InputCommand::History(Some(PeerId::new("SIM-B")))
        );
        assert!(parse_line("/dance").is_err());
    }

    #[test]
    fn test_message_formatting() {
        let chat = ChatMessage::local("Ana", "hi");
        assert_eq!(format_message(&chat, None), "<Ana> hi");
        assert_eq!(
            format_message(&chat, Some(&PeerId::new("SIM-A"))),
            "[dm SIM-A] <Ana> hi"
        );
        assert_eq!(
            format_message(&ChatMessage::system("Simulation ON"), None),
            "* Simulation ON"
        );
    }
}
