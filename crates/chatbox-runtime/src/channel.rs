//! Command channel types
//!
//! Every user action reaches the engine as a [`Command`] paired with a oneshot
//! acknowledgement. The acknowledgement is sent only after the command and
//! everything it triggered synchronously have been applied, so a caller that
//! awaits it observes a fully ordered history.

use chatbox_core::{Mode, PeerId};
use tokio::sync::oneshot;

// ----------------------------------------------------------------------------
// Command: UI → Routing Engine
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Broadcast a line on the public channel
    SendPublic { text: String },
    /// Send a line to one peer's direct thread
    SendDirect { peer_id: PeerId, text: String },
    /// Switch between the simulated and the real transport
    SetMode { mode: Mode },
    /// Restart the real transport while staying in real mode
    StartTransport,
    /// Stop the real transport while staying in real mode
    StopTransport,
    /// Move the telemetry proximity parameter
    SetProximity { value: f32 },
    /// Tear everything down and stop the engine
    Shutdown,
}

/// What the engine did with a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State changed as requested
    Applied,
    /// Nothing to do (empty text, unknown peer, same mode)
    Ignored,
    /// Handled, and a notice explaining why was appended to the public stream
    Notified(String),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

/// A command travelling to the engine together with its acknowledgement
#[derive(Debug)]
pub struct Request {
    pub command: Command,
    pub ack: oneshot::Sender<CommandOutcome>,
}

impl Request {
    pub fn new(command: Command) -> (Self, oneshot::Receiver<CommandOutcome>) {
        let (ack, rx) = oneshot::channel();
        (Self { command, ack }, rx)
    }
}
