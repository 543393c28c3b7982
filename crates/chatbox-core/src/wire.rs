//! Flat text wire format
//!
//! One payload carries one message as five fields joined by `|`:
//!
//! ```text
//! <kind>|<scope>|<target>|<id>|<body>
//! ```
//!
//! The body is not escaped. Decoding splits into at most five parts, so a
//! body containing the delimiter survives verbatim as the final field.
//! The target is `*` or a peer id; an empty target or id is malformed, so
//! every record that decodes re-encodes to the same bytes.

use crate::errors::CodecError;
use crate::types::{MessageId, PeerId, Scope};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Field delimiter
pub const DELIMITER: char = '|';

/// Target marker for public records
pub const WILDCARD_TARGET: &str = "*";

/// Number of fields in a record
pub const FIELD_COUNT: usize = 5;

const KIND_CHAT: &str = "CHAT";
const SCOPE_PUBLIC: &str = "PUBLIC";
const SCOPE_DIRECT: &str = "DM";

// ----------------------------------------------------------------------------
// Record Types
// ----------------------------------------------------------------------------

/// Kind of record; only chat lines exist today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
}

impl MessageKind {
    fn as_wire(self) -> &'static str {
        match self {
            MessageKind::Chat => KIND_CHAT,
        }
    }

    fn from_wire(field: &str) -> Result<Self, CodecError> {
        match field {
            KIND_CHAT => Ok(MessageKind::Chat),
            other => Err(CodecError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Decoded form of one wire payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    pub kind: MessageKind,
    pub scope: Scope,
    /// Destination for direct records, `None` for the wildcard
    pub target: Option<PeerId>,
    pub id: MessageId,
    pub body: String,
}

impl WireRecord {
    /// Public chat line addressed to everyone
    pub fn public(id: MessageId, body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Chat,
            scope: Scope::Public,
            target: None,
            id,
            body: body.into(),
        }
    }

    /// Direct chat line addressed to one peer
    pub fn direct(target: PeerId, id: MessageId, body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Chat,
            scope: Scope::Direct,
            target: Some(target),
            id,
            body: body.into(),
        }
    }

    /// Encode to the wire representation
    pub fn encode(&self) -> Vec<u8> {
        let scope = match self.scope {
            Scope::Public => SCOPE_PUBLIC,
            Scope::Direct => SCOPE_DIRECT,
        };
        let target = self
            .target
            .as_ref()
            .map(PeerId::as_str)
            .unwrap_or(WILDCARD_TARGET);

        format!(
            "{kind}{d}{scope}{d}{target}{d}{id}{d}{body}",
            kind = self.kind.as_wire(),
            d = DELIMITER,
            id = self.id,
            body = self.body,
        )
        .into_bytes()
    }

    /// Decode a wire payload
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let raw = core::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;

        let parts: Vec<&str> = raw.splitn(FIELD_COUNT, DELIMITER).collect();
        if parts.len() < FIELD_COUNT {
            return Err(CodecError::TooFewFields { found: parts.len() });
        }

        let kind = MessageKind::from_wire(parts[0])?;
        let scope = match parts[1] {
            SCOPE_PUBLIC => Scope::Public,
            SCOPE_DIRECT => Scope::Direct,
            other => {
                return Err(CodecError::UnknownScope {
                    scope: other.to_string(),
                })
            }
        };
        let target = match parts[2] {
            "" => return Err(CodecError::EmptyField { field: "target" }),
            WILDCARD_TARGET => None,
            id => Some(PeerId::new(id)),
        };
        if parts[3].is_empty() {
            return Err(CodecError::EmptyField { field: "id" });
        }

        Ok(Self {
            kind,
            scope,
            target,
            id: MessageId::new(parts[3]),
            body: parts[4].to_string(),
        })
    }

    /// Decode, discarding malformed input after logging it
    pub fn try_decode(bytes: &[u8]) -> Option<Self> {
        match Self::decode(bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Dropping malformed payload ({} bytes): {}", bytes.len(), e);
                None
            }
        }
    }
}
