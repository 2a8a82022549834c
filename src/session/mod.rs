//! Call-session boundary
//!
//! Session-agnostic traits for the external real-time call. The engine
//! treats the session as a synchronous roster query plus an event stream;
//! signaling, room provisioning and identity live on the other side of
//! this boundary.

pub mod tracks;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use tracks::{MediaTrack, TrackKind, TrackRef, TrackSlot, TrackSource, TRACK_SOURCE_ORDER};

/// Identifier for a call participant, unique within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of one participant in the call roster.
#[derive(Clone, Debug)]
pub struct Participant {
    pub id: ParticipantId,

    /// Display name, used for speaker attribution.
    pub name: String,

    pub is_local: bool,

    pub audio: TrackSlot,

    pub video: TrackSlot,
}

/// Lifecycle events delivered by the call session.
///
/// At-least-once delivery: the same logical event may arrive more than once
/// and consumers must tolerate duplicates.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Local participant finished joining the call.
    Joined,

    /// A participant's media or metadata changed.
    ParticipantUpdated { participant: ParticipantId },

    /// A track became available for a participant.
    TrackAvailable {
        participant: ParticipantId,
        kind: TrackKind,
    },

    /// The session reported an error. Non-fatal to an active recording
    /// unless the recorder itself fails.
    SessionError { message: String },
}

/// The external multi-party call.
///
/// Roster queries are synchronous so composition never races a
/// half-populated participant list.
pub trait CallSession: Send + Sync {
    /// Full roster, local participant included.
    fn participants(&self) -> Vec<Participant>;

    /// The local participant, if the call has actually been joined.
    fn local_participant(&self) -> Option<Participant>;

    /// Subscribe to session lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
