//! Media track boundary
//!
//! A track is a single audio or video source owned by the call session.
//! The engine never creates tracks; it resolves them from participant
//! records and stops them when a recording session releases its media.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Kind of media a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Handle to a live media track owned by the call session.
///
/// `stop` releases the underlying hardware source; the engine calls it for
/// every composed track exactly once, at session teardown.
pub trait MediaTrack: Send + Sync {
    /// Stable identifier, unique within one call session.
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    /// Whether the track is currently delivering media.
    fn is_playable(&self) -> bool;

    /// Release the underlying source.
    fn stop(&self);
}

pub type TrackRef = Arc<dyn MediaTrack>;

/// Where a participant record may expose a track handle.
///
/// Sessions publish tracks in more than one slot (a persistent handle that
/// survives renegotiation, and the current live handle). Resolution walks
/// `TRACK_SOURCE_ORDER` and takes the first playable hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Persistent,
    Live,
}

/// Fixed resolution priority, highest first.
pub const TRACK_SOURCE_ORDER: &[TrackSource] = &[TrackSource::Persistent, TrackSource::Live];

/// One modality of a participant's published media.
#[derive(Clone, Default)]
pub struct TrackSlot {
    /// Handle that survives track renegotiation, if the session provides one.
    pub persistent: Option<TrackRef>,

    /// Current live handle.
    pub live: Option<TrackRef>,
}

impl TrackSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_persistent(track: TrackRef) -> Self {
        Self {
            persistent: Some(track),
            live: None,
        }
    }

    pub fn with_live(track: TrackRef) -> Self {
        Self {
            persistent: None,
            live: Some(track),
        }
    }

    fn get(&self, source: TrackSource) -> Option<&TrackRef> {
        match source {
            TrackSource::Persistent => self.persistent.as_ref(),
            TrackSource::Live => self.live.as_ref(),
        }
    }

    /// Resolve the slot to a playable track, walking `TRACK_SOURCE_ORDER`.
    pub fn resolve(&self) -> Option<TrackRef> {
        TRACK_SOURCE_ORDER
            .iter()
            .filter_map(|source| self.get(*source))
            .find(|track| track.is_playable())
            .cloned()
    }
}

impl fmt::Debug for TrackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackSlot")
            .field("persistent", &self.persistent.as_ref().map(|t| t.id()))
            .field("live", &self.live.as_ref().map(|t| t.id()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTrack;

    #[test]
    fn resolve_prefers_persistent_over_live() {
        let slot = TrackSlot {
            persistent: Some(FakeTrack::audio("persistent")),
            live: Some(FakeTrack::audio("live")),
        };

        let resolved = slot.resolve().map(|t| t.id().to_string());
        assert_eq!(resolved.as_deref(), Some("persistent"));
    }

    #[test]
    fn resolve_falls_back_to_live_when_persistent_unplayable() {
        let slot = TrackSlot {
            persistent: Some(FakeTrack::unplayable_audio("persistent")),
            live: Some(FakeTrack::audio("live")),
        };

        let resolved = slot.resolve().map(|t| t.id().to_string());
        assert_eq!(resolved.as_deref(), Some("live"));
    }

    #[test]
    fn resolve_empty_slot_is_none() {
        assert!(TrackSlot::empty().resolve().is_none());
    }

    #[test]
    fn resolve_skips_fully_unplayable_slot() {
        let slot = TrackSlot {
            persistent: Some(FakeTrack::unplayable_audio("persistent")),
            live: Some(FakeTrack::unplayable_audio("live")),
        };

        assert!(slot.resolve().is_none());
    }
}
