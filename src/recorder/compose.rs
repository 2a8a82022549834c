//! Track composition
//!
//! Builds the recordable `TrackSet` from the call roster: the local
//! participant's audio and video first, then every remote participant's
//! tracks. Missing modalities degrade to diagnostics; only an empty result
//! or a missing local participant is an error.

use std::collections::HashMap;
use std::fmt;

use crate::session::{CallSession, ParticipantId, TrackRef};
use crate::utils::error::{AcquisitionError, EngineResult};

use super::state::Diagnostic;

/// The composed media for one recording session.
///
/// Invariant: never empty. `compose` refuses to produce a TrackSet with
/// zero tracks.
#[derive(Clone, Default)]
pub struct TrackSet {
    pub local_audio: Option<TrackRef>,
    pub local_video: Option<TrackRef>,
    pub remote: HashMap<ParticipantId, Vec<TrackRef>>,
}

impl TrackSet {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.local_audio.iter().count()
            + self.local_video.iter().count()
            + self.remote.values().map(Vec::len).sum::<usize>()
    }

    /// All composed tracks, local first.
    pub fn tracks(&self) -> Vec<TrackRef> {
        let mut tracks = Vec::with_capacity(self.len());
        tracks.extend(self.local_audio.iter().cloned());
        tracks.extend(self.local_video.iter().cloned());
        for remote_tracks in self.remote.values() {
            tracks.extend(remote_tracks.iter().cloned());
        }
        tracks
    }

    /// Ids of all composed tracks; used for idempotent re-attachment.
    pub fn track_ids(&self) -> Vec<String> {
        self.tracks().iter().map(|t| t.id().to_string()).collect()
    }
}

impl fmt::Debug for TrackSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackSet")
            .field("local_audio", &self.local_audio.as_ref().map(|t| t.id()))
            .field("local_video", &self.local_video.as_ref().map(|t| t.id()))
            .field("remote_participants", &self.remote.len())
            .finish()
    }
}

/// Result of composition: the track set plus any degraded-media warnings.
#[derive(Debug)]
pub struct Composition {
    pub tracks: TrackSet,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compose the recordable track set from the session's current roster.
///
/// Reads the roster once, synchronously; never starts or stops a track.
/// Re-running against an unchanged roster yields an equivalent TrackSet
/// (same track ids), which is what makes event-driven re-composition
/// idempotent.
pub fn compose(session: &dyn CallSession) -> EngineResult<Composition> {
    let local = session
        .local_participant()
        .ok_or(AcquisitionError::NoLocalParticipant)?;

    let mut tracks = TrackSet::default();
    let mut diagnostics = Vec::new();

    tracks.local_audio = local.audio.resolve();
    if tracks.local_audio.is_none() {
        tracing::warn!(participant = %local.id, "local audio unavailable, recording without it");
        diagnostics.push(Diagnostic::MissingLocalAudio);
    }

    tracks.local_video = local.video.resolve();
    if tracks.local_video.is_none() {
        tracing::warn!(participant = %local.id, "local video unavailable, recording without it");
        diagnostics.push(Diagnostic::MissingLocalVideo);
    }

    for participant in session.participants() {
        if participant.is_local {
            continue;
        }

        let mut remote_tracks = Vec::new();
        remote_tracks.extend(participant.audio.resolve());
        remote_tracks.extend(participant.video.resolve());

        if remote_tracks.is_empty() {
            tracing::debug!(participant = %participant.id, "remote participant has no playable tracks");
            continue;
        }

        tracks.remote.insert(participant.id.clone(), remote_tracks);
    }

    if tracks.is_empty() {
        return Err(AcquisitionError::NoPlayableTracks.into());
    }

    tracing::info!(
        track_count = tracks.len(),
        remote_participants = tracks.remote.len(),
        "composed track set"
    );

    Ok(Composition {
        tracks,
        diagnostics,
    })
}
