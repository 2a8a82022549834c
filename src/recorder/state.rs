//! Recording state management
//!
//! Defines the recording state machine states, session configuration and
//! the finished-recording output types.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timeline::SpeakerSegment;

/// Current state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Controller constructed, nothing started
    Idle,
    /// Composing tracks and creating the recorder
    Acquiring,
    /// Recorder running, chunks arriving
    Recording,
    /// Stop issued, waiting for the recorder's terminal event
    Stopping,
    /// Terminal: artifact assembled
    Stopped,
    /// Terminal: unrecoverable failure
    Failed,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

impl RecordingState {
    /// Stopped and Failed are dead ends; a new recording needs a new
    /// controller instance.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// One codec candidate offered to the recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecCandidate {
    /// Full MIME string handed to the recorder, e.g.
    /// `video/webm;codecs=vp9,opus`.
    pub mime_type: String,

    /// Short label for logs and diagnostics.
    pub label: String,
}

impl CodecCandidate {
    pub fn new(mime_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            label: label.into(),
        }
    }
}

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfig {
    /// How long to wait for the recorder's stop event before assembling a
    /// best-effort artifact anyway.
    #[serde(with = "duration_secs")]
    pub stop_timeout: Duration,

    /// How often the recorder is asked to flush a chunk.
    #[serde(with = "duration_secs")]
    pub data_interval: Duration,

    /// Codec preference order, most preferred first. The last entry should
    /// be a generic container; negotiation falls through to it when nothing
    /// explicit is supported.
    pub codec_preferences: Vec<CodecCandidate>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(5),
            data_interval: Duration::from_secs(1),
            codec_preferences: vec![
                CodecCandidate::new("video/webm;codecs=vp9,opus", "webm/vp9"),
                CodecCandidate::new("video/webm;codecs=vp8,opus", "webm/vp8"),
                CodecCandidate::new("video/webm", "webm"),
            ],
        }
    }
}

/// The encoding resolved for one session; immutable after negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecChoice {
    pub mime_type: String,
    pub label: String,
}

impl From<&CodecCandidate> for CodecChoice {
    fn from(candidate: &CodecCandidate) -> Self {
        Self {
            mime_type: candidate.mime_type.clone(),
            label: candidate.label.clone(),
        }
    }
}

/// Non-fatal outcomes recorded for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Diagnostic {
    /// The preferred codec was unsupported; a fallback was selected.
    CodecFallback { chosen: String },
    /// Local participant published no playable audio track.
    MissingLocalAudio,
    /// Local participant published no playable video track.
    MissingLocalVideo,
    /// The recorder never confirmed its stop; the artifact is best-effort.
    StopTimeout { waited_seconds: f64 },
    /// The recording produced zero chunks.
    EmptyArtifact,
}

/// Finalized binary media object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingArtifact {
    pub mime_type: String,

    /// The encoded media, chunks concatenated in arrival order.
    pub data: Vec<u8>,
}

impl RecordingArtifact {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Result of a completed recording, handed to the persistence and
/// downstream-processing collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOutput {
    /// Session this output came from
    pub session_id: Uuid,

    /// Unix timestamp (ms) when the recorder actually started
    pub started_at_unix_ms: u64,

    /// Total recorded duration in seconds
    pub duration_seconds: f64,

    pub artifact: RecordingArtifact,

    /// Speaker attribution timeline, ordered, every segment closed
    pub segments: Vec<SpeakerSegment>,

    pub diagnostics: Vec<Diagnostic>,
}

impl RecordingOutput {
    /// Speaker of the first segment, used as the primary attribution for
    /// downstream transcription.
    pub fn primary_speaker(&self) -> Option<&str> {
        self.segments.first().map(|s| s.speaker_id.as_str())
    }
}

pub(crate) fn unix_now_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
