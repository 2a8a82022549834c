//! Hand-off payloads for external collaborators
//!
//! The engine does not upload artifacts or call the transcription pipeline;
//! it only shapes the data those collaborators need once the controller
//! reaches a terminal state.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recorder::state::{Diagnostic, RecordingOutput};
use crate::timeline::SpeakerSegment;

/// Metadata for the persistence collaborator, stored alongside the binary
/// artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub session_id: Uuid,
    pub mime_type: String,
    pub size_bytes: usize,
    pub duration_seconds: f64,
    pub recorded_at: DateTime<Utc>,
    pub segments: Vec<SpeakerSegment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordingMetadata {
    pub fn from_output(output: &RecordingOutput) -> Self {
        Self {
            session_id: output.session_id,
            mime_type: output.artifact.mime_type.clone(),
            size_bytes: output.artifact.len(),
            duration_seconds: output.duration_seconds,
            recorded_at: Utc
                .timestamp_millis_opt(output.started_at_unix_ms as i64)
                .single()
                .unwrap_or_else(Utc::now),
            segments: output.segments.clone(),
            diagnostics: output.diagnostics.clone(),
        }
    }
}

/// Request body for the downstream transcription + summarization pipeline.
/// `speaker` is the primary attribution: whoever the first segment belongs
/// to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    pub session_id: Uuid,
    pub audio_url: String,
    pub speaker: Option<String>,
    pub duration_seconds: f64,
    pub segments: Vec<SpeakerSegment>,
}

impl ProcessingRequest {
    /// Build the pipeline payload for an artifact already uploaded to
    /// `audio_url`.
    pub fn from_output(output: &RecordingOutput, audio_url: impl Into<String>) -> Self {
        Self {
            session_id: output.session_id,
            audio_url: audio_url.into(),
            speaker: output.primary_speaker().map(str::to_string),
            duration_seconds: output.duration_seconds,
            segments: output.segments.clone(),
        }
    }
}
