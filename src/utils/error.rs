//! Error types and handling
//!
//! Common error types used across the engine.

use thiserror::Error;

use crate::recorder::state::RecordingState;

/// Reasons track acquisition can fail outright.
///
/// Partial media (a missing camera or mic) is not an acquisition failure;
/// those surface as diagnostics instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("call has no local participant (not joined)")]
    NoLocalParticipant,

    #[error("no playable audio or video track from any participant")]
    NoPlayableTracks,
}

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("track acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("recorder error: {0}")]
    Recorder(String),

    #[error("invalid state: expected {expected}, controller is {actual:?}")]
    InvalidState {
        expected: &'static str,
        actual: RecordingState,
    },

    #[error("engine event channel closed unexpectedly")]
    ChannelClosed,
}

impl EngineError {
    pub(crate) fn invalid_state(expected: &'static str, actual: RecordingState) -> Self {
        Self::InvalidState { expected, actual }
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;
