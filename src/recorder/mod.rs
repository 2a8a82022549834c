//! Recording system module
//!
//! This module implements the recording engine:
//! - Track composition over the call roster
//! - Codec negotiation by preference order
//! - The RecordingController state machine driving an external recorder

pub mod backend;
pub mod codec;
pub mod compose;
pub mod controller;
pub mod state;

pub use backend::{MediaRecorder, RecorderEvent, RecorderFactory};
pub use codec::{negotiate, SupportsMime};
pub use compose::{compose, Composition, TrackSet};
pub use controller::{EngineEvent, EngineNotice, RecordingController};
pub use state::{
    CodecCandidate, CodecChoice, Diagnostic, RecordingArtifact, RecordingConfig, RecordingOutput,
    RecordingState,
};
