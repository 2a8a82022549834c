//! callrec - Recording and speaker-segmentation engine for multi-party calls.
//!
//! The engine records a live call (an external [`session::CallSession`])
//! through an external recorder ([`recorder::RecorderFactory`]) and keeps a
//! speaker-attribution timeline against recorder-relative elapsed time. The
//! center of the crate is [`recorder::RecordingController`], a one-shot
//! state machine: construct one per recording attempt, `start` it with a
//! call session, mark speakers with `set_speaker`, and `stop` it to receive
//! a [`recorder::RecordingOutput`] — the binary artifact plus closed,
//! ordered speaker segments — for hand-off to persistence and the
//! transcription pipeline (see [`handoff`]).

pub mod bridge;
pub mod handoff;
pub mod recorder;
pub mod session;
pub mod timeline;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use recorder::{
    CodecCandidate, CodecChoice, Diagnostic, MediaRecorder, RecorderEvent, RecorderFactory,
    RecordingArtifact, RecordingConfig, RecordingController, RecordingOutput, RecordingState,
};
pub use session::{CallSession, MediaTrack, Participant, ParticipantId, SessionEvent, TrackKind};
pub use timeline::{SpeakerSegment, SpeakerTimeline};
pub use utils::error::{AcquisitionError, EngineError, EngineResult};
