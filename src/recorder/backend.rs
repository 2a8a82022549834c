//! Recorder boundary
//!
//! The external facility that encodes the composed track set into chunks.
//! Its asynchronous callbacks are modeled as messages on a channel the
//! controller owns, never as registered handlers.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::session::TrackRef;
use crate::utils::error::EngineResult;

use super::compose::TrackSet;
use super::state::CodecChoice;

/// Events emitted by a running recorder, delivered in emission order.
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// A flushed chunk of encoded media. May be empty; empty chunks are
    /// dropped by the controller.
    Data(Vec<u8>),

    /// Terminal confirmation that the recorder stopped and flushed.
    Stopped,

    /// Unrecoverable runtime failure.
    Error(String),
}

/// A live recorder instance bound to one composed track set.
#[async_trait]
pub trait MediaRecorder: Send {
    /// Begin encoding, flushing a data chunk every `data_interval`.
    async fn start(&mut self, data_interval: Duration) -> EngineResult<()>;

    /// Ask the recorder to stop. Confirmation arrives as
    /// `RecorderEvent::Stopped` on the event channel; it may never come,
    /// which the controller bounds with a timeout.
    async fn request_stop(&mut self) -> EngineResult<()>;

    /// Attach an additional track to the live stream. Attaching a track id
    /// that is already part of the stream must be a no-op.
    fn add_track(&mut self, track: TrackRef) -> EngineResult<()>;
}

/// Creates recorders and answers codec support probes.
pub trait RecorderFactory: Send + Sync {
    /// Whether the recording facility supports the given MIME/codec string.
    fn supports_mime(&self, mime_type: &str) -> bool;

    /// Create a recorder over the composed tracks. Events are delivered on
    /// `events` in emission order.
    fn create(
        &self,
        tracks: &TrackSet,
        codec: &CodecChoice,
        events: mpsc::UnboundedSender<RecorderEvent>,
    ) -> EngineResult<Box<dyn MediaRecorder>>;
}
