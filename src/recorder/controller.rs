//! Recording controller
//!
//! The state machine that owns one recording session end to end:
//! Idle → Acquiring → Recording → Stopping → Stopped, with Failed reachable
//! from any non-terminal state. All asynchronous inputs (recorder chunks,
//! session track events) arrive through a single ordered inbox and are
//! processed cooperatively at the controller's entry points.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::bridge::EventBridge;
use crate::session::{CallSession, SessionEvent, TrackRef};
use crate::timeline::{SpeakerSegment, SpeakerTimeline};
use crate::utils::error::{EngineError, EngineResult};

use super::backend::{MediaRecorder, RecorderEvent, RecorderFactory};
use super::codec::negotiate;
use super::compose::compose;
use super::state::{
    unix_now_ms, CodecChoice, Diagnostic, RecordingArtifact, RecordingConfig, RecordingOutput,
    RecordingState,
};

/// Everything the state machine consumes, in arrival order.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Recorder(RecorderEvent),
    Session(SessionEvent),
}

/// Lifecycle notifications for observers (UI, metrics).
#[derive(Debug, Clone)]
pub enum EngineNotice {
    Started,
    SpeakerChanged { speaker_id: String },
    Stopped,
    Failed(String),
}

/// Owns one recording attempt. Terminal states are dead ends; record again
/// with a fresh controller.
pub struct RecordingController {
    session_id: Uuid,
    config: RecordingConfig,
    factory: Arc<dyn RecorderFactory>,

    state: Arc<RwLock<RecordingState>>,

    session: Option<Arc<dyn CallSession>>,
    recorder: Option<Box<dyn MediaRecorder>>,
    codec: Option<CodecChoice>,

    /// Every track handed to the recorder; released exactly once at
    /// teardown.
    composed_tracks: Vec<TrackRef>,
    attached_ids: HashSet<String>,

    inbox: mpsc::UnboundedReceiver<EngineEvent>,
    inbox_tx: mpsc::UnboundedSender<EngineEvent>,
    bridge: Option<EventBridge>,
    recorder_pump: Option<JoinHandle<()>>,

    started_at: Option<Instant>,
    started_at_unix_ms: Option<u64>,

    chunks: Vec<Vec<u8>>,
    timeline: SpeakerTimeline,
    diagnostics: Vec<Diagnostic>,

    stop_confirmed: bool,
    pending_failure: Option<String>,
    failure: Option<String>,
    output: Option<RecordingOutput>,

    notice_tx: broadcast::Sender<EngineNotice>,
}

impl RecordingController {
    pub fn new(factory: Arc<dyn RecorderFactory>, config: RecordingConfig) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (notice_tx, _) = broadcast::channel(100);

        Self {
            session_id: Uuid::new_v4(),
            config,
            factory,
            state: Arc::new(RwLock::new(RecordingState::Idle)),
            session: None,
            recorder: None,
            codec: None,
            composed_tracks: Vec::new(),
            attached_ids: HashSet::new(),
            inbox,
            inbox_tx,
            bridge: None,
            recorder_pump: None,
            started_at: None,
            started_at_unix_ms: None,
            chunks: Vec::new(),
            timeline: SpeakerTimeline::new(),
            diagnostics: Vec::new(),
            stop_confirmed: false,
            pending_failure: None,
            failure: None,
            output: None,
            notice_tx,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current state of the state machine
    pub fn state(&self) -> RecordingState {
        *self.state.read()
    }

    /// Subscribe to lifecycle notices
    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotice> {
        self.notice_tx.subscribe()
    }

    /// Seconds since the recorder actually started; 0 before that.
    pub fn elapsed_seconds(&self) -> f64 {
        self.started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// The speaker timeline so far, in start order.
    pub fn segments(&self) -> &[SpeakerSegment] {
        self.timeline.segments()
    }

    pub fn current_speaker(&self) -> Option<&str> {
        self.timeline.current_speaker()
    }

    /// Start recording the given call.
    ///
    /// Composes tracks and negotiates the codec synchronously, then creates
    /// and starts the recorder. Acquisition failures surface here and leave
    /// the controller Failed.
    pub async fn start(&mut self, session: Arc<dyn CallSession>) -> EngineResult<()> {
        self.process_events();

        let current = self.state();
        if current != RecordingState::Idle {
            return Err(EngineError::invalid_state("idle", current));
        }
        *self.state.write() = RecordingState::Acquiring;
        tracing::info!(session_id = %self.session_id, "starting recording");

        let composition = match compose(session.as_ref()) {
            Ok(composition) => composition,
            Err(err) => {
                self.fail(err.to_string());
                return Err(err);
            }
        };
        self.diagnostics.extend(composition.diagnostics.iter().cloned());

        // From here the composed hardware tracks are ours until cleanup.
        self.composed_tracks = composition.tracks.tracks();
        self.attached_ids = self
            .composed_tracks
            .iter()
            .map(|t| t.id().to_string())
            .collect();

        let factory = Arc::clone(&self.factory);
        let probe = move |mime: &str| factory.supports_mime(mime);
        let (codec, codec_diagnostic) = negotiate(&probe, &self.config.codec_preferences);
        self.diagnostics.extend(codec_diagnostic);

        // Recorder events join the same ordered inbox as session events.
        let (recorder_tx, mut recorder_rx) = mpsc::unbounded_channel();
        let inbox_tx = self.inbox_tx.clone();
        self.recorder_pump = Some(tokio::spawn(async move {
            while let Some(event) = recorder_rx.recv().await {
                if inbox_tx.send(EngineEvent::Recorder(event)).is_err() {
                    break;
                }
            }
        }));

        let mut recorder = match self.factory.create(&composition.tracks, &codec, recorder_tx) {
            Ok(recorder) => recorder,
            Err(err) => {
                self.fail(err.to_string());
                return Err(err);
            }
        };

        if let Err(err) = recorder.start(self.config.data_interval).await {
            self.fail(err.to_string());
            return Err(err);
        }

        // The recorder is running as of this instant; this, not the start()
        // call time, is the timeline's zero point.
        self.started_at = Some(Instant::now());
        self.started_at_unix_ms = Some(unix_now_ms());

        self.bridge = Some(EventBridge::attach(session.as_ref(), self.inbox_tx.clone()));
        self.session = Some(session);
        self.recorder = Some(recorder);

        tracing::info!(codec = %codec.label, tracks = self.attached_ids.len(), "recording started");
        self.codec = Some(codec);
        *self.state.write() = RecordingState::Recording;
        let _ = self.notice_tx.send(EngineNotice::Started);
        Ok(())
    }

    /// Stop recording and return the finished output.
    ///
    /// Idempotent outside of Recording: before any start it returns
    /// `Ok(None)`, after a stop it returns the same output again, and after
    /// a failure it returns the same error again. The recorder gets
    /// `config.stop_timeout` to confirm; past that a best-effort artifact
    /// is assembled from whatever chunks arrived.
    pub async fn stop(&mut self) -> EngineResult<Option<RecordingOutput>> {
        self.process_events();

        let current = self.state();
        match current {
            RecordingState::Idle => Ok(None),
            RecordingState::Stopped => Ok(self.output.clone()),
            RecordingState::Failed => Err(self.failure_error()),
            RecordingState::Acquiring => {
                // stop raced an unsettled start; settle to Failed
                self.fail("stopped during acquisition".to_string());
                Ok(None)
            }
            RecordingState::Stopping => Err(EngineError::invalid_state("recording", current)),
            RecordingState::Recording => self.stop_recording().await,
        }
    }

    async fn stop_recording(&mut self) -> EngineResult<Option<RecordingOutput>> {
        *self.state.write() = RecordingState::Stopping;
        tracing::info!(session_id = %self.session_id, "stopping recording");

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(err) = recorder.request_stop().await {
                let reason = err.to_string();
                self.fail(reason.clone());
                return Err(EngineError::Recorder(reason));
            }
        }

        let stop_issued = Instant::now();
        let deadline = stop_issued + self.config.stop_timeout;

        while !self.stop_confirmed {
            if let Some(reason) = self.pending_failure.take() {
                self.fail(reason.clone());
                return Err(EngineError::Recorder(reason));
            }

            let received = time::timeout_at(deadline, self.inbox.recv()).await;
            match received {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) => return Err(EngineError::ChannelClosed),
                Err(_) => {
                    let waited_seconds = stop_issued.elapsed().as_secs_f64();
                    tracing::warn!(
                        waited_seconds,
                        "recorder never confirmed stop, assembling best-effort artifact"
                    );
                    self.diagnostics.push(Diagnostic::StopTimeout { waited_seconds });
                    break;
                }
            }
        }

        self.finish_stop_wait()
    }

    /// Apply whatever raced in alongside the stop confirmation, then
    /// finalize. Late flushes still belong to the recording; a late
    /// recorder error still fails the session — Failed never flips to
    /// Stopped.
    fn finish_stop_wait(&mut self) -> EngineResult<Option<RecordingOutput>> {
        self.process_events();
        if self.state() == RecordingState::Failed {
            return Err(self.failure_error());
        }
        Ok(Some(self.finalize_stopped()))
    }

    /// Designate the current speaker. Accepted in every non-terminal state;
    /// before the recorder starts the offset clamps to zero.
    pub fn set_speaker(&mut self, speaker_id: impl Into<String>) -> EngineResult<()> {
        self.process_events();

        let current = self.state();
        if current.is_terminal() {
            return Err(EngineError::invalid_state("an active session", current));
        }

        let offset = if current == RecordingState::Recording {
            self.elapsed_seconds()
        } else {
            0.0
        };

        let speaker_id = speaker_id.into();
        self.timeline.set_speaker(speaker_id.clone(), offset);
        let _ = self.notice_tx.send(EngineNotice::SpeakerChanged { speaker_id });
        Ok(())
    }

    /// Drain and apply everything queued in the inbox. Runs automatically
    /// at every entry point; hosts may also call it to apply track events
    /// between calls.
    pub fn process_events(&mut self) {
        while let Ok(event) = self.inbox.try_recv() {
            self.handle_event(event);
        }
        if let Some(reason) = self.pending_failure.take() {
            self.fail(reason);
        }
    }

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Recorder(RecorderEvent::Data(chunk)) => {
                if chunk.is_empty() {
                    return;
                }
                if matches!(
                    self.state(),
                    RecordingState::Recording | RecordingState::Stopping
                ) {
                    tracing::debug!(bytes = chunk.len(), "chunk received");
                    self.chunks.push(chunk);
                }
            }
            EngineEvent::Recorder(RecorderEvent::Stopped) => {
                self.stop_confirmed = true;
            }
            EngineEvent::Recorder(RecorderEvent::Error(message)) => {
                if !self.state().is_terminal() && !self.stop_confirmed {
                    self.pending_failure.get_or_insert(message);
                }
            }
            EngineEvent::Session(SessionEvent::TrackAvailable { participant, kind }) => {
                tracing::debug!(%participant, %kind, "track became available");
                self.recompose();
            }
            EngineEvent::Session(SessionEvent::ParticipantUpdated { participant }) => {
                tracing::debug!(%participant, "participant updated");
                self.recompose();
            }
            EngineEvent::Session(SessionEvent::SessionError { message }) => {
                tracing::warn!(%message, "call session reported an error");
            }
            EngineEvent::Session(SessionEvent::Joined) => {}
        }
    }

    /// Re-run composition and attach tracks we have not seen before.
    /// Idempotent: an unchanged roster attaches nothing.
    fn recompose(&mut self) {
        if self.state() != RecordingState::Recording {
            return;
        }
        let Some(session) = self.session.clone() else {
            return;
        };

        let composition = match compose(session.as_ref()) {
            Ok(composition) => composition,
            Err(err) => {
                tracing::warn!(%err, "re-composition failed, keeping current track set");
                return;
            }
        };

        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };

        for track in composition.tracks.tracks() {
            let id = track.id().to_string();
            if self.attached_ids.contains(&id) {
                continue;
            }
            match recorder.add_track(Arc::clone(&track)) {
                Ok(()) => {
                    tracing::info!(track = %id, "attached late track");
                    self.attached_ids.insert(id);
                    self.composed_tracks.push(track);
                }
                Err(err) => {
                    tracing::warn!(track = %id, %err, "failed to attach late track");
                }
            }
        }
    }

    fn finalize_stopped(&mut self) -> RecordingOutput {
        let duration = self.elapsed_seconds();
        self.timeline.close_open_segment(duration);

        if self.chunks.is_empty() {
            // Zero chunks is a successful-but-empty recording, not a crash.
            self.diagnostics.push(Diagnostic::EmptyArtifact);
        }
        let data = self.chunks.concat();
        self.chunks.clear();

        let artifact = RecordingArtifact {
            mime_type: self
                .codec
                .as_ref()
                .map(|c| c.mime_type.clone())
                .unwrap_or_default(),
            data,
        };

        self.cleanup();
        *self.state.write() = RecordingState::Stopped;

        let output = RecordingOutput {
            session_id: self.session_id,
            started_at_unix_ms: self.started_at_unix_ms.unwrap_or(0),
            duration_seconds: duration,
            artifact,
            segments: self.timeline.segments().to_vec(),
            diagnostics: self.diagnostics.clone(),
        };
        self.output = Some(output.clone());

        let _ = self.notice_tx.send(EngineNotice::Stopped);
        tracing::info!(
            duration_seconds = duration,
            bytes = output.artifact.len(),
            segments = output.segments.len(),
            "recording stopped"
        );
        output
    }

    /// Transition to Failed: close the timeline, discard chunks (a failed
    /// recorder's output cannot be trusted), release everything.
    fn fail(&mut self, reason: String) {
        if self.state().is_terminal() {
            return;
        }
        let offset = self.elapsed_seconds();
        self.timeline.close_open_segment(offset);
        self.chunks.clear();
        self.cleanup();
        *self.state.write() = RecordingState::Failed;
        tracing::error!(session_id = %self.session_id, %reason, "recording failed");
        self.failure = Some(reason.clone());
        let _ = self.notice_tx.send(EngineNotice::Failed(reason));
    }

    fn failure_error(&self) -> EngineError {
        EngineError::Recorder(
            self.failure
                .clone()
                .unwrap_or_else(|| "recording failed".to_string()),
        )
    }

    /// Release composed tracks, detach the bridge, drop the recorder.
    /// Runs exactly once per session; both terminal paths share it.
    fn cleanup(&mut self) {
        for track in self.composed_tracks.drain(..) {
            track.stop();
        }
        self.attached_ids.clear();
        if let Some(mut bridge) = self.bridge.take() {
            bridge.detach();
        }
        if let Some(pump) = self.recorder_pump.take() {
            pump.abort();
        }
        self.recorder = None;
        self.session = None;
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        // A controller dropped mid-recording must still free the hardware.
        self.cleanup();
    }
}
