//! Shared test doubles: an in-memory call session and a scriptable recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};

use crate::recorder::backend::{MediaRecorder, RecorderEvent, RecorderFactory};
use crate::recorder::compose::TrackSet;
use crate::recorder::state::CodecChoice;
use crate::session::{
    CallSession, MediaTrack, Participant, ParticipantId, SessionEvent, TrackKind, TrackSlot,
};
use crate::utils::error::{EngineError, EngineResult};

/// Let spawned forwarding tasks run to completion on the current-thread
/// test runtime.
pub async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

pub struct FakeTrack {
    id: String,
    kind: TrackKind,
    playable: bool,
    stopped: AtomicBool,
}

impl FakeTrack {
    pub fn new(id: &str, kind: TrackKind, playable: bool) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind,
            playable,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn audio(id: &str) -> Arc<Self> {
        Self::new(id, TrackKind::Audio, true)
    }

    pub fn video(id: &str) -> Arc<Self> {
        Self::new(id, TrackKind::Video, true)
    }

    pub fn unplayable_audio(id: &str) -> Arc<Self> {
        Self::new(id, TrackKind::Audio, false)
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_playable(&self) -> bool {
        self.playable
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// In-memory call session with a scriptable roster and event stream.
pub struct MockCallSession {
    participants: RwLock<Vec<Participant>>,
    events: broadcast::Sender<SessionEvent>,
    tracks: RwLock<Vec<Arc<FakeTrack>>>,
}

impl MockCallSession {
    fn empty() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            participants: RwLock::new(Vec::new()),
            events,
            tracks: RwLock::new(Vec::new()),
        }
    }

    /// Call never joined: no local participant at all.
    pub fn not_joined() -> Self {
        Self::empty()
    }

    /// Joined, but nobody publishes any playable media.
    pub fn joined_without_media() -> Self {
        let session = Self::empty();
        session.participants.write().push(Participant {
            id: ParticipantId::new("local"),
            name: "Host".to_string(),
            is_local: true,
            audio: TrackSlot::empty(),
            video: TrackSlot::empty(),
        });
        session
    }

    /// Local participant with a microphone only.
    pub fn local_audio_only() -> Self {
        let session = Self::empty();
        let audio = FakeTrack::audio("local-audio");
        session.tracks.write().push(Arc::clone(&audio));
        session.participants.write().push(Participant {
            id: ParticipantId::new("local"),
            name: "Host".to_string(),
            is_local: true,
            audio: TrackSlot::with_persistent(audio),
            video: TrackSlot::empty(),
        });
        session
    }

    /// Local participant with mic + camera, plus one remote ("bob") with
    /// both modalities.
    pub fn full_roster() -> Self {
        let session = Self::empty();

        let local_audio = FakeTrack::audio("local-audio");
        let local_video = FakeTrack::video("local-video");
        let bob_audio = FakeTrack::audio("bob-audio");
        let bob_video = FakeTrack::video("bob-video");
        {
            let mut tracks = session.tracks.write();
            tracks.push(Arc::clone(&local_audio));
            tracks.push(Arc::clone(&local_video));
            tracks.push(Arc::clone(&bob_audio));
            tracks.push(Arc::clone(&bob_video));
        }

        let mut participants = session.participants.write();
        participants.push(Participant {
            id: ParticipantId::new("local"),
            name: "Host".to_string(),
            is_local: true,
            audio: TrackSlot::with_persistent(local_audio),
            video: TrackSlot::with_persistent(local_video),
        });
        participants.push(Participant {
            id: ParticipantId::new("bob"),
            name: "Bob".to_string(),
            is_local: false,
            audio: TrackSlot::with_live(bob_audio),
            video: TrackSlot::with_live(bob_video),
        });
        drop(participants);

        session
    }

    /// Add a remote participant publishing one audio track named
    /// `<name>-audio`.
    pub fn add_remote_with_audio(&self, name: &str) -> Arc<FakeTrack> {
        let track = FakeTrack::audio(&format!("{name}-audio"));
        self.tracks.write().push(Arc::clone(&track));
        self.participants.write().push(Participant {
            id: ParticipantId::new(name),
            name: name.to_string(),
            is_local: false,
            audio: TrackSlot::with_live(Arc::clone(&track) as Arc<dyn MediaTrack>),
            video: TrackSlot::empty(),
        });
        track
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn emit_track_available(&self, participant: &str) {
        self.emit(SessionEvent::TrackAvailable {
            participant: ParticipantId::new(participant),
            kind: TrackKind::Audio,
        });
    }

    pub fn all_tracks_stopped(&self) -> bool {
        self.tracks.read().iter().all(|t| t.was_stopped())
    }
}

impl CallSession for MockCallSession {
    fn participants(&self) -> Vec<Participant> {
        self.participants.read().clone()
    }

    fn local_participant(&self) -> Option<Participant> {
        self.participants.read().iter().find(|p| p.is_local).cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Observer side of one created `MockRecorder`.
#[derive(Clone)]
pub struct RecorderHandle {
    events: mpsc::UnboundedSender<RecorderEvent>,
    added: Arc<Mutex<Vec<String>>>,
    stop_requested: Arc<AtomicBool>,
}

impl RecorderHandle {
    pub fn emit_data(&self, chunk: Vec<u8>) {
        let _ = self.events.send(RecorderEvent::Data(chunk));
    }

    pub fn emit_error(&self, message: &str) {
        let _ = self.events.send(RecorderEvent::Error(message.to_string()));
    }

    /// Track ids attached after creation, in attach order.
    pub fn added_tracks(&self) -> Vec<String> {
        self.added.lock().clone()
    }

    pub fn stop_was_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

struct MockRecorder {
    events: mpsc::UnboundedSender<RecorderEvent>,
    added: Arc<Mutex<Vec<String>>>,
    stop_requested: Arc<AtomicBool>,
    confirm_stop: bool,
    fail_on_start: bool,
}

#[async_trait]
impl MediaRecorder for MockRecorder {
    async fn start(&mut self, _data_interval: Duration) -> EngineResult<()> {
        if self.fail_on_start {
            return Err(EngineError::Recorder("recorder refused to start".into()));
        }
        Ok(())
    }

    async fn request_stop(&mut self) -> EngineResult<()> {
        self.stop_requested.store(true, Ordering::SeqCst);
        if self.confirm_stop {
            let _ = self.events.send(RecorderEvent::Stopped);
        }
        Ok(())
    }

    fn add_track(&mut self, track: crate::session::TrackRef) -> EngineResult<()> {
        self.added.lock().push(track.id().to_string());
        Ok(())
    }
}

/// Scriptable recorder factory. Every created recorder leaves a
/// `RecorderHandle` behind for the test to drive.
pub struct MockRecorderFactory {
    supported: Box<dyn Fn(&str) -> bool + Send + Sync>,
    confirm_stop: bool,
    fail_on_start: bool,
    handles: Mutex<Vec<RecorderHandle>>,
}

impl MockRecorderFactory {
    pub fn new() -> Arc<Self> {
        Self::supporting(|_| true)
    }

    pub fn supporting(supported: impl Fn(&str) -> bool + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            supported: Box::new(supported),
            confirm_stop: true,
            fail_on_start: false,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Recorder that never confirms its stop event.
    pub fn silent_stop() -> Arc<Self> {
        Arc::new(Self {
            supported: Box::new(|_| true),
            confirm_stop: false,
            fail_on_start: false,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Recorder whose start command fails.
    pub fn failing_start() -> Arc<Self> {
        Arc::new(Self {
            supported: Box::new(|_| true),
            confirm_stop: true,
            fail_on_start: true,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Handle to the most recently created recorder.
    pub fn last_handle(&self) -> RecorderHandle {
        self.handles
            .lock()
            .last()
            .expect("no recorder created yet")
            .clone()
    }
}

impl RecorderFactory for MockRecorderFactory {
    fn supports_mime(&self, mime_type: &str) -> bool {
        (self.supported)(mime_type)
    }

    fn create(
        &self,
        _tracks: &TrackSet,
        _codec: &CodecChoice,
        events: mpsc::UnboundedSender<RecorderEvent>,
    ) -> EngineResult<Box<dyn MediaRecorder>> {
        let added = Arc::new(Mutex::new(Vec::new()));
        let stop_requested = Arc::new(AtomicBool::new(false));

        self.handles.lock().push(RecorderHandle {
            events: events.clone(),
            added: Arc::clone(&added),
            stop_requested: Arc::clone(&stop_requested),
        });

        Ok(Box::new(MockRecorder {
            events,
            added,
            stop_requested,
            confirm_stop: self.confirm_stop,
            fail_on_start: self.fail_on_start,
        }))
    }
}
