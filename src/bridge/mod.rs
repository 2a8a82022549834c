//! Event bridge
//!
//! Forwards the recording-relevant subset of call-session events into the
//! controller's single ordered inbox, decoupling the state machine from
//! the session's native event vocabulary. Attached at recording start,
//! detached exactly once at controller termination.

use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::recorder::controller::EngineEvent;
use crate::session::{CallSession, SessionEvent};

/// Which session events the engine cares about. Everything else stays on
/// the session side of the boundary.
fn relevant(event: &SessionEvent) -> bool {
    matches!(
        event,
        SessionEvent::TrackAvailable { .. }
            | SessionEvent::ParticipantUpdated { .. }
            | SessionEvent::SessionError { .. }
    )
}

/// Subscription forwarding session events to the engine inbox.
pub struct EventBridge {
    task: JoinHandle<()>,
    detached: bool,
}

impl EventBridge {
    /// Subscribe to `session` and forward relevant events into `inbox`,
    /// preserving arrival order. Duplicate delivery is passed through; the
    /// consumer's re-composition is idempotent.
    pub fn attach(
        session: &dyn CallSession,
        inbox: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let mut events = session.subscribe();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !relevant(&event) {
                            continue;
                        }
                        if inbox.send(EngineEvent::Session(event)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Dropped events are recoverable: the next roster
                        // read sees the current state anyway.
                        tracing::warn!(skipped, "session event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self {
            task,
            detached: false,
        }
    }

    /// Stop forwarding. Safe to call more than once; only the first call
    /// does anything.
    pub fn detach(&mut self) {
        if !self.detached {
            self.task.abort();
            self.detached = true;
            tracing::debug!("event bridge detached");
        }
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.detach();
    }
}
