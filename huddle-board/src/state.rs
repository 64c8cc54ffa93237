//! Shared service state
//!
//! Thread-safe state shared across request handlers: the change-notification
//! broadcaster and the active coach exchange slot.

use huddle_common::events::HuddleEvent;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Shared state accessible by all handlers
pub struct SharedState {
    /// Change-notification broadcaster for SSE subscribers
    pub event_tx: broadcast::Sender<HuddleEvent>,

    /// The one active coach exchange, if any
    ///
    /// The media sink is exclusive to a single session: starting a new
    /// exchange aborts the previous task, whose session drop guard releases
    /// the sink.
    active_coach: Mutex<Option<JoinHandle<()>>>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            event_tx,
            active_coach: Mutex::new(None),
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: HuddleEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the change-notification stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<HuddleEvent> {
        self.event_tx.subscribe()
    }

    /// Register a new coach exchange, superseding any active one
    pub fn begin_coach_exchange(&self, handle: JoinHandle<()>) {
        let mut slot = self.active_coach.lock().unwrap();
        if let Some(previous) = slot.replace(handle) {
            debug!("superseding active coach exchange");
            previous.abort();
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_common::events::CoachStatus;

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        state.broadcast_event(HuddleEvent::CoachStatusChanged {
            status: CoachStatus::Processing,
            timestamp: chrono::Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            HuddleEvent::CoachStatusChanged {
                status: CoachStatus::Processing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_ok() {
        let state = SharedState::new();
        state.broadcast_event(HuddleEvent::CoachStatusChanged {
            status: CoachStatus::Idle,
            timestamp: chrono::Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_new_exchange_aborts_previous() {
        let state = SharedState::new();

        // The first exchange holds a sender it would never send on; abortion
        // drops it, which the receiver observes as an error.
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let first = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        state.begin_coach_exchange(first);

        let second = tokio::spawn(async {});
        state.begin_coach_exchange(second);

        assert!(rx.await.is_err());
    }
}
