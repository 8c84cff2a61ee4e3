//! Session events and the bus that fans them out.
//!
//! Subscribers either hold a persistent [`broadcast`] receiver or register a
//! one-shot listener for a set of kinds; a one-shot listener is removed after
//! its first delivery, whichever of its kinds fired.

use nls_protocol::ControlResponse;
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::trace;

/// Event kinds, one per [`TranscriptionEvent`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Started,
    Begin,
    Changed,
    End,
    Completed,
    Failed,
    Closed,
}

/// Lifecycle and result events emitted by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionEvent {
    /// `TranscriptionStarted`
    Started(ControlResponse),
    /// `SentenceBegin`
    Begin(ControlResponse),
    /// `TranscriptionResultChanged`
    Changed(ControlResponse),
    /// `SentenceEnd`
    End(ControlResponse),
    /// `TranscriptionCompleted`
    Completed(ControlResponse),
    /// `TaskFailed`
    Failed(ControlResponse),
    /// The connection dropped without a local shutdown.
    Closed,
}

impl TranscriptionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Started(_) => EventKind::Started,
            Self::Begin(_) => EventKind::Begin,
            Self::Changed(_) => EventKind::Changed,
            Self::End(_) => EventKind::End,
            Self::Completed(_) => EventKind::Completed,
            Self::Failed(_) => EventKind::Failed,
            Self::Closed => EventKind::Closed,
        }
    }

    pub fn response(&self) -> Option<&ControlResponse> {
        match self {
            Self::Started(r)
            | Self::Begin(r)
            | Self::Changed(r)
            | Self::End(r)
            | Self::Completed(r)
            | Self::Failed(r) => Some(r),
            Self::Closed => None,
        }
    }
}

struct OnceListener {
    kinds: Vec<EventKind>,
    tx: oneshot::Sender<TranscriptionEvent>,
}

/// Typed publish/subscribe registry for [`TranscriptionEvent`]s.
pub struct EventBus {
    tx: broadcast::Sender<TranscriptionEvent>,
    once: Mutex<Vec<OnceListener>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            once: Mutex::new(Vec::new()),
        }
    }

    /// Persistent subscription to every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptionEvent> {
        self.tx.subscribe()
    }

    /// Resolve with the first event of any of `kinds`, then unsubscribe.
    ///
    /// Dropping the receiver before delivery unsubscribes on the next emit.
    pub fn once(&self, kinds: &[EventKind]) -> oneshot::Receiver<TranscriptionEvent> {
        let (tx, rx) = oneshot::channel();
        self.once.lock().push(OnceListener {
            kinds: kinds.to_vec(),
            tx,
        });
        rx
    }

    /// Number of one-shot listeners still waiting.
    pub fn pending_once(&self) -> usize {
        self.once.lock().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub(crate) fn emit(&self, event: TranscriptionEvent) {
        let kind = event.kind();
        trace!("Emitting {kind:?}");

        let fired: Vec<OnceListener> = {
            let mut once = self.once.lock();
            once.retain(|listener| !listener.tx.is_closed());
            let (fired, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut *once)
                .into_iter()
                .partition(|listener| listener.kinds.contains(&kind));
            *once = waiting;
            fired
        };
        for listener in fired {
            let _ = listener.tx.send(event.clone());
        }

        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(name: &str) -> ControlResponse {
        serde_json::from_value(json!({"header": {"name": name}, "payload": {}})).unwrap()
    }

    #[tokio::test]
    async fn persistent_subscribers_see_every_event_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(TranscriptionEvent::Begin(response("SentenceBegin")));
        bus.emit(TranscriptionEvent::End(response("SentenceEnd")));
        bus.emit(TranscriptionEvent::Closed);

        assert_eq!(rx.recv().await.unwrap().kind(), EventKind::Begin);
        assert_eq!(rx.recv().await.unwrap().kind(), EventKind::End);
        assert_eq!(rx.recv().await.unwrap(), TranscriptionEvent::Closed);
    }

    #[tokio::test]
    async fn once_fires_for_first_matching_kind_then_unsubscribes() {
        let bus = EventBus::new(16);
        let rx = bus.once(&[EventKind::Completed, EventKind::Failed]);
        assert_eq!(bus.pending_once(), 1);

        bus.emit(TranscriptionEvent::Changed(response("TranscriptionResultChanged")));
        assert_eq!(bus.pending_once(), 1);

        bus.emit(TranscriptionEvent::Failed(response("TaskFailed")));
        assert_eq!(bus.pending_once(), 0);
        let event = rx.await.unwrap();
        assert_eq!(event.kind(), EventKind::Failed);
        assert_eq!(event.response().unwrap().header.name, "TaskFailed");

        // A later matching event finds nobody waiting
        bus.emit(TranscriptionEvent::Completed(response("TranscriptionCompleted")));
        assert_eq!(bus.pending_once(), 0);
    }

    #[test]
    fn dropped_once_listener_is_pruned() {
        let bus = EventBus::new(16);
        drop(bus.once(&[EventKind::Completed]));
        bus.emit(TranscriptionEvent::Closed);
        assert_eq!(bus.pending_once(), 0);
    }

    #[test]
    fn emit_without_subscribers_is_fine() {
        let bus = EventBus::new(1);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(TranscriptionEvent::Closed);
    }
}
