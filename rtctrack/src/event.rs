//! Event system for track state changes reported by the native engine
//!
//! The vocabulary is closed: `ended`, `mute`, `unmute` and `overconstrained`.
//! Listeners for each kind are kept in registration order and invoked
//! synchronously. The `on<event>` handler slots take part in the same ordering:
//! a slot sits where it was first bound and keeps that position when the
//! handler is replaced.

use parking_lot::Mutex;
use rtctrack_core::NotificationKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::trace;

/// Kinds of events a track emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackEventKind {
    /// The track ended
    Ended,
    /// The track was muted by its source
    Mute,
    /// The track was unmuted by its source
    Unmute,
    /// A constraint can no longer be satisfied
    Overconstrained,
}

impl TrackEventKind {
    /// Every event kind, in slot order
    pub const ALL: [TrackEventKind; 4] = [
        TrackEventKind::Ended,
        TrackEventKind::Mute,
        TrackEventKind::Unmute,
        TrackEventKind::Overconstrained,
    ];

    /// Event name
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackEventKind::Ended => "ended",
            TrackEventKind::Mute => "mute",
            TrackEventKind::Unmute => "unmute",
            TrackEventKind::Overconstrained => "overconstrained",
        }
    }

    fn index(self) -> usize {
        match self {
            TrackEventKind::Ended => 0,
            TrackEventKind::Mute => 1,
            TrackEventKind::Unmute => 2,
            TrackEventKind::Overconstrained => 3,
        }
    }
}

impl std::fmt::Display for TrackEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TrackEventKind {
    type Err = crate::TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::TrackError::UnknownEvent {
                name: s.to_string(),
            })
    }
}

/// An event delivered to track listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    /// The track ended; `readyState` is already `ended`
    Ended,
    /// The source stopped delivering media; `muted` is already `true`
    Mute,
    /// The source resumed; `muted` is already `false`
    Unmute,
    /// A constraint can no longer be satisfied
    Overconstrained {
        /// Name of the failing constraint
        constraint: Option<String>,
        /// Engine-provided detail
        message: Option<String>,
    },
}

impl TrackEvent {
    /// Kind of this event
    pub fn kind(&self) -> TrackEventKind {
        match self {
            TrackEvent::Ended => TrackEventKind::Ended,
            TrackEvent::Mute => TrackEventKind::Mute,
            TrackEvent::Unmute => TrackEventKind::Unmute,
            TrackEvent::Overconstrained { .. } => TrackEventKind::Overconstrained,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }
}

impl From<&NotificationKind> for TrackEvent {
    fn from(kind: &NotificationKind) -> Self {
        match kind {
            NotificationKind::Ended => TrackEvent::Ended,
            NotificationKind::Mute => TrackEvent::Mute,
            NotificationKind::Unmute => TrackEvent::Unmute,
            NotificationKind::Overconstrained {
                constraint,
                message,
            } => TrackEvent::Overconstrained {
                constraint: constraint.clone(),
                message: message.clone(),
            },
        }
    }
}

/// Identifies a registered listener for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked for every matching event
pub type Listener = Arc<dyn Fn(&TrackEvent) + Send + Sync>;

struct Entry {
    id: ListenerId,
    handler_slot: bool,
    listener: Listener,
}

/// Per-track listener registry
pub(crate) struct EventListeners {
    next_id: AtomicU64,
    lists: Mutex<[Vec<Entry>; 4]>,
}

impl EventListeners {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            lists: Mutex::new(Default::default()),
        }
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn add(&self, kind: TrackEventKind, listener: Listener) -> ListenerId {
        let id = self.next_id();
        self.lists.lock()[kind.index()].push(Entry {
            id,
            handler_slot: false,
            listener,
        });
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut lists = self.lists.lock();
        for list in lists.iter_mut() {
            if let Some(pos) = list.iter().position(|entry| entry.id == id && !entry.handler_slot) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub(crate) fn set_handler(&self, kind: TrackEventKind, handler: Option<Listener>) {
        let mut lists = self.lists.lock();
        let list = &mut lists[kind.index()];
        let slot = list.iter().position(|entry| entry.handler_slot);

        match (slot, handler) {
            (Some(pos), Some(listener)) => list[pos].listener = listener,
            (Some(pos), None) => {
                list.remove(pos);
            }
            (None, Some(listener)) => {
                let id = self.next_id();
                list.push(Entry {
                    id,
                    handler_slot: true,
                    listener,
                });
            }
            (None, None) => {}
        }
    }

    pub(crate) fn has_handler(&self, kind: TrackEventKind) -> bool {
        self.lists.lock()[kind.index()]
            .iter()
            .any(|entry| entry.handler_slot)
    }

    pub(crate) fn count(&self, kind: TrackEventKind) -> usize {
        self.lists.lock()[kind.index()].len()
    }

    /// Invoke every listener for the event's kind, returning how many ran.
    ///
    /// The list is snapshotted first, so listeners may register or remove
    /// listeners; such changes apply from the next dispatch.
    pub(crate) fn dispatch(&self, event: &TrackEvent) -> usize {
        let snapshot: Vec<Listener> = self.lists.lock()[event.kind().index()]
            .iter()
            .map(|entry| entry.listener.clone())
            .collect();

        trace!("Dispatching {} to {} listeners", event.event_type(), snapshot.len());
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lists = self.lists.lock();
        let mut map = f.debug_map();
        for kind in TrackEventKind::ALL {
            map.entry(&kind.as_str(), &lists[kind.index()].len());
        }
        map.finish()
    }
}

/// Stream of track events for async iteration
#[derive(Debug)]
pub struct EventStream {
    /// Receiver for events
    receiver: mpsc::UnboundedReceiver<TrackEvent>,
    /// Listeners feeding this stream, removed on close/drop
    registration: Option<(Weak<EventListeners>, Vec<ListenerId>)>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<TrackEvent>) -> Self {
        Self {
            receiver,
            registration: None,
        }
    }

    /// Create a stream fed by listeners on every event kind
    pub(crate) fn attach(listeners: &Arc<EventListeners>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let ids = TrackEventKind::ALL
            .into_iter()
            .map(|kind| {
                let tx = tx.clone();
                listeners.add(
                    kind,
                    Arc::new(move |event: &TrackEvent| {
                        let _ = tx.send(event.clone());
                    }),
                )
            })
            .collect();

        Self {
            receiver: rx,
            registration: Some((Arc::downgrade(listeners), ids)),
        }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<TrackEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<TrackEvent>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Close the event stream; already buffered events can still be read
    pub fn close(&mut self) {
        self.unregister();
        self.receiver.close();
    }

    /// Check if the event stream is closed
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }

    fn unregister(&mut self) {
        if let Some((listeners, ids)) = self.registration.take() {
            if let Some(listeners) = listeners.upgrade() {
                for id in ids {
                    listeners.remove(id);
                }
            }
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.unregister();
    }
}
