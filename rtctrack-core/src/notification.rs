//! Asynchronous notifications pushed by the native engine

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::TrackResult;

/// Default number of buffered notifications per subscriber
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 100;

/// A track condition observed by the native engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Native track the notification refers to
    pub track_id: String,
    /// What happened
    #[serde(flatten)]
    pub kind: NotificationKind,
}

/// Notification vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotificationKind {
    /// The track's source is gone for good
    Ended,
    /// The source stopped delivering media
    Mute,
    /// The source resumed delivering media
    Unmute,
    /// A constraint can no longer be satisfied
    Overconstrained {
        /// Name of the failing constraint
        #[serde(default)]
        constraint: Option<String>,
        /// Engine-provided detail
        #[serde(default)]
        message: Option<String>,
    },
}

impl Notification {
    /// Create a notification for a track
    pub fn new(track_id: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            track_id: track_id.into(),
            kind,
        }
    }

    /// Decode a notification as emitted by the native bridge
    pub fn from_json(json: &str) -> TrackResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl NotificationKind {
    /// Name of the notification
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Ended => "ended",
            NotificationKind::Mute => "mute",
            NotificationKind::Unmute => "unmute",
            NotificationKind::Overconstrained { .. } => "overconstrained",
        }
    }
}

/// Fan-out of native notifications to every interested track handle
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl NotificationHub {
    /// Create a hub with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NOTIFICATION_CAPACITY)
    }

    /// Create a hub buffering up to `capacity` notifications per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Push a notification, returning how many subscribers will see it
    pub fn publish(&self, notification: Notification) -> usize {
        let track_id = notification.track_id.clone();
        let kind = notification.kind.as_str();
        match self.sender.send(notification) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for {} notification on track {}", kind, track_id);
                0
            }
        }
    }

    /// Subscribe to notifications published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
