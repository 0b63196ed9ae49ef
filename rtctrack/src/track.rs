//! Track handle for a single audio or video track
//!
//! A [`MediaStreamTrack`] wraps a native track id. Local commands
//! (`set_enabled`, `stop`, `release` and the camera controls) are forwarded to
//! the [`NativeEngine`] and applied to local state immediately, without waiting
//! for any acknowledgement. Conditions observed by the engine arrive as
//! [`Notification`]s; each one is applied to the handle's state before the
//! matching [`TrackEvent`] is dispatched.

use parking_lot::{ReentrantMutex, RwLock};
use rtctrack_core::{NativeEngine, Notification, NotificationKind, PhotoHandle, TrackError, TrackResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CaptureDefaults;
use crate::event::{EventListeners, EventStream, Listener, ListenerId, TrackEvent, TrackEventKind};
use crate::photo::PhotoOptions;

/// Constraints the track was created with
pub type Constraints = serde_json::Map<String, Value>;

/// Track kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for TrackKind {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(TrackKind::Audio),
            "video" => Ok(TrackKind::Video),
            other => Err(TrackError::InvalidDescriptor {
                message: format!("unknown track kind '{}'", other),
            }),
        }
    }
}

/// Track lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Track is usable
    Live,
    /// Track has ended and will never be live again
    Ended,
}

impl ReadyState {
    /// Normalize a native ready-state string.
    ///
    /// `initializing` and `live` (any case) map to [`ReadyState::Live`];
    /// everything else, including unknown values, maps to [`ReadyState::Ended`].
    pub fn normalize(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "initializing" | "live" => ReadyState::Live,
            _ => ReadyState::Ended,
        }
    }

    /// State name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadyState::Live => "live",
            ReadyState::Ended => "ended",
        }
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Track description provided by the native engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    /// Native track id
    pub id: String,
    /// Track kind
    pub kind: TrackKind,
    /// Human-readable source description
    #[serde(default)]
    pub label: String,
    /// Whether the track comes from a remote peer
    #[serde(default)]
    pub remote: bool,
    /// Initial enabled flag
    pub enabled: bool,
    /// Constraints used to acquire the track
    #[serde(default)]
    pub constraints: Option<Constraints>,
    /// Native ready state, e.g. `INITIALIZING`, `LIVE`, `ENDED`, `FAILED`
    pub ready_state: String,
}

impl TrackDescriptor {
    /// Decode a descriptor as emitted by the native bridge
    pub fn from_json(json: &str) -> TrackResult<Self> {
        let descriptor: Self = serde_json::from_str(json)?;
        if descriptor.id.is_empty() {
            return Err(TrackError::InvalidDescriptor {
                message: "track id must not be empty".to_string(),
            });
        }
        Ok(descriptor)
    }
}

#[derive(Debug)]
struct TrackState {
    enabled: bool,
    muted: bool,
    ready_state: ReadyState,
    released: bool,
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    label: String,
    remote: bool,
    constraints: Constraints,
    state: RwLock<TrackState>,
    /// Held from reading state through dispatch, for local commands and
    /// notifications alike. No `state` guard is held while the engine runs.
    dispatch: ReentrantMutex<()>,
    listeners: Arc<EventListeners>,
    engine: Arc<dyn NativeEngine>,
    capture_defaults: CaptureDefaults,
}

/// Handle for a single audio or video track.
///
/// Cloning is cheap and yields another handle to the same track.
#[derive(Clone)]
pub struct MediaStreamTrack {
    inner: Arc<TrackInner>,
}

impl MediaStreamTrack {
    /// Wrap an existing native track. No native call is made.
    pub fn new(
        descriptor: TrackDescriptor,
        engine: Arc<dyn NativeEngine>,
        capture_defaults: CaptureDefaults,
    ) -> Self {
        let ready_state = ReadyState::normalize(&descriptor.ready_state);
        let icon = match (descriptor.remote, descriptor.kind) {
            (false, TrackKind::Video) => "📹",
            (true, TrackKind::Video) => "📺",
            (_, TrackKind::Audio) => "🎵",
        };
        info!(
            "{} Creating {} {} track: {} ({}, {})",
            icon,
            if descriptor.remote { "remote" } else { "local" },
            descriptor.kind,
            descriptor.id,
            descriptor.label,
            ready_state
        );

        Self {
            inner: Arc::new(TrackInner {
                id: descriptor.id,
                kind: descriptor.kind,
                label: descriptor.label,
                remote: descriptor.remote,
                constraints: descriptor.constraints.unwrap_or_default(),
                state: RwLock::new(TrackState {
                    enabled: descriptor.enabled,
                    muted: false,
                    ready_state,
                    released: false,
                }),
                dispatch: ReentrantMutex::new(()),
                listeners: Arc::new(EventListeners::new()),
                engine,
                capture_defaults,
            }),
        }
    }

    /// Get track ID
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Get track kind
    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    /// Get track label
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Check if the track originates from a remote peer
    pub fn is_remote(&self) -> bool {
        self.inner.remote
    }

    /// Whether the track contributes media
    pub fn enabled(&self) -> bool {
        self.inner.state.read().enabled
    }

    /// Check if track is muted
    pub fn muted(&self) -> bool {
        self.inner.state.read().muted
    }

    /// Get track lifecycle stage
    pub fn ready_state(&self) -> ReadyState {
        self.inner.state.read().ready_state
    }

    /// Check if [`MediaStreamTrack::release`] has been called
    pub fn is_released(&self) -> bool {
        self.inner.state.read().released
    }

    /// Enable or disable the track.
    ///
    /// A no-op when `enabled` matches the current value. Otherwise the native
    /// engine is told once and `muted` becomes `!enabled`.
    pub fn set_enabled(&self, enabled: bool) {
        let _serialized = self.inner.dispatch.lock();
        if self.inner.state.read().enabled == enabled {
            return;
        }

        self.inner.engine.set_track_enabled(&self.inner.id, enabled);
        {
            let mut state = self.inner.state.write();
            state.enabled = enabled;
            state.muted = !enabled;
        }

        if enabled {
            info!("🔊 Enabling track: {}", self.inner.id);
        } else {
            info!("🔇 Disabling track: {}", self.inner.id);
        }
    }

    /// Stop the track: disables it natively and marks it ended.
    ///
    /// Native resources are kept until [`MediaStreamTrack::release`].
    pub fn stop(&self) {
        let _serialized = self.inner.dispatch.lock();
        self.inner.engine.set_track_enabled(&self.inner.id, false);

        let previous = std::mem::replace(&mut self.inner.state.write().ready_state, ReadyState::Ended);
        if previous != ReadyState::Ended {
            debug!(
                "🔄 Track {} state changed: {} -> {}",
                self.inner.id,
                previous,
                ReadyState::Ended
            );
        }
        info!("⏹️ Stopped track: {}", self.inner.id);
    }

    /// Ask the native engine to free the track
    pub fn release(&self) {
        let _serialized = self.inner.dispatch.lock();
        if self.inner.state.read().released {
            warn!("Track {} released more than once", self.inner.id);
        }

        self.inner.engine.set_track_released(&self.inner.id);
        self.inner.state.write().released = true;
        info!("🗑️ Released track: {}", self.inner.id);
    }

    /// Switch between front and back camera without renegotiation
    pub fn switch_camera(&self) -> TrackResult<()> {
        if self.inner.remote {
            return Err(self.invalid("switchCamera", "Not implemented for remote tracks"));
        }
        self.require_video("switchCamera")?;

        self.warn_if_released("switchCamera");
        debug!("🔁 Switching camera for track {}", self.inner.id);
        self.inner.engine.switch_camera(&self.inner.id);
        Ok(())
    }

    /// Set the camera zoom; the engine decides which levels are valid
    pub fn set_zoom(&self, level: f64) -> TrackResult<()> {
        self.require_video("setZoom")?;

        self.warn_if_released("setZoom");
        debug!("🔍 Setting zoom {} for track {}", level, self.inner.id);
        self.inner.engine.set_zoom(&self.inner.id, level);
        Ok(())
    }

    /// Toggle the camera flash
    pub fn switch_flash(&self) -> TrackResult<()> {
        self.require_video("switchFlash")?;

        self.warn_if_released("switchFlash");
        debug!("🔦 Toggling flash for track {}", self.inner.id);
        self.inner.engine.toggle_flash(&self.inner.id);
        Ok(())
    }

    /// Capture a still image.
    ///
    /// `options` are merged over the configured [`CaptureDefaults`]. There is
    /// no way to cancel a capture once it has been issued.
    pub async fn capture_photo(&self, options: PhotoOptions) -> TrackResult<PhotoHandle> {
        self.warn_if_released("takePhoto");
        let native = options.merge(&self.inner.capture_defaults, self.inner.engine.as_ref());
        debug!("📸 Capturing photo on track {}: {:?}", self.inner.id, native);

        self.inner.engine.take_photo(&self.inner.id, native).await
    }

    /// Callback form of [`MediaStreamTrack::capture_photo`].
    ///
    /// Exactly one of `on_success`/`on_error` runs once the engine answers.
    /// Outside a tokio runtime `on_error` runs immediately and `None` is
    /// returned.
    pub fn capture_photo_with<S, E>(
        &self,
        options: PhotoOptions,
        on_success: S,
        on_error: E,
    ) -> Option<JoinHandle<()>>
    where
        S: FnOnce(PhotoHandle) + Send + 'static,
        E: FnOnce(TrackError) + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("No runtime to capture a photo on track {}: {}", self.inner.id, e);
                on_error(TrackError::native_failure(
                    "takePhoto",
                    format!("no tokio runtime: {}", e),
                ));
                return None;
            }
        };

        let track = self.clone();
        Some(runtime.spawn(async move {
            match track.capture_photo(options).await {
                Ok(photo) => on_success(photo),
                Err(e) => {
                    warn!("Photo capture failed on track {}: {}", track.id(), e);
                    on_error(e)
                }
            }
        }))
    }

    /// Not implemented
    pub fn apply_constraints(&self, _constraints: &Constraints) -> TrackResult<()> {
        Err(TrackError::not_implemented("applyConstraints"))
    }

    /// Not implemented; use `Clone` for another handle to the same track
    pub fn clone_track(&self) -> TrackResult<MediaStreamTrack> {
        Err(TrackError::not_implemented("clone"))
    }

    /// Not implemented
    pub fn get_capabilities(&self) -> TrackResult<Constraints> {
        Err(TrackError::not_implemented("getCapabilities"))
    }

    /// Not implemented
    pub fn get_settings(&self) -> TrackResult<Constraints> {
        Err(TrackError::not_implemented("getSettings"))
    }

    /// Independent copy of the constraints the track was created with
    pub fn get_constraints(&self) -> Constraints {
        self.inner.constraints.clone()
    }

    /// Register a listener for `kind`, invoked after registered ones
    pub fn add_event_listener<F>(&self, kind: TrackEventKind, listener: F) -> ListenerId
    where
        F: Fn(&TrackEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(kind, Arc::new(listener))
    }

    /// Remove a listener added with [`MediaStreamTrack::add_event_listener`]
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Bind or clear the single `on<event>` handler for `kind`
    pub fn set_handler(&self, kind: TrackEventKind, handler: Option<Listener>) {
        self.inner.listeners.set_handler(kind, handler);
    }

    /// Bind the `onended` handler
    pub fn on_ended<F>(&self, handler: F)
    where
        F: Fn(&TrackEvent) + Send + Sync + 'static,
    {
        self.set_handler(TrackEventKind::Ended, Some(Arc::new(handler)));
    }

    /// Bind the `onmute` handler
    pub fn on_mute<F>(&self, handler: F)
    where
        F: Fn(&TrackEvent) + Send + Sync + 'static,
    {
        self.set_handler(TrackEventKind::Mute, Some(Arc::new(handler)));
    }

    /// Bind the `onunmute` handler
    pub fn on_unmute<F>(&self, handler: F)
    where
        F: Fn(&TrackEvent) + Send + Sync + 'static,
    {
        self.set_handler(TrackEventKind::Unmute, Some(Arc::new(handler)));
    }

    /// Bind the `onoverconstrained` handler
    pub fn on_overconstrained<F>(&self, handler: F)
    where
        F: Fn(&TrackEvent) + Send + Sync + 'static,
    {
        self.set_handler(TrackEventKind::Overconstrained, Some(Arc::new(handler)));
    }

    /// Clear the `on<event>` handler for `kind`
    pub fn clear_handler(&self, kind: TrackEventKind) {
        self.set_handler(kind, None);
    }

    /// Check whether an `on<event>` handler is bound for `kind`
    pub fn has_handler(&self, kind: TrackEventKind) -> bool {
        self.inner.listeners.has_handler(kind)
    }

    /// Listeners registered for `kind`, the handler slot included
    pub fn listener_count(&self, kind: TrackEventKind) -> usize {
        self.inner.listeners.count(kind)
    }

    /// Stream of every event this track emits from now on
    pub fn events(&self) -> EventStream {
        EventStream::attach(&self.inner.listeners)
    }

    /// Apply a native notification and dispatch the resulting event.
    ///
    /// Returns `false` when the notification is for another track. Repeated
    /// `ended`, `mute` or `unmute` notifications that change nothing emit
    /// nothing.
    pub fn handle_notification(&self, notification: &Notification) -> bool {
        if notification.track_id != self.inner.id {
            return false;
        }

        let _serialized = self.inner.dispatch.lock();
        let event = {
            let mut state = self.inner.state.write();
            match &notification.kind {
                NotificationKind::Ended if state.ready_state == ReadyState::Ended => None,
                NotificationKind::Ended => {
                    state.ready_state = ReadyState::Ended;
                    Some(TrackEvent::Ended)
                }
                NotificationKind::Mute if state.muted => None,
                NotificationKind::Mute => {
                    state.muted = true;
                    Some(TrackEvent::Mute)
                }
                NotificationKind::Unmute if !state.muted => None,
                NotificationKind::Unmute => {
                    state.muted = false;
                    Some(TrackEvent::Unmute)
                }
                kind @ NotificationKind::Overconstrained { .. } => Some(TrackEvent::from(kind)),
            }
        };

        match event {
            Some(event) => {
                info!("🔔 Track {} {}", self.inner.id, event.event_type());
                self.inner.listeners.dispatch(&event);
            }
            None => debug!(
                "Ignoring {} notification for track {}: state unchanged",
                notification.kind.as_str(),
                self.inner.id
            ),
        }
        true
    }

    /// Pump notifications from `receiver` into this track on a tokio task.
    ///
    /// The task ends when the notification source closes or every handle to
    /// the track has been dropped.
    pub fn listen(&self, mut receiver: broadcast::Receiver<Notification>) -> JoinHandle<()> {
        let track: Weak<TrackInner> = Arc::downgrade(&self.inner);
        let id = self.inner.id.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(notification) => match track.upgrade() {
                        Some(inner) => {
                            MediaStreamTrack { inner }.handle_notification(&notification);
                        }
                        None => break,
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Track {} missed {} notifications", id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Notification listener for track {} stopped", id);
        })
    }

    fn require_video(&self, operation: &str) -> TrackResult<()> {
        if self.inner.kind != TrackKind::Video {
            return Err(self.invalid(operation, "Only implemented for video tracks"));
        }
        Ok(())
    }

    fn invalid(&self, operation: &str, reason: &str) -> TrackError {
        TrackError::invalid_operation(&self.inner.id, operation, reason)
    }

    fn warn_if_released(&self, operation: &str) {
        if self.inner.state.read().released {
            warn!("{} issued on released track {}", operation, self.inner.id);
        }
    }
}

impl std::fmt::Debug for MediaStreamTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("MediaStreamTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("remote", &self.inner.remote)
            .field("enabled", &state.enabled)
            .field("muted", &state.muted)
            .field("ready_state", &state.ready_state)
            .field("released", &state.released)
            .field("listeners", &self.inner.listeners)
            .finish()
    }
}
