//! # RTC Track
//!
//! Event-driven handles for audio and video tracks whose media lives in a
//! native engine. A [`MediaStreamTrack`] mirrors the engine's view of one
//! track: it forwards commands (enable, stop, release, camera controls, still
//! capture) and turns the engine's notifications into `ended`, `mute`,
//! `unmute` and `overconstrained` events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rtctrack::{
//!     engine_channel, SimulatedEngine, TrackConfig, TrackDescriptor, TrackEventKind,
//!     TrackFactory, TrackKind,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (engine, commands) = engine_channel();
//!     let factory = TrackFactory::new(Arc::new(engine), TrackConfig::default())?;
//!     let _native = SimulatedEngine::spawn(commands, factory.notifications().clone());
//!
//!     let (track, _pump) = factory.create_listening(TrackDescriptor {
//!         id: "camera-0".to_string(),
//!         kind: TrackKind::Video,
//!         label: "Front camera".to_string(),
//!         remote: false,
//!         enabled: true,
//!         constraints: None,
//!         ready_state: "live".to_string(),
//!     });
//!
//!     track.add_event_listener(TrackEventKind::Ended, |event| {
//!         println!("track event: {}", event.event_type());
//!     });
//!
//!     track.set_enabled(false);
//!     track.switch_camera()?;
//!     track.stop();
//!     track.release();
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use rtctrack_core::{
    engine_channel, CameraFacing, CaptureTarget, ChannelEngine, EngineCommand,
    EngineCommandReceiver, NativeEngine, NativePhotoOptions, Notification, NotificationHub,
    NotificationKind, PhotoHandle, SimulatedEngine, SimulatedTrackState, TrackError, TrackResult,
};

// Public API modules
pub mod config;
pub mod event;
pub mod photo;
pub mod track;

// Re-export main API types
pub use config::{CaptureDefaults, TrackConfig};
pub use event::{EventStream, Listener, ListenerId, TrackEvent, TrackEventKind};
pub use photo::PhotoOptions;
pub use track::{Constraints, MediaStreamTrack, ReadyState, TrackDescriptor, TrackKind};

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Creates track handles that share one native engine and configuration
#[derive(Clone)]
pub struct TrackFactory {
    inner: Arc<TrackFactoryInner>,
}

struct TrackFactoryInner {
    engine: Arc<dyn NativeEngine>,
    config: TrackConfig,
    notifications: NotificationHub,
}

impl TrackFactory {
    /// Create a factory; fails if `config` is invalid
    pub fn new(engine: Arc<dyn NativeEngine>, config: TrackConfig) -> TrackResult<Self> {
        config.validate()?;
        let notifications = NotificationHub::with_capacity(config.notification_capacity);
        debug!(
            "Track factory ready (capture defaults: {:?})",
            config.capture_defaults
        );

        Ok(Self {
            inner: Arc::new(TrackFactoryInner {
                engine,
                config,
                notifications,
            }),
        })
    }

    /// Wrap an existing native track; no native call is made
    pub fn create(&self, descriptor: TrackDescriptor) -> MediaStreamTrack {
        MediaStreamTrack::new(
            descriptor,
            self.inner.engine.clone(),
            self.inner.config.capture_defaults.clone(),
        )
    }

    /// Wrap a native track described as JSON
    pub fn create_from_json(&self, json: &str) -> TrackResult<MediaStreamTrack> {
        Ok(self.create(TrackDescriptor::from_json(json)?))
    }

    /// Wrap a native track and start pumping this factory's notifications into it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_listening(&self, descriptor: TrackDescriptor) -> (MediaStreamTrack, JoinHandle<()>) {
        let track = self.create(descriptor);
        let pump = track.listen(self.inner.notifications.subscribe());
        (track, pump)
    }

    /// Hub the native side publishes notifications into
    pub fn notifications(&self) -> &NotificationHub {
        &self.inner.notifications
    }

    /// Get the configuration
    pub fn config(&self) -> &TrackConfig {
        &self.inner.config
    }

    /// Get the native engine
    pub fn engine(&self) -> &Arc<dyn NativeEngine> {
        &self.inner.engine
    }
}

impl std::fmt::Debug for TrackFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackFactory")
            .field("config", &self.inner.config)
            .field("notifications", &self.inner.notifications)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_rejects_invalid_config() {
        let (engine, _commands) = engine_channel();
        let config = TrackConfig {
            notification_capacity: 0,
            ..TrackConfig::default()
        };

        let err = TrackFactory::new(Arc::new(engine), config).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_create_from_json() {
        let (engine, mut commands) = engine_channel();
        let factory = TrackFactory::new(Arc::new(engine), TrackConfig::default()).unwrap();

        let track = factory
            .create_from_json(
                r#"{"id":"mic-1","kind":"audio","label":"Mic","remote":false,"enabled":false,"readyState":"INITIALIZING"}"#,
            )
            .unwrap();

        assert_eq!(track.kind(), TrackKind::Audio);
        assert!(!track.enabled());
        assert!(!track.muted());
        assert_eq!(track.ready_state(), ReadyState::Live);
        assert!(commands.try_recv().is_err());

        let err = factory.create_from_json(r#"{"id":"x"}"#).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
