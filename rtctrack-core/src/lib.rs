//! # RTC Track Core
//!
//! The boundary between track handles and the native media engine that
//! actually captures, encodes and transports media. This crate defines the
//! command vocabulary a handle can issue, the notifications the engine pushes
//! back, the still-capture payloads, and a channel-backed engine that carries
//! commands to a separate native execution context.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod notification;
pub mod photo;
pub mod simulated;

// Re-export main types
pub use engine::{
    engine_channel, ChannelEngine, EngineCommand, EngineCommandReceiver, NativeEngine, PhotoReply,
};
pub use error::{TrackError, TrackResult};
pub use notification::{
    Notification, NotificationHub, NotificationKind, DEFAULT_NOTIFICATION_CAPACITY,
};
pub use photo::{CaptureTarget, NativePhotoOptions, PhotoHandle};
pub use simulated::{CameraFacing, SimulatedEngine, SimulatedTrackState};
