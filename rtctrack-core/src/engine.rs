//! Command boundary between track handles and the native media engine
//!
//! Track handles never touch media themselves. Every request is expressed as an
//! [`EngineCommand`] and handed to a [`NativeEngine`]. All commands except
//! `TakePhoto` are fire-and-forget: the engine exposes no failure channel for
//! them and the caller applies its local state change as soon as the command is
//! issued.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{TrackError, TrackResult};
use crate::photo::{CaptureTarget, NativePhotoOptions, PhotoHandle};

/// Reply channel for a photo request
pub type PhotoReply = oneshot::Sender<Result<PhotoHandle, String>>;

/// Requests a track handle can issue to the native engine
#[derive(Debug)]
pub enum EngineCommand {
    /// Enable or disable media flow for a track
    SetEnabled {
        /// Native track id
        track_id: String,
        /// New enabled value
        enabled: bool,
    },
    /// Free the native track
    Release {
        /// Native track id
        track_id: String,
    },
    /// Swap between front and back camera
    SwitchCamera {
        /// Native track id
        track_id: String,
    },
    /// Set the capture zoom level
    SetZoom {
        /// Native track id
        track_id: String,
        /// Zoom level, validated natively
        level: f64,
    },
    /// Toggle the camera flash/torch
    ToggleFlash {
        /// Native track id
        track_id: String,
    },
    /// Capture a still image
    TakePhoto {
        /// Native track id
        track_id: String,
        /// Merged options
        options: NativePhotoOptions,
        /// Where the native side answers
        reply: PhotoReply,
    },
}

impl EngineCommand {
    /// Name of the command as used in logs and errors
    pub fn command_name(&self) -> &'static str {
        match self {
            EngineCommand::SetEnabled { .. } => "setTrackEnabled",
            EngineCommand::Release { .. } => "setTrackReleased",
            EngineCommand::SwitchCamera { .. } => "switchCamera",
            EngineCommand::SetZoom { .. } => "setZoom",
            EngineCommand::ToggleFlash { .. } => "toggleFlash",
            EngineCommand::TakePhoto { .. } => "takePhoto",
        }
    }

    /// Track the command targets
    pub fn track_id(&self) -> &str {
        match self {
            EngineCommand::SetEnabled { track_id, .. }
            | EngineCommand::Release { track_id }
            | EngineCommand::SwitchCamera { track_id }
            | EngineCommand::SetZoom { track_id, .. }
            | EngineCommand::ToggleFlash { track_id }
            | EngineCommand::TakePhoto { track_id, .. } => track_id,
        }
    }
}

/// The native media engine as seen by a track handle
#[async_trait]
pub trait NativeEngine: Send + Sync {
    /// Enable or disable a track
    fn set_track_enabled(&self, track_id: &str, enabled: bool);

    /// Release the native track
    fn set_track_released(&self, track_id: &str);

    /// Switch between cameras
    fn switch_camera(&self, track_id: &str);

    /// Set the zoom level
    fn set_zoom(&self, track_id: &str, level: f64);

    /// Toggle the flash
    fn toggle_flash(&self, track_id: &str);

    /// Capture a still image, resolving once the native side answers
    async fn take_photo(
        &self,
        track_id: &str,
        options: NativePhotoOptions,
    ) -> TrackResult<PhotoHandle>;

    /// Map a symbolic capture target to the engine's discrete value
    fn capture_target_value(&self, target: CaptureTarget) -> i32 {
        target.default_native_value()
    }
}

/// Receiving half of the command channel, owned by the native context
pub type EngineCommandReceiver = mpsc::UnboundedReceiver<EngineCommand>;

/// Create a [`ChannelEngine`] and the receiver the native context drains
pub fn engine_channel() -> (ChannelEngine, EngineCommandReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelEngine { sender }, receiver)
}

/// [`NativeEngine`] that forwards every command over a channel to a separate
/// native execution context
#[derive(Debug, Clone)]
pub struct ChannelEngine {
    sender: mpsc::UnboundedSender<EngineCommand>,
}

impl ChannelEngine {
    fn send(&self, command: EngineCommand) {
        let name = command.command_name();
        debug!("➡️ Sending {} for track {}", name, command.track_id());
        if let Err(mpsc::error::SendError(command)) = self.sender.send(command) {
            warn!(
                "Native engine is gone, dropping {} for track {}",
                name,
                command.track_id()
            );
        }
    }

    /// Check whether the native side stopped receiving commands
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl NativeEngine for ChannelEngine {
    fn set_track_enabled(&self, track_id: &str, enabled: bool) {
        self.send(EngineCommand::SetEnabled {
            track_id: track_id.to_string(),
            enabled,
        });
    }

    fn set_track_released(&self, track_id: &str) {
        self.send(EngineCommand::Release {
            track_id: track_id.to_string(),
        });
    }

    fn switch_camera(&self, track_id: &str) {
        self.send(EngineCommand::SwitchCamera {
            track_id: track_id.to_string(),
        });
    }

    fn set_zoom(&self, track_id: &str, level: f64) {
        self.send(EngineCommand::SetZoom {
            track_id: track_id.to_string(),
            level,
        });
    }

    fn toggle_flash(&self, track_id: &str) {
        self.send(EngineCommand::ToggleFlash {
            track_id: track_id.to_string(),
        });
    }

    async fn take_photo(
        &self,
        track_id: &str,
        options: NativePhotoOptions,
    ) -> TrackResult<PhotoHandle> {
        let (reply, response) = oneshot::channel();
        let command = EngineCommand::TakePhoto {
            track_id: track_id.to_string(),
            options,
            reply,
        };
        let name = command.command_name();

        debug!("📸 Sending {} for track {}", name, track_id);
        self.sender
            .send(command)
            .map_err(|_| TrackError::native_failure(name, "native engine is not running"))?;

        match response.await {
            Ok(Ok(photo)) => Ok(photo),
            Ok(Err(reason)) => Err(TrackError::native_failure(name, reason)),
            Err(_) => Err(TrackError::native_failure(
                name,
                "native engine dropped the request",
            )),
        }
    }
}
