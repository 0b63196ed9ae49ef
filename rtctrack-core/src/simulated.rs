//! In-process stand-in for the native media engine
//!
//! Drains an [`EngineCommandReceiver`] on its own task, keeps per-track
//! device state and can inject native notifications. Used by tests, demos and
//! platforms without a camera stack.

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{EngineCommand, EngineCommandReceiver};
use crate::notification::{Notification, NotificationHub, NotificationKind};
use crate::photo::{CaptureTarget, NativePhotoOptions, PhotoHandle};

/// JPEG start/end markers, enough for callers that sniff the payload
const JPEG_STUB: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9];

/// Which physical camera a simulated track is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    /// User-facing camera
    Front,
    /// Environment-facing camera
    Back,
}

/// Native-side state of one simulated track
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTrackState {
    /// Last enabled value received
    pub enabled: bool,
    /// Whether the track has been released
    pub released: bool,
    /// Last zoom level received
    pub zoom: f64,
    /// Torch state
    pub flash_on: bool,
    /// Active camera
    pub facing: CameraFacing,
    /// Successful still captures
    pub photos_taken: u32,
}

impl Default for SimulatedTrackState {
    fn default() -> Self {
        Self {
            enabled: true,
            released: false,
            zoom: 0.0,
            flash_on: false,
            facing: CameraFacing::Front,
            photos_taken: 0,
        }
    }
}

#[derive(Debug)]
struct Shared {
    tracks: DashMap<String, SimulatedTrackState>,
    commands_processed: AtomicU64,
    photo_dir: PathBuf,
    next_photo_failure: Mutex<Option<String>>,
}

/// Simulated native engine servicing a command channel
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    shared: Arc<Shared>,
    hub: NotificationHub,
    task: Arc<JoinHandle<()>>,
}

impl SimulatedEngine {
    /// Start servicing `receiver`, storing pictures under the system temp dir
    pub fn spawn(receiver: EngineCommandReceiver, hub: NotificationHub) -> Self {
        Self::spawn_with_photo_dir(receiver, hub, std::env::temp_dir())
    }

    /// Start servicing `receiver`, storing pictures under `photo_dir`
    pub fn spawn_with_photo_dir(
        mut receiver: EngineCommandReceiver,
        hub: NotificationHub,
        photo_dir: PathBuf,
    ) -> Self {
        let shared = Arc::new(Shared {
            tracks: DashMap::new(),
            commands_processed: AtomicU64::new(0),
            photo_dir,
            next_photo_failure: Mutex::new(None),
        });

        let worker = shared.clone();
        let task = tokio::spawn(async move {
            info!("🎬 Simulated native engine started");
            while let Some(command) = receiver.recv().await {
                worker.handle(command);
                worker.commands_processed.fetch_add(1, Ordering::SeqCst);
            }
            info!("🛑 Simulated native engine stopped");
        });

        Self {
            shared,
            hub,
            task: Arc::new(task),
        }
    }

    /// Snapshot of a track's native state, if the engine has seen it
    pub fn track_state(&self, track_id: &str) -> Option<SimulatedTrackState> {
        self.shared.tracks.get(track_id).map(|state| state.clone())
    }

    /// Number of commands handled so far
    pub fn commands_processed(&self) -> u64 {
        self.shared.commands_processed.load(Ordering::SeqCst)
    }

    /// Make the next photo request fail with `reason`
    pub fn fail_next_photo(&self, reason: impl Into<String>) {
        *self.shared.next_photo_failure.lock() = Some(reason.into());
    }

    /// Report that a track's source has ended
    pub fn end_track(&self, track_id: &str) -> usize {
        self.notify(track_id, NotificationKind::Ended)
    }

    /// Report that a track stopped delivering media
    pub fn mute_track(&self, track_id: &str) -> usize {
        self.notify(track_id, NotificationKind::Mute)
    }

    /// Report that a track resumed delivering media
    pub fn unmute_track(&self, track_id: &str) -> usize {
        self.notify(track_id, NotificationKind::Unmute)
    }

    /// Report that a constraint can no longer be satisfied
    pub fn overconstrain_track(&self, track_id: &str, constraint: &str) -> usize {
        self.notify(
            track_id,
            NotificationKind::Overconstrained {
                constraint: Some(constraint.to_string()),
                message: Some(format!("{} cannot be satisfied", constraint)),
            },
        )
    }

    fn notify(&self, track_id: &str, kind: NotificationKind) -> usize {
        debug!("🔔 Simulated {} notification for track {}", kind.as_str(), track_id);
        self.hub.publish(Notification::new(track_id, kind))
    }

    /// Stop servicing commands
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Shared {
    fn handle(&self, command: EngineCommand) {
        debug!(
            "⚙️ Simulated engine handling {} for track {}",
            command.command_name(),
            command.track_id()
        );

        match command {
            EngineCommand::SetEnabled { track_id, enabled } => {
                self.tracks.entry(track_id).or_default().enabled = enabled;
            }
            EngineCommand::Release { track_id } => {
                self.tracks.entry(track_id).or_default().released = true;
            }
            EngineCommand::SwitchCamera { track_id } => {
                let mut state = self.tracks.entry(track_id).or_default();
                state.facing = match state.facing {
                    CameraFacing::Front => CameraFacing::Back,
                    CameraFacing::Back => CameraFacing::Front,
                };
            }
            EngineCommand::SetZoom { track_id, level } => {
                self.tracks.entry(track_id).or_default().zoom = level;
            }
            EngineCommand::ToggleFlash { track_id } => {
                let mut state = self.tracks.entry(track_id).or_default();
                state.flash_on = !state.flash_on;
            }
            EngineCommand::TakePhoto {
                track_id,
                options,
                reply,
            } => {
                let result = self.take_photo(&track_id, &options);
                if reply.send(result).is_err() {
                    warn!("Photo requester for track {} went away", track_id);
                }
            }
        }
    }

    fn take_photo(&self, track_id: &str, options: &NativePhotoOptions) -> Result<PhotoHandle, String> {
        if let Some(reason) = self.next_photo_failure.lock().take() {
            return Err(reason);
        }

        let mut state = self.tracks.entry(track_id.to_string()).or_default();
        if state.released {
            return Err("track released".to_string());
        }

        let photo = match CaptureTarget::from_native_value(options.capture_target) {
            Some(CaptureTarget::Memory) => PhotoHandle::Memory(Bytes::from_static(JPEG_STUB)),
            Some(_) => {
                let file_name = format!("{}.jpeg", Uuid::new_v4());
                PhotoHandle::File(self.photo_dir.join(file_name))
            }
            None => {
                return Err(format!(
                    "unknown capture target {}",
                    options.capture_target
                ))
            }
        };

        state.photos_taken += 1;
        Ok(photo)
    }
}
