//! Still-capture options

use rtctrack_core::{CaptureTarget, NativeEngine, NativePhotoOptions};
use serde::{Deserialize, Serialize};

use crate::config::CaptureDefaults;

/// Caller-supplied photo options; unset fields fall back to [`CaptureDefaults`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhotoOptions {
    /// Longest edge in pixels
    pub max_size: Option<u32>,
    /// JPEG quality in `0.0..=1.0`
    pub max_jpeg_quality: Option<f64>,
    /// Where the image goes
    pub capture_target: Option<CaptureTarget>,
}

impl PhotoOptions {
    /// Options that use every default
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the longest edge
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Set the JPEG quality
    pub fn max_jpeg_quality(mut self, quality: f64) -> Self {
        self.max_jpeg_quality = Some(quality);
        self
    }

    /// Set the capture target
    pub fn capture_target(mut self, target: CaptureTarget) -> Self {
        self.capture_target = Some(target);
        self
    }

    /// Overlay these options on `defaults` and resolve the capture target to
    /// the value `engine` expects
    pub fn merge(&self, defaults: &CaptureDefaults, engine: &dyn NativeEngine) -> NativePhotoOptions {
        let target = self.capture_target.unwrap_or(defaults.capture_target);

        NativePhotoOptions {
            max_size: self.max_size.unwrap_or(defaults.max_size),
            max_jpeg_quality: self.max_jpeg_quality.unwrap_or(defaults.max_jpeg_quality),
            capture_target: engine.capture_target_value(target),
        }
    }
}
