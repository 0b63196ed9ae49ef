//! Still-capture payloads exchanged with the native engine

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TrackError;

/// Destination of a captured still image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureTarget {
    /// Hand the encoded image back in memory
    #[serde(rename = "memory")]
    Memory,
    /// Temporary storage
    #[serde(rename = "temp")]
    Temp,
    /// Public pictures directory
    #[serde(rename = "disk")]
    Disk,
    /// Device photo library
    #[serde(rename = "cameraRoll")]
    CameraRoll,
}

impl CaptureTarget {
    /// All capture targets
    pub const ALL: [CaptureTarget; 4] = [
        CaptureTarget::Memory,
        CaptureTarget::Temp,
        CaptureTarget::Disk,
        CaptureTarget::CameraRoll,
    ];

    /// Symbolic name of the target
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureTarget::Memory => "memory",
            CaptureTarget::Temp => "temp",
            CaptureTarget::Disk => "disk",
            CaptureTarget::CameraRoll => "cameraRoll",
        }
    }

    /// Discrete value used by the Android camera module
    pub fn default_native_value(&self) -> i32 {
        match self {
            CaptureTarget::Memory => 0,
            CaptureTarget::Disk => 1,
            CaptureTarget::CameraRoll => 2,
            CaptureTarget::Temp => 3,
        }
    }

    /// Reverse of [`CaptureTarget::default_native_value`]
    pub fn from_native_value(value: i32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|target| target.default_native_value() == value)
    }
}

impl std::fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CaptureTarget {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|target| target.as_str() == s)
            .ok_or_else(|| TrackError::InvalidConfiguration {
                message: format!("unknown capture target '{}'", s),
            })
    }
}

/// Fully merged photo options in the shape the native engine consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativePhotoOptions {
    /// Longest edge in pixels; larger captures are scaled down
    pub max_size: u32,
    /// JPEG quality in `0.0..=1.0`
    pub max_jpeg_quality: f64,
    /// Engine-specific capture target value
    pub capture_target: i32,
}

/// Result of a successful still capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoHandle {
    /// Encoded JPEG returned in memory
    Memory(Bytes),
    /// Location the native side wrote the JPEG to
    File(PathBuf),
}

impl PhotoHandle {
    /// In-memory JPEG bytes, if any
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PhotoHandle::Memory(data) => Some(data),
            PhotoHandle::File(_) => None,
        }
    }

    /// Stored file path, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            PhotoHandle::Memory(_) => None,
            PhotoHandle::File(path) => Some(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_target_names() {
        for target in CaptureTarget::ALL {
            assert_eq!(target.as_str().parse::<CaptureTarget>().unwrap(), target);
        }
        assert!("CameraRoll".parse::<CaptureTarget>().is_err());
        assert!("roll".parse::<CaptureTarget>().is_err());
    }

    #[test]
    fn test_capture_target_native_values() {
        assert_eq!(CaptureTarget::Memory.default_native_value(), 0);
        assert_eq!(CaptureTarget::Disk.default_native_value(), 1);
        assert_eq!(CaptureTarget::CameraRoll.default_native_value(), 2);
        assert_eq!(CaptureTarget::Temp.default_native_value(), 3);
        assert_eq!(CaptureTarget::from_native_value(2), Some(CaptureTarget::CameraRoll));
        assert_eq!(CaptureTarget::from_native_value(7), None);
    }

    #[test]
    fn test_capture_target_serde() {
        let target: CaptureTarget = serde_json::from_str("\"cameraRoll\"").unwrap();
        assert_eq!(target, CaptureTarget::CameraRoll);
        assert_eq!(serde_json::to_string(&CaptureTarget::Temp).unwrap(), "\"temp\"");
    }

    #[test]
    fn test_native_options_wire_shape() {
        let options = NativePhotoOptions {
            max_size: 500,
            max_jpeg_quality: 0.8,
            capture_target: 1,
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["maxSize"], 500);
        assert_eq!(json["maxJpegQuality"], 0.8);
        assert_eq!(json["captureTarget"], 1);
    }
}
