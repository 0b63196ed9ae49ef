//! Configuration types and defaults

use rtctrack_core::{CaptureTarget, TrackError, TrackResult, DEFAULT_NOTIFICATION_CAPACITY};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Defaults applied to still captures when the caller leaves an option unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureDefaults {
    /// Where captured images go
    pub capture_target: CaptureTarget,
    /// Longest edge in pixels
    pub max_size: u32,
    /// JPEG quality in `0.0..=1.0`
    pub max_jpeg_quality: f64,
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            capture_target: CaptureTarget::Temp,
            max_size: 2000,
            max_jpeg_quality: 1.0,
        }
    }
}

impl CaptureDefaults {
    /// Validate configuration
    pub fn validate(&self) -> TrackResult<()> {
        if self.max_size == 0 {
            return Err(TrackError::InvalidConfiguration {
                message: "maxSize must be > 0".to_string(),
            });
        }

        if !(self.max_jpeg_quality > 0.0 && self.max_jpeg_quality <= 1.0) {
            return Err(TrackError::InvalidConfiguration {
                message: format!(
                    "maxJpegQuality must be in (0, 1], got {}",
                    self.max_jpeg_quality
                ),
            });
        }

        Ok(())
    }
}

/// Configuration owned by the component that creates track handles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Explicit `tracing` filter directive, overrides `debug_logging`
    pub log_filter: Option<String>,
    /// Still-capture defaults
    pub capture_defaults: CaptureDefaults,
    /// Buffered notifications per subscriber
    pub notification_capacity: usize,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_filter: None,
            capture_defaults: CaptureDefaults::default(),
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

impl TrackConfig {
    /// Load configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> TrackResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> TrackResult<()> {
        self.capture_defaults.validate()?;

        if self.notification_capacity == 0 {
            return Err(TrackError::InvalidConfiguration {
                message: "notificationCapacity must be > 0".to_string(),
            });
        }

        Ok(())
    }

    /// Filter directive used by [`TrackConfig::init_logging`] when `RUST_LOG` is unset
    pub fn log_directive(&self) -> String {
        match &self.log_filter {
            Some(filter) => filter.clone(),
            None if self.debug_logging => "debug".to_string(),
            None => "info".to_string(),
        }
    }

    /// Install a fmt subscriber; a no-op if one is already installed
    pub fn init_logging(&self) -> TrackResult<()> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.log_directive()).map_err(|e| {
                TrackError::InvalidConfiguration {
                    message: format!("invalid log filter: {}", e),
                }
            })?,
        };

        // A subscriber installed by the host application wins.
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        Ok(())
    }
}
