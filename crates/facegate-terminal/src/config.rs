//! Terminal configuration.
//!
//! Read from a TOML file. Every field has a default, so a partial file (or
//! none at all) is a valid configuration:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud = 115200
//!
//! [matching]
//! strategy = "structural"
//! threshold = 0.55
//!
//! [remote_log]
//! address = "10.0.0.5:9000"
//! ```

use crate::error::{Result, TerminalError};
use facegate_biometric::{MatchEngine, Strategy};
use facegate_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_HISTOGRAM_BINS, DEFAULT_READ_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "facegate.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub serial: SerialConfig,
    pub matching: MatchingConfig,
    pub resolver: ResolverConfig,
    pub storage: StorageConfig,
    pub capture: CaptureConfig,
    pub remote_log: RemoteLogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud: u32,
    pub read_timeout_ms: u64,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

fn default_port() -> String {
    if cfg!(windows) {
        "COM4".to_string()
    } else {
        "/dev/ttyUSB0".to_string()
    }
}

/// Scoring strategy names as they appear in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Histogram,
    Structural,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub strategy: StrategyKind,

    /// Acceptance threshold; the strategy's default when absent.
    pub threshold: Option<f64>,

    /// Bins per colour channel for the histogram strategy.
    pub histogram_bins: u16,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            threshold: None,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

impl MatchingConfig {
    pub fn strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::Histogram => Strategy::Histogram {
                bins: self.histogram_bins,
            },
            StrategyKind::Structural => Strategy::Structural,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.strategy().default_threshold())
    }

    pub fn engine(&self) -> MatchEngine {
        MatchEngine::new(self.strategy()).with_threshold(self.threshold())
    }
}

/// Which identity resolver decides attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    /// Built-in image matching.
    #[default]
    Engine,

    /// External classifier program.
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub kind: ResolverKind,
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kind: ResolverKind::default(),
            program: "face_recognition".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enrollment_dir: PathBuf,
    pub audit_log: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enrollment_dir: PathBuf::from("./db"),
            audit_log: PathBuf::from("./log.txt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Still image kept fresh by the camera grabber.
    pub probe_file: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            probe_file: PathBuf::from("./capture.jpg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLogConfig {
    /// `host:port` of the dashboard; remote logging is off when absent.
    pub address: Option<String>,
    pub source: String,
    pub queue_capacity: usize,
}

impl Default for RemoteLogConfig {
    fn default() -> Self {
        Self {
            address: None,
            source: "FaceID".to_string(),
            queue_capacity: 64,
        }
    }
}

impl TerminalConfig {
    /// Load the configuration at `path`, or the defaults if it does not exist.
    ///
    /// # Errors
    /// Returns `TerminalError::ConfigParse` for malformed TOML and
    /// `TerminalError::Config` for values rejected by [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents).map_err(|e| TerminalError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the terminal cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud == 0 {
            return Err(TerminalError::config("serial.baud must be non-zero"));
        }

        if let Some(threshold) = self.matching.threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(TerminalError::config(format!(
                    "matching.threshold must be between -1.0 and 1.0, got {threshold}"
                )));
            }
        }

        if !(1..=256).contains(&self.matching.histogram_bins) {
            return Err(TerminalError::config(format!(
                "matching.histogram_bins must be between 1 and 256, got {}",
                self.matching.histogram_bins
            )));
        }

        if self.resolver.kind == ResolverKind::Command && self.resolver.program.trim().is_empty() {
            return Err(TerminalError::config(
                "resolver.program is required when resolver.kind = \"command\"",
            ));
        }

        if self.remote_log.queue_capacity == 0 {
            return Err(TerminalError::config("remote_log.queue_capacity must be non-zero"));
        }

        Ok(())
    }
}
