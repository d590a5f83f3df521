//! INI configuration file.
//!
//! ```ini
//! [pipeline]
//! state_bundle_extension = glance
//! measurement_suffix = .measurements.json
//! labelmap_marker = vtkLabelMap
//! event_capacity = 256
//!
//! [fetch]
//! timeout_secs = 300
//! auth_header = bearer
//! auth_token =
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::pipeline::{
    PipelineConfig, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LABELMAP_MARKER,
    DEFAULT_MEASUREMENT_SUFFIX, DEFAULT_STATE_BUNDLE_EXTENSION,
};
use crate::fetch::AuthHeader;

const PIPELINE_SECTION: &str = "pipeline";
const FETCH_SECTION: &str = "fetch";

/// Errors from loading, saving or editing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Default location of the config file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medingest")
        .join("config.ini")
}

/// Contents of the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub state_bundle_extension: String,
    pub measurement_suffix: String,
    pub labelmap_marker: String,
    pub event_capacity: usize,
    pub fetch_timeout_secs: u64,
    pub auth_header: AuthHeader,
    pub auth_token: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            state_bundle_extension: DEFAULT_STATE_BUNDLE_EXTENSION.to_string(),
            measurement_suffix: DEFAULT_MEASUREMENT_SUFFIX.to_string(),
            labelmap_marker: DEFAULT_LABELMAP_MARKER.to_string(),
            event_capacity: 256,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            auth_header: AuthHeader::Bearer,
            auth_token: None,
        }
    }
}

impl ConfigFile {
    /// Load from the default path. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path. A missing file yields defaults.
    ///
    /// Keys absent from the file keep their default values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini.write_to_file(path).map_err(write_error)
    }

    /// Build the pipeline configuration.
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_state_bundle_extension(self.state_bundle_extension.clone())
            .with_measurement_suffix(self.measurement_suffix.clone())
            .with_labelmap_marker(self.labelmap_marker.clone())
            .with_event_capacity(self.event_capacity)
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .with_auth_header(self.auth_header.clone())
    }
}

/// A settable key, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    PipelineStateBundleExtension,
    PipelineMeasurementSuffix,
    PipelineLabelmapMarker,
    PipelineEventCapacity,
    FetchTimeoutSecs,
    FetchAuthHeader,
    FetchAuthToken,
}

impl ConfigKey {
    /// Every key, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::PipelineStateBundleExtension,
            ConfigKey::PipelineMeasurementSuffix,
            ConfigKey::PipelineLabelmapMarker,
            ConfigKey::PipelineEventCapacity,
            ConfigKey::FetchTimeoutSecs,
            ConfigKey::FetchAuthHeader,
            ConfigKey::FetchAuthToken,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::PipelineStateBundleExtension
            | ConfigKey::PipelineMeasurementSuffix
            | ConfigKey::PipelineLabelmapMarker
            | ConfigKey::PipelineEventCapacity => PIPELINE_SECTION,
            ConfigKey::FetchTimeoutSecs | ConfigKey::FetchAuthHeader | ConfigKey::FetchAuthToken => {
                FETCH_SECTION
            }
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::PipelineStateBundleExtension => "state_bundle_extension",
            ConfigKey::PipelineMeasurementSuffix => "measurement_suffix",
            ConfigKey::PipelineLabelmapMarker => "labelmap_marker",
            ConfigKey::PipelineEventCapacity => "event_capacity",
            ConfigKey::FetchTimeoutSecs => "timeout_secs",
            ConfigKey::FetchAuthHeader => "auth_header",
            ConfigKey::FetchAuthToken => "auth_token",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text. Unset values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::PipelineStateBundleExtension => config.state_bundle_extension.clone(),
            ConfigKey::PipelineMeasurementSuffix => config.measurement_suffix.clone(),
            ConfigKey::PipelineLabelmapMarker => config.labelmap_marker.clone(),
            ConfigKey::PipelineEventCapacity => config.event_capacity.to_string(),
            ConfigKey::FetchTimeoutSecs => config.fetch_timeout_secs.to_string(),
            ConfigKey::FetchAuthHeader => config.auth_header.to_string(),
            ConfigKey::FetchAuthToken => config.auth_token.clone().unwrap_or_default(),
        }
    }

    /// Parse and store a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason,
        };
        let value = value.trim();

        match self {
            ConfigKey::PipelineStateBundleExtension => {
                let ext = value.trim_start_matches('.').to_lowercase();
                if ext.is_empty() {
                    return Err(invalid("extension must not be empty".to_string()));
                }
                config.state_bundle_extension = ext;
            }
            ConfigKey::PipelineMeasurementSuffix => {
                if value.is_empty() {
                    return Err(invalid("suffix must not be empty".to_string()));
                }
                config.measurement_suffix = value.to_string();
            }
            ConfigKey::PipelineLabelmapMarker => {
                config.labelmap_marker = value.to_string();
            }
            ConfigKey::PipelineEventCapacity => {
                let capacity: usize = value.parse().map_err(|e| invalid(format!("{}", e)))?;
                if capacity == 0 {
                    return Err(invalid("capacity must be at least 1".to_string()));
                }
                config.event_capacity = capacity;
            }
            ConfigKey::FetchTimeoutSecs => {
                config.fetch_timeout_secs = value.parse().map_err(|e| invalid(format!("{}", e)))?;
            }
            ConfigKey::FetchAuthHeader => {
                config.auth_header = value.parse().map_err(invalid)?;
            }
            ConfigKey::FetchAuthToken => {
                config.auth_token = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
