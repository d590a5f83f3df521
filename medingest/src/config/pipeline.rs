//! Configuration for the ingestion pipeline.

use std::time::Duration;

use crate::fetch::AuthHeader;

/// Default extension of project-state bundles.
pub const DEFAULT_STATE_BUNDLE_EXTENSION: &str = "glance";

/// Default name suffix that marks measurement annotation files.
pub const DEFAULT_MEASUREMENT_SUFFIX: &str = ".measurements.json";

/// Default scene metadata type that marks labelmap datasets.
pub const DEFAULT_LABELMAP_MARKER: &str = "vtkLabelMap";

/// Default timeout for remote downloads in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Extension of project-state bundles (lower case, no dot).
    pub state_bundle_extension: String,

    /// File name suffix of measurement annotation files.
    pub measurement_suffix: String,

    /// Value of `meta.dataType` in scene keys that marks a labelmap.
    pub labelmap_marker: String,

    /// HTTP request timeout for remote entries.
    pub fetch_timeout: Duration,

    /// How the auth token is injected into remote requests.
    pub auth_header: AuthHeader,

    /// Capacity of the queue event channel.
    ///
    /// Slow subscribers lag and miss events beyond this.
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            state_bundle_extension: DEFAULT_STATE_BUNDLE_EXTENSION.to_string(),
            measurement_suffix: DEFAULT_MEASUREMENT_SUFFIX.to_string(),
            labelmap_marker: DEFAULT_LABELMAP_MARKER.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            auth_header: AuthHeader::default(),
            event_capacity: 256,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state-bundle extension.
    pub fn with_state_bundle_extension(mut self, ext: impl Into<String>) -> Self {
        self.state_bundle_extension = ext.into().trim_start_matches('.').to_lowercase();
        self
    }

    /// Set the measurement file suffix.
    pub fn with_measurement_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.measurement_suffix = suffix.into();
        self
    }

    /// Set the labelmap marker.
    pub fn with_labelmap_marker(mut self, marker: impl Into<String>) -> Self {
        self.labelmap_marker = marker.into();
        self
    }

    /// Set the HTTP timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the auth header scheme.
    pub fn with_auth_header(mut self, auth_header: AuthHeader) -> Self {
        self.auth_header = auth_header;
        self
    }

    /// Set the event channel capacity (minimum 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.state_bundle_extension, "glance");
        assert_eq!(config.measurement_suffix, ".measurements.json");
        assert_eq!(config.labelmap_marker, "vtkLabelMap");
        assert_eq!(config.fetch_timeout, Duration::from_secs(300));
        assert_eq!(config.auth_header, AuthHeader::Bearer);
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_state_bundle_extension(".Session")
            .with_measurement_suffix(".annotations.json")
            .with_fetch_timeout(Duration::from_secs(60))
            .with_auth_header(AuthHeader::Custom("Girder-Token".to_string()))
            .with_event_capacity(0);

        assert_eq!(config.state_bundle_extension, "session");
        assert_eq!(config.measurement_suffix, ".annotations.json");
        assert_eq!(config.fetch_timeout, Duration::from_secs(60));
        assert_eq!(config.event_capacity, 1);
    }
}
