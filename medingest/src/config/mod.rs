//! Pipeline configuration and the INI config file.

mod file;
mod pipeline;

pub use file::{config_file_path, ConfigError, ConfigFile, ConfigKey};
pub use pipeline::{
    PipelineConfig, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LABELMAP_MARKER,
    DEFAULT_MEASUREMENT_SUFFIX, DEFAULT_STATE_BUNDLE_EXTENSION,
};
