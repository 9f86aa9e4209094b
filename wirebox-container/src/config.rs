//! Container configuration.
//!
//! Plain data, deserializable with `serde`, applied through
//! [`ContainerBuilder::config`](crate::container::ContainerBuilder::config).
//!
//! ```
//! use wirebox_container::config::ContainerConfig;
//!
//! let config = ContainerConfig::default();
//! assert_eq!(config.max_depth, Some(256));
//! assert!(!config.injector_detection.enabled);
//! ```

use serde::{Deserialize, Serialize};

use crate::detection::{Blacklist, DEFAULT_INJECTOR_PREFIX};
use crate::error::ConfigError;

/// Default nesting limit for a single resolution chain.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Nesting limit; `None` disables the guard and lets cycles recurse
    /// until the stack runs out.
    pub max_depth: Option<usize>,
    pub injector_detection: DetectionConfig,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            injector_detection: DetectionConfig::default(),
        }
    }
}

impl ContainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == Some(0) {
            return Err(ConfigError::ZeroDepthLimit);
        }
        if self.injector_detection.enabled && self.injector_detection.prefix.is_empty() {
            return Err(ConfigError::EmptyDetectorPrefix);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Enable injector detection when the container is built.
    pub enabled: bool,
    /// Prefix for the default detector. Ignored when a custom detector
    /// is given to the builder.
    pub prefix: String,
    pub blacklist: Blacklist,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: DEFAULT_INJECTOR_PREFIX.to_string(),
            blacklist: Blacklist::default(),
        }
    }
}
