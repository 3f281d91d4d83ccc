//! Service configuration.
//!
//! Every field has a default, so an empty or missing config file gives a
//! working service listening on `127.0.0.1:8080`.

use crate::core::error::ConfigError;
use crate::server::admission::AdmissionOptions;
use crate::server::codec::DEFAULT_MAX_SIDE;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address to listen on.
    pub listen: SocketAddr,
    /// First path segment of the processing route.
    pub route_prefix: String,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
    /// Largest accepted image width and height.
    pub max_image_side: u32,
    /// Requests processed at the same time; the rest wait.
    pub max_concurrent_requests: usize,
    /// Admission gate settings.
    pub admission: AdmissionOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            route_prefix: "process".to_string(),
            max_body_bytes: 100 * 1024,
            max_image_side: DEFAULT_MAX_SIDE,
            max_concurrent_requests: 1000,
            admission: AdmissionOptions::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text, &path.display().to_string())
    }

    /// Check values that would make the service unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.route_prefix.trim_matches('/').is_empty() || self.route_prefix.trim_matches('/').contains('/') {
            return Err(invalid("route_prefix", "must be a single non-empty path segment"));
        }
        if self.max_image_side == 0 {
            return Err(invalid("max_image_side", "must be positive"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(invalid("max_concurrent_requests", "must be positive"));
        }
        if self.admission.refill_interval_ms == 0 {
            return Err(invalid("admission.refill_interval_ms", "must be positive"));
        }
        Ok(())
    }
}
