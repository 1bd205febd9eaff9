//! Configuration schema definitions.
//!
//! This module defines the configuration of the embedding host and the
//! context it serves. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

use crate::artifact::InitParameters;
use crate::context::InitParamPolicy;
use crate::session::{SessionCookieConfig, TrackingMode};

/// Root configuration for the host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// The processing context served by this host.
    pub context: ContextConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Processing context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Context path ("" or "/" for the root context).
    pub context_path: String,

    /// Create a session layer on demand.
    pub sessions: bool,

    /// Create a security layer on demand.
    pub security: bool,

    /// Behavior of `set_init_parameter` for a key that already has a value.
    pub init_param_policy: InitParamPolicy,

    /// Context init parameters.
    pub init_parameters: InitParameters,

    /// Session settings, used when sessions are enabled.
    pub session: SessionConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            context_path: "/".to_string(),
            sessions: false,
            security: false,
            init_param_policy: InitParamPolicy::Reject,
            init_parameters: InitParameters::new(),
            session: SessionConfig::default(),
        }
    }
}

/// Session layer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie: SessionCookieConfig,

    /// Tracking modes; the session layer defaults apply when unset.
    pub tracking_modes: Option<Vec<TrackingMode>>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
