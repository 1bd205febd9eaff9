//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the context path and session cookie name
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HostConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::HostConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let path = &config.context.context_path;
    if !path.is_empty() && !path.starts_with('/') {
        errors.push(ValidationError::new("context.context_path", "must start with '/'"));
    }
    if path.contains(['*', '?', '#']) {
        errors.push(ValidationError::new("context.context_path", "must not contain wildcards or query characters"));
    }

    let cookie = &config.context.session.cookie.name;
    if cookie.is_empty() || cookie.contains([';', '=', ',', ' ']) {
        errors.push(ValidationError::new(
            "context.session.cookie.name",
            format!("not a valid cookie name: {cookie:?}"),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&HostConfig::default()).is_ok());
    }

    #[test]
    fn test_context_path_checks() {
        let mut config = HostConfig::default();
        config.context.context_path = "app/*".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.field == "context.context_path"));
    }

    #[test]
    fn test_cookie_name_check() {
        let mut config = HostConfig::default();
        config.context.session.cookie.name = "a=b".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "context.session.cookie.name");
    }
}
