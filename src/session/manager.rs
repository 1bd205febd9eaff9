//! Session cookie configuration and tracking modes.

use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::{Deserialize, Serialize};

/// How a session id travels between client and server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    Cookie,
    Url,
    Ssl,
}

pub type TrackingModes = BTreeSet<TrackingMode>;

/// Attributes of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionCookieConfig {
    pub name: String,
    pub domain: Option<String>,
    /// Defaults to the context path when unset.
    pub path: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    /// Seconds; `None` for a browser-session cookie.
    pub max_age: Option<i64>,
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            name: "SESSIONID".to_string(),
            domain: None,
            path: None,
            http_only: true,
            secure: false,
            max_age: None,
        }
    }
}

/// Session configuration shared between the facade and the session layer.
#[derive(Debug)]
pub struct SessionManager {
    cookie: ArcSwap<SessionCookieConfig>,
    tracking: ArcSwapOption<TrackingModes>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionCookieConfig::default())
    }
}

impl SessionManager {
    pub fn new(cookie: SessionCookieConfig) -> Self {
        Self {
            cookie: ArcSwap::from_pointee(cookie),
            tracking: ArcSwapOption::empty(),
        }
    }

    pub fn cookie_config(&self) -> Arc<SessionCookieConfig> {
        self.cookie.load_full()
    }

    pub fn set_cookie_config(&self, config: SessionCookieConfig) {
        self.cookie.store(Arc::new(config));
    }

    /// Cookie and URL tracking.
    pub fn default_tracking_modes(&self) -> TrackingModes {
        [TrackingMode::Cookie, TrackingMode::Url].into_iter().collect()
    }

    /// The explicitly set modes, or the defaults.
    pub fn effective_tracking_modes(&self) -> TrackingModes {
        match self.tracking.load_full() {
            Some(modes) => (*modes).clone(),
            None => self.default_tracking_modes(),
        }
    }

    pub fn set_tracking_modes(&self, modes: TrackingModes) {
        self.tracking.store(Some(Arc::new(modes)));
    }

    pub fn uses_cookies(&self) -> bool {
        self.effective_tracking_modes().contains(&TrackingMode::Cookie)
    }
}
