//! Construction-time switches of a processing context.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Optional layers the context creates on demand.
    ///
    /// The routing layer has no flag: it always exists.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LayerOptions: u8 {
        const SESSIONS = 1 << 0;
        const SECURITY = 1 << 1;
    }
}

impl LayerOptions {
    pub fn from_flags(sessions: bool, security: bool) -> Self {
        let mut options = LayerOptions::empty();
        options.set(LayerOptions::SESSIONS, sessions);
        options.set(LayerOptions::SECURITY, security);
        options
    }
}

/// What `set_init_parameter` does when the key already has a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitParamPolicy {
    /// Keep the existing value and report `false`.
    #[default]
    Reject,
    /// Replace the existing value and report `true`.
    Overwrite,
}
