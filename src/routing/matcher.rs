//! Path matching logic.
//!
//! # Responsibilities
//! - Parse URL patterns into [`PathSpec`]s
//! - Match a path-in-context against a spec
//! - Resolve the most specific spec in a [`PathMap`]
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Precedence: exact, then longest prefix, then suffix, then default
//! - No regex to guarantee O(n) matching

use std::collections::HashMap;
use std::fmt;

use crate::error::ContextError;

/// A parsed URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSpec {
    /// `""`: the context root only.
    Root,
    /// `/exact/path`
    Exact(String),
    /// `/prefix/*`, or `/*` with an empty prefix.
    Prefix(String),
    /// `*.ext`
    Suffix(String),
    /// `/`: matches anything nothing else claimed.
    Default,
}

impl PathSpec {
    pub fn parse(spec: &str) -> Result<Self, ContextError> {
        let invalid = || ContextError::InvalidPathSpec(spec.to_string());

        if spec.is_empty() {
            return Ok(PathSpec::Root);
        }
        if spec == "/" {
            return Ok(PathSpec::Default);
        }
        if let Some(ext) = spec.strip_prefix("*.") {
            if ext.is_empty() || ext.contains(['/', '*']) {
                return Err(invalid());
            }
            return Ok(PathSpec::Suffix(ext.to_string()));
        }
        if !spec.starts_with('/') {
            return Err(invalid());
        }
        if let Some(prefix) = spec.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(invalid());
            }
            return Ok(PathSpec::Prefix(prefix.to_string()));
        }
        if spec.contains('*') {
            return Err(invalid());
        }
        Ok(PathSpec::Exact(spec.to_string()))
    }

    /// Returns true if `path` falls under this spec.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathSpec::Root => path.is_empty() || path == "/",
            PathSpec::Exact(exact) => path == exact,
            PathSpec::Prefix(prefix) => prefix_matches(prefix, path),
            PathSpec::Suffix(ext) => suffix_matches(ext, path),
            PathSpec::Default => true,
        }
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpec::Root => Ok(()),
            PathSpec::Exact(exact) => f.write_str(exact),
            PathSpec::Prefix(prefix) => write!(f, "{prefix}/*"),
            PathSpec::Suffix(ext) => write!(f, "*.{ext}"),
            PathSpec::Default => f.write_str("/"),
        }
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn suffix_matches(ext: &str, path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    last.strip_suffix(ext)
        .is_some_and(|stem| stem.ends_with('.'))
}

/// Specs compiled for most-specific-first lookup.
#[derive(Debug, Clone)]
pub struct PathMap<V> {
    exact: HashMap<String, V>,
    // Sorted longest first.
    prefixes: Vec<(String, V)>,
    suffixes: HashMap<String, V>,
    default: Option<V>,
}

impl<V> Default for PathMap<V> {
    fn default() -> Self {
        Self {
            exact: HashMap::new(),
            prefixes: Vec::new(),
            suffixes: HashMap::new(),
            default: None,
        }
    }
}

impl<V> PathMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a spec; a later insert of the same spec replaces the earlier one.
    pub fn insert(&mut self, spec: &PathSpec, value: V) {
        match spec {
            PathSpec::Root => {
                self.exact.insert("/".to_string(), value);
            }
            PathSpec::Exact(exact) => {
                self.exact.insert(exact.clone(), value);
            }
            PathSpec::Prefix(prefix) => {
                self.prefixes.retain(|(p, _)| p != prefix);
                let at = self
                    .prefixes
                    .iter()
                    .position(|(p, _)| p.len() < prefix.len())
                    .unwrap_or(self.prefixes.len());
                self.prefixes.insert(at, (prefix.clone(), value));
            }
            PathSpec::Suffix(ext) => {
                self.suffixes.insert(ext.clone(), value);
            }
            PathSpec::Default => self.default = Some(value),
        }
    }

    /// The value of the most specific spec matching `path`.
    pub fn lookup(&self, path: &str) -> Option<&V> {
        let key = if path.is_empty() { "/" } else { path };
        if let Some(value) = self.exact.get(key) {
            return Some(value);
        }
        if let Some((_, value)) = self.prefixes.iter().find(|(p, _)| prefix_matches(p, path)) {
            return Some(value);
        }
        // Longest extension first, so `*.tar.gz` beats `*.gz`.
        let last = path.rsplit('/').next().unwrap_or(path);
        for (dot, _) in last.match_indices('.') {
            if let Some(value) = self.suffixes.get(&last[dot + 1..]) {
                return Some(value);
            }
        }
        self.default.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
            && self.prefixes.is_empty()
            && self.suffixes.is_empty()
            && self.default.is_none()
    }
}
