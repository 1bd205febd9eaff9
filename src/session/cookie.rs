//! Cookie-tracked session layer.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    response::Response,
};
use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::handler::{Handler, SharedHandler};
use crate::session::{SessionCookieConfig, SessionLayer, SessionManager};

/// Session identity attached to every request that passes the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub is_new: bool,
}

/// Resumes the session named by the request cookie, or starts a new one.
pub struct CookieSessionLayer {
    manager: Arc<SessionManager>,
    context_path: String,
}

impl CookieSessionLayer {
    pub fn new(manager: SessionManager) -> Self {
        Self {
            manager: Arc::new(manager),
            context_path: "/".to_string(),
        }
    }

    /// Cookie path used when the cookie config leaves it unset.
    pub fn with_context_path(mut self, path: &str) -> Self {
        self.context_path = if path.is_empty() { "/".to_string() } else { path.to_string() };
        self
    }
}

impl SessionLayer for CookieSessionLayer {
    fn manager(&self) -> &SessionManager {
        &self.manager
    }

    fn wrap(&self, inner: SharedHandler) -> SharedHandler {
        Arc::new(SessionHandler {
            manager: self.manager.clone(),
            context_path: self.context_path.clone(),
            inner,
        })
    }
}

struct SessionHandler {
    manager: Arc<SessionManager>,
    context_path: String,
    inner: SharedHandler,
}

impl Handler for SessionHandler {
    fn handle(&self, mut request: Request<Body>) -> BoxFuture<'static, Response> {
        let config = self.manager.cookie_config();
        let uses_cookies = self.manager.uses_cookies();

        let existing = uses_cookies
            .then(|| session_cookie(&request, &config.name))
            .flatten();
        let session = match existing {
            Some(id) => Session { id, is_new: false },
            None => Session {
                id: Uuid::new_v4().to_string(),
                is_new: true,
            },
        };
        tracing::trace!(session = %session.id, new = session.is_new, "Session established");

        let set_cookie = (session.is_new && uses_cookies)
            .then(|| set_cookie_value(&config, &self.context_path, &session.id))
            .and_then(|value| HeaderValue::from_str(&value).ok());

        request.extensions_mut().insert(session);
        let future = self.inner.handle(request);
        Box::pin(async move {
            let mut response = future.await;
            if let Some(value) = set_cookie {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            response
        })
    }
}

fn session_cookie(request: &Request<Body>, name: &str) -> Option<String> {
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn set_cookie_value(config: &SessionCookieConfig, context_path: &str, id: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path={}",
        config.name,
        id,
        config.path.as_deref().unwrap_or(context_path)
    );
    if let Some(domain) = &config.domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    if let Some(max_age) = config.max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if config.http_only {
        cookie.push_str("; HttpOnly");
    }
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}
