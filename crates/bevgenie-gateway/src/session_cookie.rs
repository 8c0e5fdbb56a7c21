use axum::http::{header, HeaderMap, HeaderValue};

pub const SESSION_COOKIE: &str = "bevgenie_session";

/// Session id from the request, or a fresh one with the cookie to set.
pub(crate) struct SessionId {
    pub id: String,
    pub set_cookie: Option<HeaderValue>,
}

pub(crate) fn from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn resolve(headers: &HeaderMap) -> SessionId {
    if let Some(id) = from_headers(headers) {
        return SessionId { id, set_cookie: None };
    }
    let id = uuid::Uuid::new_v4().to_string();
    let set_cookie = HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, id
    ))
    .ok();
    tracing::debug!(target: "bevgenie::gateway", session_id = %id, "new session cookie");
    SessionId { id, set_cookie }
}
