//! Session cookie handling and the authenticated-user extractor

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::error::AuthError;
use crate::metrics;
use crate::session::{fingerprint, Identity};
use crate::shared_state::UnifiedAppState;

/// Identity behind the session cookie of the current request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    pub session_id: String,
}

/// 401 with the user-facing message for the failure
#[derive(Debug)]
pub struct AuthRejection(pub AuthError);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "detail": self.0.user_message() })),
        )
            .into_response()
    }
}

/// Value of cookie `name` across all `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(key, value)| (key, value.trim()))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

#[async_trait]
impl FromRequestParts<UnifiedAppState> for AuthenticatedUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &UnifiedAppState) -> Result<Self, Self::Rejection> {
        let session_id = match cookie_value(&parts.headers, state.cookie_name()) {
            Some(session_id) => session_id.to_string(),
            None => {
                metrics::record_session_resolution(Err(AuthError::NoSession));
                return Err(AuthRejection(AuthError::NoSession));
            }
        };

        match state.sessions().resolve_session(&session_id) {
            Ok(identity) => {
                metrics::record_session_resolution(Ok(()));
                Ok(Self { identity, session_id })
            }
            Err(e) => {
                debug!("Rejected session {}: {}", fingerprint(&session_id), e);
                metrics::record_session_resolution(Err(e));
                Err(AuthRejection(e))
            }
        }
    }
}

/// Create a session for a user whose credentials were just validated and
/// return the token with its `Set-Cookie` header value.
pub fn issue_session(state: &UnifiedAppState, user_id: i64, email: &str) -> (String, String) {
    let session_id = state.sessions().create_session(user_id, email);
    let max_age = state.sessions().timeout().num_seconds();
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        state.cookie_name(),
        session_id,
        max_age
    );
    (session_id, cookie)
}

/// `Set-Cookie` value that deletes the session cookie
pub fn expired_cookie(state: &UnifiedAppState) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", state.cookie_name())
}
