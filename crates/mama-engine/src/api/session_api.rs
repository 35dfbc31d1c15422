//! Session endpoints: login, who am I, and logout

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::api::auth::{expired_cookie, issue_session, AuthRejection, AuthenticatedUser};
use crate::error::CredentialError;
use crate::metrics;
use crate::session::{fingerprint, SessionInfo};
use crate::shared_state::UnifiedAppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user_id: i64,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub session: SessionInfo,
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        let status = match self {
            CredentialError::UnknownUser => StatusCode::NOT_FOUND,
            CredentialError::WrongPassword => StatusCode::UNAUTHORIZED,
            CredentialError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({ "detail": self.user_message() }))).into_response()
    }
}

/// Check credentials with the configured validator and start a session.
/// Any earlier session of the same user stops working.
pub async fn login(
    State(state): State<UnifiedAppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, Response> {
    if let Err(e) = request.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "detail": e.to_string() })),
        )
            .into_response());
    }

    let identity = match state.credentials().validate(&request.email, &request.password).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Login for {} rejected: {}", request.email, e);
            metrics::record_login(Err(&e));
            return Err(e.into_response());
        }
    };
    metrics::record_login(Ok(()));

    let (session_id, cookie) = issue_session(&state, identity.user_id, &identity.email);
    info!("User {} logged in (session {})", identity.user_id, fingerprint(&session_id));

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            message: "Login successful",
            user_id: identity.user_id,
            email: identity.email,
        }),
    )
        .into_response())
}

pub async fn me(
    State(state): State<UnifiedAppState>,
    user: AuthenticatedUser,
) -> Result<Json<MeResponse>, AuthRejection> {
    let session = state.sessions().session_info(&user.session_id).map_err(AuthRejection)?;
    Ok(Json(MeResponse { session }))
}

pub async fn logout(State(state): State<UnifiedAppState>, user: AuthenticatedUser) -> impl IntoResponse {
    let existed = state.sessions().invalidate_session(&user.session_id);
    info!("User {} logged out", user.identity.user_id);

    (
        [(header::SET_COOKIE, expired_cookie(&state))],
        Json(serde_json::json!({
            "message": "Logged out",
            "session_invalidated": existed,
        })),
    )
}
