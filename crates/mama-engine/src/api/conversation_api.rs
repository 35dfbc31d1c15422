//! API endpoints for conversation history

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::auth::AuthenticatedUser;
use crate::error::ConversationError;
use crate::memory::{ConversationSummary, ConversationTurn};
use crate::shared_state::UnifiedAppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    pub id: i64,
    pub turns: Vec<ConversationTurn>,
}

impl IntoResponse for ConversationError {
    fn into_response(self) -> Response {
        let status = match self {
            ConversationError::NotFound(_) => StatusCode::NOT_FOUND,
            ConversationError::InvalidRole(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

pub async fn create_conversation(
    State(state): State<UnifiedAppState>,
    user: AuthenticatedUser,
    body: Option<Json<CreateConversationRequest>>,
) -> (StatusCode, Json<ConversationSummary>) {
    let title = body
        .and_then(|Json(request)| request.title)
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty());

    let summary = state.conversations().create_conversation(user.identity.user_id, title);
    info!("Created conversation {} for user {}", summary.id, user.identity.user_id);
    (StatusCode::CREATED, Json(summary))
}

pub async fn append_turn(
    State(state): State<UnifiedAppState>,
    user: AuthenticatedUser,
    Path(conversation_id): Path<i64>,
    Json(turn): Json<ConversationTurn>,
) -> Result<StatusCode, ConversationError> {
    state
        .conversations()
        .append_turn(user.identity.user_id, conversation_id, turn)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_turns(
    State(state): State<UnifiedAppState>,
    user: AuthenticatedUser,
    Path(conversation_id): Path<i64>,
) -> Result<Json<ConversationDetailResponse>, ConversationError> {
    let turns = state.conversations().history(user.identity.user_id, conversation_id)?;
    Ok(Json(ConversationDetailResponse {
        id: conversation_id,
        turns,
    }))
}
