//! Context selection endpoint
//!
//! Resolves history (inline or from a stored conversation), runs the
//! selector and returns the decision with its rendered instructions.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::api::auth::AuthenticatedUser;
use crate::context_engine::{ContextDecision, PromptInstructions, SelectionRequest};
use crate::memory::ConversationTurn;
use crate::metrics;
use crate::shared_state::UnifiedAppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SelectContextRequest {
    #[validate(length(min = 1, max = 8000))]
    pub query: String,
    /// Inline history; ignored when `conversation_id` is given
    #[serde(default)]
    #[validate(length(max = 200))]
    pub history: Option<Vec<ConversationTurn>>,
    pub conversation_id: Option<i64>,
    #[validate(length(min = 2, max = 16))]
    pub target_language: Option<String>,
    #[serde(default)]
    pub is_greeting: bool,
    #[serde(default)]
    pub is_non_informational: bool,
    #[serde(default)]
    pub has_retrieved_passages: bool,
}

#[derive(Debug, Serialize)]
pub struct SelectContextResponse {
    /// Query with any explicit language request stripped
    pub query: String,
    pub decision: ContextDecision,
    pub instructions: PromptInstructions,
    pub system_instructions: String,
}

pub async fn select_context(
    State(state): State<UnifiedAppState>,
    user: AuthenticatedUser,
    Json(request): Json<SelectContextRequest>,
) -> Result<Json<SelectContextResponse>, Response> {
    if let Err(e) = request.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "detail": e.to_string() })),
        )
            .into_response());
    }

    let history = match request.conversation_id {
        Some(conversation_id) => state
            .conversations()
            .history(user.identity.user_id, conversation_id)
            .map_err(IntoResponse::into_response)?,
        None => request.history.unwrap_or_default(),
    };
    debug!("Selecting context over {} history turn(s)", history.len());

    let selector = state.selector();
    let (query, derived_language) = selector.requested_language(&request.query);
    let target_language = request
        .target_language
        .unwrap_or_else(|| derived_language.to_string());

    let selection = SelectionRequest {
        query: query.clone(),
        history,
        target_language: Some(target_language),
        is_greeting: request.is_greeting,
        is_non_informational: request.is_non_informational,
        has_retrieved_passages: request.has_retrieved_passages,
    };

    let decision = selector.select(&selection).await;
    metrics::record_context_decision(&decision);

    let instructions = selector.instructions(&decision);
    info!(
        "Context selected for user {} (followup: {}, language: {})",
        user.identity.user_id, decision.is_followup, decision.resolved_language
    );

    Ok(Json(SelectContextResponse {
        query,
        system_instructions: instructions.render(),
        decision,
        instructions,
    }))
}
