// POST /gemini-chat and GET /gemini-chat/history handlers

use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, Instrument};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use super::{json_reply, keyed, owner_from_query, respond, QueryParams};
use crate::chat::ChatService;
use crate::error::ApiError;
use crate::models::{ChatRequest, ChatResponse};

pub async fn chat_handler(
    chat: Arc<ChatService>,
    request: ChatRequest,
) -> Result<Response, Infallible> {
    let call_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %call_id);
    respond(send(&chat, request).instrument(span).await)
}

pub async fn history_handler(
    chat: Arc<ChatService>,
    query: QueryParams,
) -> Result<Response, Infallible> {
    respond(history(&chat, &query).await)
}

async fn send(chat: &ChatService, request: ChatRequest) -> Result<Response, ApiError> {
    let owner_id = request.owner_id();
    let message = request
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::MissingParameter("No message provided".to_string()))?;
    info!(
        owner_id = owner_id.as_deref().unwrap_or("anonymous"),
        chars = message.chars().count(),
        "Received chat message"
    );

    let outcome = chat.send(owner_id.as_deref(), &message).await?;

    let body = ChatResponse {
        content: outcome.content,
        warnings: outcome.warnings,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), StatusCode::OK).into_response())
}

async fn history(chat: &ChatService, query: &QueryParams) -> Result<Response, ApiError> {
    let owner_id = owner_from_query(query)?;

    let rows = chat.history(owner_id).await.map_err(|e| {
        error!(owner_id, error = %e, "Error retrieving chat history");
        ApiError::from(e)
    })?;

    Ok(json_reply(StatusCode::OK, keyed("history", rows)))
}
