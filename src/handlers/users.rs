// User profile handlers; profiles are keyed by `id` rather than `user_id`

use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error};
use warp::http::StatusCode;
use warp::reply::Response;

use super::{
    into_object, json_reply, keyed, message_with, owner_from_query, respond, single_row,
    QueryParams,
};
use crate::error::ApiError;
use crate::store::{Filter, SelectQuery, StoreError, TableService};
use crate::tables::is_blank;

const USERS_TABLE: &str = "users";
const USER_KEY: &str = "user";
const REQUIRED: &[&str] = &["id", "name"];

/// GET /users?user_id=X
pub async fn get_user(
    store: Arc<dyn TableService>,
    query: QueryParams,
) -> Result<Response, Infallible> {
    respond(fetch(store.as_ref(), &query).await)
}

/// POST /users
pub async fn create_user(
    store: Arc<dyn TableService>,
    body: Value,
) -> Result<Response, Infallible> {
    respond(create(store.as_ref(), body).await)
}

/// PUT /users/<id>
pub async fn update_user(
    id: String,
    store: Arc<dyn TableService>,
    body: Value,
) -> Result<Response, Infallible> {
    respond(update(store.as_ref(), &id, body).await)
}

async fn fetch(store: &dyn TableService, query: &QueryParams) -> Result<Response, ApiError> {
    let user_id = owner_from_query(query)?;

    let rows = store
        .select(USERS_TABLE, SelectQuery::new().eq("id", user_id))
        .await
        .map_err(|e| logged("retrieving", e))?;
    let row = single_row(rows, USER_KEY)?;

    Ok(json_reply(StatusCode::OK, keyed(USER_KEY, row)))
}

async fn create(store: &dyn TableService, body: Value) -> Result<Response, ApiError> {
    let profile = into_object(body)?;
    if REQUIRED.iter().any(|f| is_blank(profile.get(*f))) {
        return Err(ApiError::missing(REQUIRED));
    }

    let row = store
        .insert(USERS_TABLE, profile)
        .await
        .map_err(|e| logged("adding", e))?;
    debug!(id = ?row.get("id"), "Added user");

    Ok(json_reply(
        StatusCode::CREATED,
        message_with("User added!".to_string(), USER_KEY, row),
    ))
}

async fn update(store: &dyn TableService, id: &str, body: Value) -> Result<Response, ApiError> {
    let changes = into_object(body)?;

    let rows = store
        .update(USERS_TABLE, vec![Filter::eq("id", id)], changes)
        .await
        .map_err(|e| logged("updating", e))?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    debug!(id, "Updated user");

    Ok(json_reply(
        StatusCode::OK,
        message_with("User updated!".to_string(), USER_KEY, row),
    ))
}

fn logged(action: &str, err: StoreError) -> ApiError {
    error!(error = %err, "Error {} user", action);
    err.into()
}
