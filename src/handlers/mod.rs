// Handlers module

pub mod chat;
pub mod records;
pub mod users;

pub use chat::{chat_handler, history_handler};
pub use records::{create_record, delete_record, list_records, update_record};
pub use users::{create_user, get_user, update_user};

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use crate::error::ApiError;

/// Query string parameters as sent by the app
pub type QueryParams = HashMap<String, String>;

/// Collapse a handler result into a reply; errors become `{"error": ...}`
fn respond(result: Result<Response, ApiError>) -> Result<Response, Infallible> {
    Ok(result.unwrap_or_else(|e| e.into_response()))
}

fn json_reply(status: StatusCode, body: Map<String, Value>) -> Response {
    warp::reply::with_status(warp::reply::json(&Value::Object(body)), status).into_response()
}

/// `{key: value}`
fn keyed(key: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert(key.to_string(), value.into());
    body
}

/// `{"message": message, item_key: row}`
fn message_with(message: String, item_key: &str, row: Map<String, Value>) -> Map<String, Value> {
    let mut body = keyed("message", message);
    body.insert(item_key.to_string(), Value::Object(row));
    body
}

/// Non-empty `user_id` query parameter
fn owner_from_query(query: &QueryParams) -> Result<&str, ApiError> {
    query
        .get("user_id")
        .map(String::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::missing(&["user_id"]))
}

/// The one row of a single-row fetch
///
/// No row is a 404 (`No <what> found`); more than one is a server error.
fn single_row(rows: Vec<Map<String, Value>>, what: &str) -> Result<Map<String, Value>, ApiError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        (None, _) => Err(ApiError::NotFound(format!("No {} found", what))),
        (Some(_), count) => {
            error!(what, count, "Single-row fetch matched several rows");
            Err(ApiError::Upstream(format!(
                "Expected a single {} row, found {}",
                what, count
            )))
        }
    }
}

/// Request bodies must be JSON objects
fn into_object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_owner_from_query() {
        let mut query = QueryParams::new();
        assert!(owner_from_query(&query).is_err());

        query.insert("user_id".to_string(), String::new());
        assert!(owner_from_query(&query).is_err());

        query.insert("user_id".to_string(), "u1".to_string());
        assert_eq!(owner_from_query(&query).unwrap(), "u1");
    }

    #[test]
    fn test_into_object_rejects_arrays() {
        assert!(into_object(json!([1, 2])).is_err());
        assert!(into_object(json!({"a": 1})).is_ok());
    }

    #[test]
    fn test_single_row() {
        let row = |id: i64| json!({"id": id}).as_object().cloned().unwrap();

        assert_eq!(single_row(vec![row(1)], "user").unwrap()["id"], 1);

        let err = single_row(Vec::new(), "user").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No user found");

        let err = single_row(vec![row(1), row(2)], "streaks").unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Expected a single streaks row, found 2");
    }

    #[test]
    fn test_message_with() {
        let row = json!({"id": 1}).as_object().cloned().unwrap();
        let body = message_with("Goal updated!".to_string(), "goal", row);
        assert_eq!(
            Value::Object(body),
            json!({"message": "Goal updated!", "goal": {"id": 1}})
        );
    }
}
