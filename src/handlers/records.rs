// Generic per-owner CRUD handlers for the record tables

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
use crate::tables::{is_blank, owner_from_body, Fetch, TableSpec, OWNER_COLUMN};

/// GET /<path>?user_id=X
pub async fn list_records(
    spec: &'static TableSpec,
    store: Arc<dyn TableService>,
    query: QueryParams,
) -> Result<Response, Infallible> {
    respond(list(spec, store.as_ref(), &query).await)
}

/// POST /<path>
pub async fn create_record(
    spec: &'static TableSpec,
    store: Arc<dyn TableService>,
    body: Value,
) -> Result<Response, Infallible> {
    respond(create(spec, store.as_ref(), body).await)
}

/// PUT /<path>/<id>
pub async fn update_record(
    spec: &'static TableSpec,
    id: String,
    store: Arc<dyn TableService>,
    body: Value,
) -> Result<Response, Infallible> {
    respond(update(spec, store.as_ref(), &id, body).await)
}

/// DELETE /<path>/<id>?user_id=X
pub async fn delete_record(
    spec: &'static TableSpec,
    id: String,
    store: Arc<dyn TableService>,
    query: QueryParams,
) -> Result<Response, Infallible> {
    respond(delete(spec, store.as_ref(), &id, &query).await)
}

async fn list(
    spec: &TableSpec,
    store: &dyn TableService,
    query: &QueryParams,
) -> Result<Response, ApiError> {
    let owner_id = owner_from_query(query)?;

    let mut select = SelectQuery::new().eq(OWNER_COLUMN, owner_id);
    if let Some(column) = spec.order_by {
        select = select.order_by(column);
    }

    let rows = store
        .select(spec.table, select)
        .await
        .map_err(|e| logged(spec, "retrieving", e))?;
    debug!(table = spec.table, owner_id, rows = rows.len(), "Listed records");

    let body = match spec.fetch {
        Fetch::Many => keyed(spec.collection_key, rows),
        Fetch::Single => keyed(
            spec.collection_key,
            single_row(rows, &spec.label.to_lowercase())?,
        ),
    };
    Ok(json_reply(StatusCode::OK, body))
}

async fn create(
    spec: &TableSpec,
    store: &dyn TableService,
    body: Value,
) -> Result<Response, ApiError> {
    let body = into_object(body)?;

    let owner_id = owner_from_body(&body);
    let missing_field = spec.required.iter().any(|f| is_blank(body.get(*f)));
    let owner_id = match owner_id {
        Some(owner_id) if !missing_field => owner_id,
        _ => {
            let mut fields = vec![OWNER_COLUMN];
            fields.extend_from_slice(spec.required);
            return Err(ApiError::missing(&fields));
        }
    };

    let record = spec.build_record(&body, &owner_id);
    let row = store
        .insert(spec.table, record)
        .await
        .map_err(|e| logged(spec, "adding", e))?;
    debug!(table = spec.table, owner_id = %owner_id, "Added record");

    Ok(json_reply(
        StatusCode::CREATED,
        message_with(spec.added_message(), spec.item_key, row),
    ))
}

async fn update(
    spec: &TableSpec,
    store: &dyn TableService,
    id: &str,
    body: Value,
) -> Result<Response, ApiError> {
    let mut changes = into_object(body)?;
    let owner_id = owner_from_body(&changes).ok_or_else(|| ApiError::missing(&[OWNER_COLUMN]))?;
    changes.remove(OWNER_COLUMN);

    let rows = store
        .update(
            spec.table,
            vec![Filter::eq("id", id), Filter::eq(OWNER_COLUMN, owner_id.as_str())],
            changes,
        )
        .await
        .map_err(|e| logged(spec, "updating", e))?;

    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", spec.label)))?;
    debug!(table = spec.table, id, owner_id = %owner_id, "Updated record");

    Ok(json_reply(
        StatusCode::OK,
        message_with(spec.updated_message(), spec.item_key, row),
    ))
}

async fn delete(
    spec: &TableSpec,
    store: &dyn TableService,
    id: &str,
    query: &QueryParams,
) -> Result<Response, ApiError> {
    let owner_id = owner_from_query(query)?;

    store
        .delete(
            spec.table,
            vec![Filter::eq("id", id), Filter::eq(OWNER_COLUMN, owner_id)],
        )
        .await
        .map_err(|e| logged(spec, "deleting", e))?;
    debug!(table = spec.table, id, owner_id, "Deleted record");

    Ok(json_reply(StatusCode::OK, keyed("message", spec.deleted_message())))
}

fn logged(spec: &TableSpec, action: &str, err: StoreError) -> ApiError {
    error!(table = spec.table, error = %err, "Error {} records", action);
    err.into()
}
