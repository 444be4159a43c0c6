//! PostgREST (Supabase) table service

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

use super::{
    error::{Result, StoreError},
    query::{Filter, Row, SelectQuery},
    validate_identifier, TableService,
};

/// Client for a PostgREST endpoint authenticated with a public API key
#[derive(Clone)]
pub struct RestTableService {
    /// HTTP client for making requests
    http_client: Client,
    /// Project URL without trailing slash, e.g. `https://abc.supabase.co`
    base_url: String,
    /// Public (anon) key sent as both `apikey` and bearer token
    api_key: String,
}

impl RestTableService {
    /// Create a new REST table service
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build the endpoint URL for a table
    fn table_url(&self, table: &str) -> Result<String> {
        validate_identifier(table)?;
        Ok(format!("{}/rest/v1/{}", self.base_url, table))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Send the request and decode a JSON array of rows
    async fn rows(builder: RequestBuilder) -> Result<Vec<Row>> {
        let response = Self::checked(builder.send().await?).await?;
        let body: Value = response.json().await?;
        rows_from_value(body)
    }

    async fn checked(response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Render filters as PostgREST query parameters (`column=eq.value`)
pub fn filter_params(filters: &[Filter]) -> Result<Vec<(String, String)>> {
    filters
        .iter()
        .map(|f| {
            validate_identifier(&f.column)?;
            Ok((f.column.clone(), format!("eq.{}", f.value)))
        })
        .collect()
}

fn rows_from_value(body: Value) -> Result<Vec<Row>> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(StoreError::Serialization(format!(
                    "expected row object, got {}",
                    other
                ))),
            })
            .collect(),
        Value::Object(row) => Ok(vec![row]),
        other => Err(StoreError::Serialization(format!(
            "expected row array, got {}",
            other
        ))),
    }
}

#[async_trait]
impl TableService for RestTableService {
    async fn select(&self, table: &str, query: SelectQuery) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(&query.filters)?);
        if let Some(column) = &query.order_by {
            validate_identifier(column)?;
            params.push(("order".to_string(), format!("{}.asc", column)));
        }

        let request = self.authorized(self.http_client.get(&url)).query(&params);
        Self::rows(request).await
    }

    async fn insert(&self, table: &str, record: Row) -> Result<Row> {
        let url = self.table_url(table)?;
        let request = self
            .authorized(self.http_client.post(&url))
            .header("Prefer", "return=representation")
            .json(&record);

        Self::rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Serialization("insert returned no rows".to_string()))
    }

    async fn update(&self, table: &str, filters: Vec<Filter>, changes: Row) -> Result<Vec<Row>> {
        let url = self.table_url(table)?;
        let request = self
            .authorized(self.http_client.patch(&url))
            .query(&filter_params(&filters)?)
            .header("Prefer", "return=representation")
            .json(&changes);

        Self::rows(request).await
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<()> {
        let url = self.table_url(table)?;
        let request = self
            .authorized(self.http_client.delete(&url))
            .query(&filter_params(&filters)?);

        Self::checked(request.send().await?).await?;
        Ok(())
    }
}
