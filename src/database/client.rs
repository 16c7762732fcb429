// file: src/database/client.rs
// description: OpenSearch REST client wrapper with shared connection pool
// reference: https://opensearch.org/docs/latest/api-reference/

use crate::config::StoreConfig;
use crate::database::store::{DocumentStore, PageRequest};
use crate::error::{PipelineError, Result};
use crate::models::{EnrichedRecord, ItemOutcome, SourceRecord};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Connection to one OpenSearch cluster. Cloning shares the pool.
#[derive(Clone)]
pub struct OpenSearchClient {
    http: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl OpenSearchClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        info!("Configuring OpenSearch client for {}", config.url);

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn index(&self, name: impl Into<String>) -> OpenSearchIndex {
        OpenSearchIndex {
            client: self.clone(),
            name: name.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.http.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| PipelineError::StoreUnavailable(format!("{}: {}", self.base_url, e)))
    }

    pub async fn ping(&self) -> Result<()> {
        debug!("Checking OpenSearch connection");
        let response = self.send(self.request(Method::GET, "/")).await?;
        ensure_success(response, "_cluster").await?;
        Ok(())
    }
}

/// A named index reached through a shared [`OpenSearchClient`].
#[derive(Clone)]
pub struct OpenSearchIndex {
    client: OpenSearchClient,
    name: String,
}

#[async_trait]
impl DocumentStore for OpenSearchIndex {
    fn index_name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }

    async fn exists(&self) -> Result<bool> {
        let response = self
            .client
            .send(self.client.request(Method::HEAD, &self.name))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(PipelineError::StoreRequest {
                index: self.name.clone(),
                status: status.as_u16(),
                message: "index existence check failed".to_string(),
            }),
        }
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<SourceRecord>> {
        let body = search_body(request);
        let response = self
            .client
            .send(
                self.client
                    .request(Method::POST, &format!("{}/_search", self.name))
                    .json(&body),
            )
            .await?;
        let text = ensure_success(response, &self.name).await?;
        let records = parse_search_response(&text)?;
        debug!("Fetched {} records from {}", records.len(), self.name);
        Ok(records)
    }

    async fn bulk_index(&self, records: &[EnrichedRecord]) -> Result<Vec<ItemOutcome>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let body = bulk_body(&self.name, records)?;
        let response = self
            .client
            .send(
                self.client
                    .request(Method::POST, "_bulk")
                    .header("Content-Type", "application/x-ndjson")
                    .body(body),
            )
            .await?;
        let text = ensure_success(response, &self.name).await?;
        parse_bulk_response(records, &text)
    }

    async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .send(
                self.client
                    .request(Method::GET, &format!("{}/_count", self.name)),
            )
            .await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipelineError::StoreUnavailable(format!("Failed to read response: {}", e)))?;
        parse_count_response(&self.name, status, &text)
    }
}

async fn ensure_success(response: Response, index: &str) -> Result<String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| PipelineError::StoreUnavailable(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(PipelineError::StoreRequest {
            index: index.to_string(),
            status: status.as_u16(),
            message: text,
        });
    }

    Ok(text)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

// A missing index answers `_count` with 404.
fn parse_count_response(index: &str, status: StatusCode, text: &str) -> Result<u64> {
    if status == StatusCode::NOT_FOUND {
        return Ok(0);
    }
    if !status.is_success() {
        return Err(PipelineError::StoreRequest {
            index: index.to_string(),
            status: status.as_u16(),
            message: text.to_string(),
        });
    }

    let parsed: CountResponse = serde_json::from_str(text)?;
    Ok(parsed.count)
}

fn search_body(request: &PageRequest) -> Value {
    let mut body = json!({
        "size": request.size,
        "sort": [{"_id": "asc"}],
        "_source": request.include_source,
        "query": {"match_all": {}},
    });

    if let Some(cursor) = &request.after {
        body["search_after"] = json!([cursor.as_str()]);
    }

    body
}

fn parse_search_response(text: &str) -> Result<Vec<SourceRecord>> {
    let parsed: SearchResponse = serde_json::from_str(text)?;
    Ok(parsed
        .hits
        .hits
        .into_iter()
        .map(|hit| SourceRecord::new(hit.id, hit.source.unwrap_or_default()))
        .collect())
}

fn bulk_body(index: &str, records: &[EnrichedRecord]) -> Result<String> {
    let mut body = String::new();
    for record in records {
        let action = json!({"index": {"_index": index, "_id": record.id}});
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&record.to_document())?);
        body.push('\n');
    }
    Ok(body)
}

fn parse_bulk_response(records: &[EnrichedRecord], text: &str) -> Result<Vec<ItemOutcome>> {
    let parsed: BulkResponse = serde_json::from_str(text)?;
    let mut items = parsed.items.into_iter();

    // Items come back in request order, one per action.
    Ok(records
        .iter()
        .map(|record| {
            let Some(item) = items.next().and_then(|entry| entry.into_values().next()) else {
                return ItemOutcome::rejected(&record.id, "missing from bulk response");
            };
            let id = item.id.unwrap_or_else(|| record.id.clone());
            if (200..300).contains(&item.status) && item.error.is_none() {
                ItemOutcome::written(id)
            } else {
                ItemOutcome::rejected(id, describe_bulk_error(item.status, item.error.as_ref()))
            }
        })
        .collect())
}

fn describe_bulk_error(status: u16, error: Option<&Value>) -> String {
    match error {
        Some(error) => {
            let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
            let reason = error.get("reason").and_then(Value::as_str).unwrap_or("");
            format!("{} ({}): {}", kind, status, reason)
        }
        None => format!("status {}", status),
    }
}
