//! Store backed by a PostgREST-style HTTP interface.
//!
//! Tables: `swarm_agents`, `permission_requests`, `activity_logs`. Rows are
//! the JSON form of the core records; keys are filtered with `id=eq.<uuid>`.

use crate::SwarmStore;
use async_trait::async_trait;
use aura_core::{
    ActivityLogEntry, Agent, AgentId, AuraResult, PermissionRequest, PermissionRequestId,
    StorageError,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const AGENTS: &str = "swarm_agents";
const PERMISSIONS: &str = "permission_requests";
const ACTIVITY: &str = "activity_logs";

/// Connection settings for [`RestStore`].
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Base URL; tables live under `{base_url}/rest/v1/`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestStore {
    pub fn new(config: &RestStoreConfig) -> AuraResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref() {
            let invalid = |e: reqwest::header::InvalidHeaderValue| StorageError::Remote {
                endpoint: config.base_url.clone(),
                reason: format!("invalid api key header: {}", e),
            };
            headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key)).map_err(invalid)?,
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| StorageError::Remote {
                endpoint: config.base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn insert_row<B: Serialize + ?Sized>(&self, table: &str, row: &B) -> AuraResult<()> {
        let url = self.table_url(table);
        let response = self
            .client
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(|e| remote(&url, e))?;
        check_status(&url, response).await?;
        Ok(())
    }

    async fn update_row<B: Serialize + ?Sized>(&self, table: &str, id: &str, row: &B) -> AuraResult<()> {
        let url = self.table_url(table);
        let response = self
            .client
            .patch(&url)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(|e| remote(&url, e))?;
        check_status(&url, response).await?;
        Ok(())
    }

    async fn select_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> AuraResult<Vec<T>> {
        let url = self.table_url(table);
        let response = self
            .client
            .get(&url)
            .query(filters)
            .send()
            .await
            .map_err(|e| remote(&url, e))?;
        let response = check_status(&url, response).await?;
        let rows = response.json::<Vec<T>>().await.map_err(|e| remote(&url, e))?;
        Ok(rows)
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, id: &str) -> AuraResult<Option<T>> {
        let rows = self
            .select_rows::<T>(table, &[("id", format!("eq.{}", id)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }
}

fn remote(url: &str, err: reqwest::Error) -> StorageError {
    StorageError::Remote {
        endpoint: url.to_string(),
        reason: err.to_string(),
    }
}

async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(StorageError::Remote {
        endpoint: url.to_string(),
        reason: format!("HTTP {}: {}", status.as_u16(), text),
    })
}

#[async_trait]
impl SwarmStore for RestStore {
    async fn agent_insert(&self, agent: &Agent) -> AuraResult<()> {
        self.insert_row(AGENTS, agent).await
    }

    async fn agent_update(&self, agent: &Agent) -> AuraResult<()> {
        self.update_row(AGENTS, &agent.id.to_string(), agent).await
    }

    async fn agent_get(&self, id: AgentId) -> AuraResult<Option<Agent>> {
        self.select_one(AGENTS, &id.to_string()).await
    }

    async fn agent_list(&self) -> AuraResult<Vec<Agent>> {
        self.select_rows(AGENTS, &[("order", "created_at.asc".to_string())])
            .await
    }

    async fn permission_insert(&self, request: &PermissionRequest) -> AuraResult<()> {
        self.insert_row(PERMISSIONS, request).await
    }

    async fn permission_update(&self, request: &PermissionRequest) -> AuraResult<()> {
        self.update_row(PERMISSIONS, &request.id.to_string(), request)
            .await
    }

    async fn permission_get(&self, id: PermissionRequestId) -> AuraResult<Option<PermissionRequest>> {
        self.select_one(PERMISSIONS, &id.to_string()).await
    }

    async fn permission_list(&self) -> AuraResult<Vec<PermissionRequest>> {
        self.select_rows(PERMISSIONS, &[("order", "timestamp.asc".to_string())])
            .await
    }

    async fn activity_insert(&self, entry: &ActivityLogEntry) -> AuraResult<()> {
        self.insert_row(ACTIVITY, entry).await
    }

    async fn activity_list(
        &self,
        agent_id: Option<AgentId>,
        limit: Option<usize>,
    ) -> AuraResult<Vec<ActivityLogEntry>> {
        // Newest first so `limit` keeps the most recent, then flip.
        let mut filters = vec![("order", "timestamp.desc".to_string())];
        if let Some(id) = agent_id {
            filters.push(("agent_id", format!("eq.{}", id)));
        }
        if let Some(limit) = limit {
            filters.push(("limit", limit.to_string()));
        }
        let mut rows: Vec<ActivityLogEntry> = self.select_rows(ACTIVITY, &filters).await?;
        rows.reverse();
        Ok(rows)
    }
}
