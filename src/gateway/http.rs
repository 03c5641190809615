// src/gateway/http.rs

//! REST implementation of [`ExecutionGateway`].
//!
//! Both execution families expose the same shape:
//!
//! | profile     | execution                                                       | stop                 |
//! |-------------|-----------------------------------------------------------------|----------------------|
//! | replication | `/replication/executions/{id}`                                  | `PUT` (empty body)   |
//! | preheat     | `/projects/{p}/preheat/policies/{policy}/executions/{id}`       | `PATCH` status=Stopped |
//!
//! Tasks live under `{execution}/tasks` and are paged.

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{GatewayConfig, GatewayProfile};
use crate::errors::{GatewayError, MonitorError, Result};
use crate::model::{Execution, ExecutionId, Task};

use super::{ExecutionGateway, GatewayFuture};

const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Gateway backed by a reusable `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MonitorError::ConfigError(format!("building HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn execution_url(&self, id: &ExecutionId) -> String {
        let base = &self.config.base_url;
        match &self.config.profile {
            GatewayProfile::Replication => format!("{base}/replication/executions/{id}"),
            GatewayProfile::Preheat { project, policy } => {
                format!("{base}/projects/{project}/preheat/policies/{policy}/executions/{id}")
            }
        }
    }

    pub fn tasks_url(&self, id: &ExecutionId) -> String {
        format!("{}/tasks", self.execution_url(id))
    }

    /// Where the output of one task can be downloaded.
    pub fn task_log_url(&self, id: &ExecutionId, task_id: &str) -> String {
        let leaf = match self.config.profile {
            GatewayProfile::Replication => "log",
            GatewayProfile::Preheat { .. } => "logs",
        };
        format!("{}/{task_id}/{leaf}", self.tasks_url(id))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> std::result::Result<T, GatewayError> {
        let (value, _) = self.get_json_counted(url).await?;
        Ok(value)
    }

    /// GET + decode, also returning the `x-total-count` header of list
    /// endpoints when the server sends one.
    async fn get_json_counted<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<(T, Option<usize>), GatewayError> {
        debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        let response = check_status(response, url).await?;
        let total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let bytes = response.bytes().await?;
        Ok((serde_json::from_slice(&bytes)?, total))
    }

    async fn load_execution(&self, id: &ExecutionId) -> std::result::Result<Execution, GatewayError> {
        self.get_json(&self.execution_url(id)).await
    }

    /// List all tasks, one page at a time.
    ///
    /// Stops on a short page, once `x-total-count` tasks have been read, or
    /// when a page repeats the previous one (a server ignoring `page`).
    async fn load_tasks(&self, id: &ExecutionId) -> std::result::Result<Vec<Task>, GatewayError> {
        let page_size = self.config.page_size;
        let mut tasks: Vec<Task> = Vec::new();
        let mut previous_ids: Vec<String> = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!("{}?page={page}&page_size={page_size}", self.tasks_url(id));
            let (batch, total): (Vec<Task>, Option<usize>) = self.get_json_counted(&url).await?;

            let ids: Vec<String> = batch.iter().map(|t| t.id.clone()).collect();
            if page > 1 && !ids.is_empty() && ids == previous_ids {
                warn!(execution = %id, page, "task page repeats the previous one; stopping");
                break;
            }

            let last_page = batch.len() < page_size;
            tasks.extend(batch);
            if last_page || total.is_some_and(|total| tasks.len() >= total) {
                break;
            }
            previous_ids = ids;
            page += 1;
        }

        for task in &mut tasks {
            if task.log_ref.is_none() {
                task.log_ref = Some(self.task_log_url(id, &task.id));
            }
        }

        debug!(execution = %id, tasks = tasks.len(), pages = page, "fetched tasks");
        Ok(tasks)
    }

    async fn request_stop(&self, id: &ExecutionId) -> std::result::Result<(), GatewayError> {
        let url = self.execution_url(id);
        let request = match self.config.profile {
            GatewayProfile::Replication => self.http.put(&url),
            GatewayProfile::Preheat { .. } => {
                self.http.patch(&url).json(&json!({ "status": "Stopped" }))
            }
        };

        debug!(%url, "requesting stop");
        let response = request.send().await?;
        check_status(response, &url).await?;
        Ok(())
    }
}

async fn check_status(
    response: reqwest::Response,
    url: &str,
) -> std::result::Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound(url.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        body,
    })
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(Box::new(err))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(Box::new(err))
    }
}

impl ExecutionGateway for HttpGateway {
    fn fetch_execution<'a>(&'a self, id: &'a ExecutionId) -> GatewayFuture<'a, Execution> {
        Box::pin(self.load_execution(id))
    }

    fn fetch_tasks<'a>(&'a self, id: &'a ExecutionId) -> GatewayFuture<'a, Vec<Task>> {
        Box::pin(self.load_tasks(id))
    }

    fn stop_execution<'a>(&'a self, id: &'a ExecutionId) -> GatewayFuture<'a, ()> {
        Box::pin(self.request_stop(id))
    }
}
