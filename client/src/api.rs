//! Query job API
//!
//! A search is an asynchronous job on the service: it is created once, polled
//! for snapshots until it reports `done` (or forever, for live jobs), and
//! deleted when the caller is finished with it.

use crate::config::ClientConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;
use trawl_shared::{Query, QueryResult};

/// Boundary operations the search pipeline consumes.
#[async_trait]
pub trait QueryJobs: Send + Sync {
    /// Submit a query and return the job id.
    async fn create(&self, repository: &str, query: &Query) -> Result<String, ApiError>;

    /// Fetch the current snapshot of a job.
    async fn poll(&self, repository: &str, id: &str) -> Result<QueryResult, ApiError>;

    /// Stop and discard a job.
    async fn delete(&self, repository: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct CreatedJob {
    id: String,
}

/// [`QueryJobs`] over the service's REST API.
#[derive(Debug, Clone)]
pub struct HttpQueryJobs {
    http: Client,
    address: Url,
    token: Option<String>,
}

impl HttpQueryJobs {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("trawl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            address: config.address.clone(),
            token: config.token.clone(),
        })
    }

    /// `{address}/api/v1/repositories/{repository}/queryjobs[/{id}]`
    fn jobs_url(&self, repository: &str, id: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.address.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidAddress(self.address.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["api", "v1", "repositories", repository, "queryjobs"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Map non-success responses onto [`ApiError`]. The service reports query
/// syntax and semantic errors as `400 Bad Request` with a plain-text body.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::BAD_REQUEST {
        return Err(ApiError::Query(body.trim().to_string()));
    }
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl QueryJobs for HttpQueryJobs {
    async fn create(&self, repository: &str, query: &Query) -> Result<String, ApiError> {
        let url = self.jobs_url(repository, None)?;
        debug!(%url, live = query.live, "Creating query job");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(query)
            .send()
            .await?;
        let body = check_status(response).await?.bytes().await?;
        let job: CreatedJob = serde_json::from_slice(&body)?;

        debug!(id = %job.id, "Query job created");
        Ok(job.id)
    }

    async fn poll(&self, repository: &str, id: &str) -> Result<QueryResult, ApiError> {
        let url = self.jobs_url(repository, Some(id))?;

        let response = self.request(reqwest::Method::GET, url).send().await?;
        let body = check_status(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn delete(&self, repository: &str, id: &str) -> Result<(), ApiError> {
        let url = self.jobs_url(repository, Some(id))?;
        debug!(%url, "Deleting query job");

        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        check_status(response).await?;
        Ok(())
    }
}
