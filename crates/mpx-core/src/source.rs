use crate::{ErrorKind, Snapshot};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_STATUS_PATH: &str = "status";
pub const DEFAULT_VERSION_PATH: &str = "version";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} answered with status {status}")]
    Status { status: u16, url: String },
    #[error("invalid status document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("fetch ended without a result")]
    Aborted,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::FetchFailed
    }
}

/// Where snapshots and the version string come from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError>;

    async fn fetch_version(&self) -> Result<String, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub status: Url,
    pub version: Url,
}

impl Endpoints {
    /// Resolves optional overrides against `base`. Overrides may be absolute
    /// or relative; absent ones fall back to `status` and `version`.
    pub fn resolve(
        base: &Url,
        status: Option<&str>,
        version: Option<&str>,
    ) -> Result<Self, url::ParseError> {
        let mut base = base.clone();
        base.set_fragment(None);
        let status = base.join(status.unwrap_or(DEFAULT_STATUS_PATH))?;
        let version = base.join(version.unwrap_or(DEFAULT_VERSION_PATH))?;
        Ok(Self { status, version })
    }
}

pub struct HttpSnapshotSource {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpSnapshotSource {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let body = self.get_text(&self.endpoints.status).await?;
        let snapshot = Snapshot::from_json(&body)?;
        debug!(
            "status_fetched: servers={} bytes={}",
            snapshot.servers.len(),
            body.len()
        );
        Ok(snapshot)
    }

    async fn fetch_version(&self) -> Result<String, FetchError> {
        let body = self.get_text(&self.endpoints.version).await?;
        Ok(body.trim().to_string())
    }
}
