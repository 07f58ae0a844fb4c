//! HTTP client used to probe mirrors, fetch index pages and download files

pub mod platform;


use crate::error::{AppError, Result};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT},
    redirect::Policy,
    Client,
};
use std::time::Duration;
use tokio::time::timeout;

/// HTTP operations the benchmark needs, abstracted for testing
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a HEAD request without following redirects and return the status
    async fn head(&self, url: &str, limit: Duration) -> Result<u16>;

    /// GET a page (following redirects) and return its status and body
    async fn get_text(&self, url: &str, limit: Duration) -> Result<PageResponse>;

    /// GET a file and hand back its body as a stream of chunk sizes.
    /// `limit` bounds the wait for the response head only.
    async fn open_download(&self, url: &str, limit: Duration) -> Result<DownloadResponse>;
}

/// A fetched text page
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

/// An open download; the body has not been read yet
pub struct DownloadResponse {
    pub status: u16,
    /// Sizes of the body chunks as they arrive
    pub chunks: BoxStream<'static, Result<usize>>,
}

/// Settings shared by every request
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    /// Connect timeout applied to every connection
    pub connect_timeout: Duration,
    /// Max number of redirects followed by page and download requests
    pub max_redirects: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            user_agent: platform::pip_user_agent(crate::defaults::FALLBACK_PIP_VERSION, None),
            connect_timeout: crate::defaults::DEFAULT_PROBE_TIMEOUT,
            max_redirects: 10,
        }
    }
}

/// reqwest-backed client with pip-like request headers
pub struct MirrorClient {
    /// Never follows redirects; a 3xx answer counts as a live mirror
    probe_client: Client,
    /// Follows redirects for index pages and file downloads
    fetch_client: Client,
}

impl MirrorClient {
    /// Build the probe and fetch clients
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let headers = Self::default_headers(&settings.user_agent)?;

        let probe_client = Client::builder()
            .default_headers(headers.clone())
            .connect_timeout(settings.connect_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        let fetch_client = Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .redirect(Policy::limited(settings.max_redirects))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { probe_client, fetch_client })
    }

    /// Headers resembling what pip sends to an index
    fn default_headers(user_agent: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| AppError::config(format!("Invalid User-Agent '{}': {}", user_agent, e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        Ok(headers)
    }
}

#[async_trait]
impl HttpClient for MirrorClient {
    async fn head(&self, url: &str, limit: Duration) -> Result<u16> {
        let response = timeout(limit, self.probe_client.head(url).send())
            .await
            .map_err(|_| AppError::timeout(format!("HEAD {} timed out after {}s", url, limit.as_secs())))??;
        Ok(response.status().as_u16())
    }

    async fn get_text(&self, url: &str, limit: Duration) -> Result<PageResponse> {
        let fetch = async {
            let response = self.fetch_client.get(url).send().await?;
            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let body = response.text().await?;
            Ok::<_, AppError>(PageResponse { status, final_url, body })
        };

        timeout(limit, fetch)
            .await
            .map_err(|_| AppError::timeout(format!("GET {} timed out after {}s", url, limit.as_secs())))?
    }

    async fn open_download(&self, url: &str, limit: Duration) -> Result<DownloadResponse> {
        let response = timeout(limit, self.fetch_client.get(url).send())
            .await
            .map_err(|_| AppError::timeout(format!("GET {} timed out after {}s", url, limit.as_secs())))??;

        let status = response.status().as_u16();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.len()).map_err(AppError::from))
            .boxed();

        Ok(DownloadResponse { status, chunks })
    }
}
