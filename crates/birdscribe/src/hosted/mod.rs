//! Hosted backend: a storage API and a PostgREST-style table API reached
//! over HTTP with a project URL and API key.

pub mod bucket;
pub mod tables;

use reqwest::{Client, RequestBuilder, Response};
use tracing::trace;

use crate::error::{Error, Result};

pub use bucket::HostedBucket;
pub use tables::HostedTables;

/// Shared HTTP client for one hosted project.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct HostedClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HostedClient {
    /// Create a client for the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("birdscribe/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Project base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL used to write or read an object through the storage API.
    #[must_use]
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{key}", self.base_url)
    }

    /// Public URL of an object in a public bucket.
    #[must_use]
    pub fn public_object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{key}", self.base_url)
    }

    /// URL of a table in the REST API.
    #[must_use]
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Attach the project key as both `apikey` and bearer token.
    pub(crate) fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Turn a non-success response into [`Error::HostedStatus`].
    pub(crate) async fn check(response: Response, endpoint: &str) -> Result<Response> {
        let status = response.status();
        trace!(status = status.as_u16(), endpoint, "Hosted response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(Error::HostedStatus {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body,
        })
    }
}

impl std::fmt::Debug for HostedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
