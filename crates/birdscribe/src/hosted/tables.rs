//! REST table API for `uploads`, `bird_descriptions` and `responses`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::HostedClient;
use crate::error::{Error, Result};
use crate::records::{
    AnalysisResponse, BirdDescription, NewAnalysisResponse, NewBirdDescription, NewUpload,
    UploadRecord,
};
use crate::storage::{AnnotationStore, UploadStore};

const UPLOADS: &str = "uploads";
const DESCRIPTIONS: &str = "bird_descriptions";
const RESPONSES: &str = "responses";

/// Tables of a hosted project.
#[derive(Debug, Clone)]
pub struct HostedTables {
    client: HostedClient,
}

/// Total from a `Content-Range` header such as `0-0/5` or `*/0`.
fn content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

impl HostedTables {
    /// Use the tables of the project behind `client`.
    #[must_use]
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let url = self.client.table_url(table);
        let request = self.client.http().get(&url).query(query);
        let response = self.client.authorized(request).send().await?;
        let response = HostedClient::check(response, &url).await?;
        Ok(response.json().await?)
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>> {
        let url = self.client.table_url(table);
        let request = self
            .client
            .http()
            .post(&url)
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.client.authorized(request).send().await?;
        let response = HostedClient::check(response, &url).await?;
        Ok(response.json().await?)
    }

    async fn insert_minimal<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<()> {
        let url = self.client.table_url(table);
        let request = self
            .client
            .http()
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(body);
        let response = self.client.authorized(request).send().await?;
        HostedClient::check(response, &url).await?;
        Ok(())
    }

    async fn count(&self, table: &str) -> Result<u64> {
        let url = self.client.table_url(table);
        let request = self
            .client
            .http()
            .get(&url)
            .header("Prefer", "count=exact")
            .query(&[("select", "id"), ("limit", "1")]);
        let response = self.client.authorized(request).send().await?;
        let response = HostedClient::check(response, &url).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total)
            .ok_or_else(|| Error::internal(format!("{url} returned no row count")))
    }

    /// One row picked uniformly: count, then fetch at a random offset.
    async fn random<T: DeserializeOwned>(&self, table: &str) -> Result<Option<T>> {
        let total = self.count(table).await?;
        if total == 0 {
            return Ok(None);
        }

        let offset = fastrand::u64(..total);
        debug!(table, total, offset, "Selecting random row");
        let rows: Vec<T> = self
            .select(
                table,
                &[
                    ("select", "*".to_string()),
                    ("order", "id.asc".to_string()),
                    ("offset", offset.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl UploadStore for HostedTables {
    async fn insert_upload(&self, upload: &NewUpload) -> Result<UploadRecord> {
        let rows: Vec<UploadRecord> = self.insert(UPLOADS, upload).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::internal("insert into uploads returned no row"))
    }

    async fn list_uploads(&self) -> Result<Vec<UploadRecord>> {
        self.select(
            UPLOADS,
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn get_upload(&self, id: Uuid) -> Result<Option<UploadRecord>> {
        let rows: Vec<UploadRecord> = self
            .select(
                UPLOADS,
                &[("select", "*".to_string()), ("id", format!("eq.{id}"))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn count_uploads(&self) -> Result<u64> {
        self.count(UPLOADS).await
    }
}

#[async_trait]
impl AnnotationStore for HostedTables {
    async fn count_descriptions(&self) -> Result<u64> {
        self.count(DESCRIPTIONS).await
    }

    async fn insert_descriptions(&self, rows: &[NewBirdDescription]) -> Result<()> {
        self.insert_minimal(DESCRIPTIONS, rows).await
    }

    async fn random_description(&self) -> Result<Option<BirdDescription>> {
        self.random(DESCRIPTIONS).await
    }

    async fn count_responses(&self) -> Result<u64> {
        self.count(RESPONSES).await
    }

    async fn insert_responses(&self, rows: &[NewAnalysisResponse]) -> Result<()> {
        self.insert_minimal(RESPONSES, rows).await
    }

    async fn random_response(&self) -> Result<Option<AnalysisResponse>> {
        self.random(RESPONSES).await
    }
}
