//! Annotation providers.
//!
//! An annotation is the species description and analysis text shown next to
//! a preview. Annotation is best-effort: failures are logged and leave the
//! corresponding half empty, they never fail the capture workflow.

pub mod seed;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::records::{AnalysisResponse, BirdDescription};
use crate::storage::AnnotationStore;

/// Description and analysis for one capture; either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Species description, if one could be fetched.
    pub description: Option<BirdDescription>,
    /// Analysis text, if one could be fetched.
    pub analysis: Option<AnalysisResponse>,
}

/// Supplies annotations for captured images.
#[async_trait]
pub trait AnnotationProvider: Send + Sync {
    /// Name of the strategy (for logging).
    fn name(&self) -> &'static str;

    /// Produce an annotation. Never fails; missing data is `None`.
    async fn annotation(&self) -> Annotation;
}

/// Always returns the same description and analysis.
#[derive(Debug, Clone)]
pub struct ConstantAnnotations {
    annotation: Annotation,
}

impl ConstantAnnotations {
    /// Create the constant provider.
    #[must_use]
    pub fn new() -> Self {
        let created_at = Utc::now();
        let description = seed::SEED_DESCRIPTIONS
            .iter()
            .find(|(name, _)| *name == seed::CONSTANT_BIRD_NAME)
            .map_or("", |(_, text)| *text);

        Self {
            annotation: Annotation {
                description: Some(BirdDescription {
                    id: Uuid::from_u128(1),
                    bird_name: seed::CONSTANT_BIRD_NAME.to_string(),
                    description: description.to_string(),
                    created_at,
                }),
                analysis: Some(AnalysisResponse {
                    id: Uuid::from_u128(1),
                    response: seed::CONSTANT_RESPONSE.to_string(),
                    created_at,
                }),
            },
        }
    }
}

impl Default for ConstantAnnotations {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnnotationProvider for ConstantAnnotations {
    fn name(&self) -> &'static str {
        "constant"
    }

    async fn annotation(&self) -> Annotation {
        self.annotation.clone()
    }
}

/// Rows inserted by one seeding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Description rows inserted (0 if the table was already populated).
    pub descriptions: usize,
    /// Response rows inserted (0 if the table was already populated).
    pub responses: usize,
}

/// Seed the description table if it is empty.
///
/// # Errors
///
/// Returns [`Error::AnnotationFetch`] if counting or inserting fails.
pub async fn seed_descriptions_if_empty(
    store: &dyn AnnotationStore,
    seeded_at: DateTime<Utc>,
) -> Result<usize> {
    let count = store
        .count_descriptions()
        .await
        .map_err(|e| Error::annotation_fetch("bird_descriptions", e.to_string()))?;
    if count > 0 {
        debug!(count, "bird_descriptions already populated");
        return Ok(0);
    }

    let rows = seed::seed_descriptions(seeded_at);
    store
        .insert_descriptions(&rows)
        .await
        .map_err(|e| Error::annotation_fetch("bird_descriptions", e.to_string()))?;
    info!(rows = rows.len(), "Seeded bird_descriptions");
    Ok(rows.len())
}

/// Seed the response table if it is empty.
///
/// # Errors
///
/// Returns [`Error::AnnotationFetch`] if counting or inserting fails.
pub async fn seed_responses_if_empty(
    store: &dyn AnnotationStore,
    seeded_at: DateTime<Utc>,
) -> Result<usize> {
    let count = store
        .count_responses()
        .await
        .map_err(|e| Error::annotation_fetch("responses", e.to_string()))?;
    if count > 0 {
        debug!(count, "responses already populated");
        return Ok(0);
    }

    let rows = seed::seed_responses(seeded_at);
    store
        .insert_responses(&rows)
        .await
        .map_err(|e| Error::annotation_fetch("responses", e.to_string()))?;
    info!(rows = rows.len(), "Seeded responses");
    Ok(rows.len())
}

/// Which tables have been confirmed populated.
#[derive(Debug, Default)]
struct SeedState {
    descriptions: bool,
    responses: bool,
}

/// Picks a random description and response from the backing tables,
/// seeding them on first use.
pub struct RandomAnnotations {
    store: Arc<dyn AnnotationStore>,
    seeded: Mutex<SeedState>,
}

impl RandomAnnotations {
    /// Create a provider over `store`. Nothing is read until first use.
    #[must_use]
    pub fn new(store: Arc<dyn AnnotationStore>) -> Self {
        Self {
            store,
            seeded: Mutex::new(SeedState::default()),
        }
    }

    /// Seed whichever tables are still empty.
    ///
    /// A table that was seeded or found populated is not checked again; a
    /// failed table is retried on the next call.
    ///
    /// # Errors
    ///
    /// Returns the first seeding failure; the other table is still attempted.
    pub async fn ensure_seeded(&self) -> Result<SeedReport> {
        let mut state = self.seeded.lock().await;
        let seeded_at = Utc::now();
        let mut report = SeedReport::default();
        let mut first_error = None;

        if !state.descriptions {
            match seed_descriptions_if_empty(self.store.as_ref(), seeded_at).await {
                Ok(n) => {
                    report.descriptions = n;
                    state.descriptions = true;
                }
                Err(e) => first_error = Some(e),
            }
        }

        if !state.responses {
            match seed_responses_if_empty(self.store.as_ref(), seeded_at).await {
                Ok(n) => {
                    report.responses = n;
                    state.responses = true;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

impl std::fmt::Debug for RandomAnnotations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomAnnotations").finish_non_exhaustive()
    }
}

#[async_trait]
impl AnnotationProvider for RandomAnnotations {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn annotation(&self) -> Annotation {
        if let Err(e) = self.ensure_seeded().await {
            warn!(error = %e, "Annotation seeding failed");
        }

        let description = match self.store.random_description().await {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "Failed to fetch bird description");
                None
            }
        };

        let analysis = match self.store.random_response().await {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "Failed to fetch analysis response");
                None
            }
        };

        Annotation {
            description,
            analysis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{NewAnalysisResponse, NewBirdDescription};
    use crate::storage::Storage;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose response table is broken and whose description inserts
    /// fail a configurable number of times.
    struct FlakyStore {
        inner: Storage,
        description_insert_failures: AtomicUsize,
    }

    impl FlakyStore {
        fn new(description_insert_failures: usize) -> Self {
            Self {
                inner: Storage::open_in_memory().unwrap(),
                description_insert_failures: AtomicUsize::new(description_insert_failures),
            }
        }
    }

    #[async_trait]
    impl AnnotationStore for FlakyStore {
        async fn count_descriptions(&self) -> Result<u64> {
            self.inner.count_descriptions().await
        }

        async fn insert_descriptions(&self, rows: &[NewBirdDescription]) -> Result<()> {
            let remaining = self.description_insert_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.description_insert_failures
                    .store(remaining - 1, Ordering::SeqCst);
                return Err(Error::internal("insert timed out"));
            }
            self.inner.insert_descriptions(rows).await
        }

        async fn random_description(&self) -> Result<Option<BirdDescription>> {
            self.inner.random_description().await
        }

        async fn count_responses(&self) -> Result<u64> {
            Err(Error::internal("relation \"responses\" does not exist"))
        }

        async fn insert_responses(&self, _: &[NewAnalysisResponse]) -> Result<()> {
            Err(Error::internal("relation \"responses\" does not exist"))
        }

        async fn random_response(&self) -> Result<Option<AnalysisResponse>> {
            Err(Error::internal("relation \"responses\" does not exist"))
        }
    }

    fn memory_store() -> Arc<Storage> {
        Arc::new(Storage::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_constant_annotation() {
        let provider = ConstantAnnotations::new();
        let first = provider.annotation().await;
        let second = provider.annotation().await;

        assert_eq!(first, second);
        assert_eq!(
            first.description.unwrap().bird_name,
            seed::CONSTANT_BIRD_NAME
        );
        assert_eq!(first.analysis.unwrap().response, seed::CONSTANT_RESPONSE);
    }

    #[tokio::test]
    async fn test_random_seeds_on_first_use() {
        let store = memory_store();
        let provider = RandomAnnotations::new(store.clone());

        let annotation = provider.annotation().await;
        assert!(annotation.description.is_some());
        assert!(annotation.analysis.is_some());
        assert_eq!(store.count_descriptions().await.unwrap(), 5);
        assert_eq!(store.count_responses().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let store = memory_store();

        let first = RandomAnnotations::new(store.clone());
        let report = first.ensure_seeded().await.unwrap();
        assert_eq!(report, SeedReport { descriptions: 5, responses: 3 });

        // A fresh provider sees populated tables and inserts nothing.
        let second = RandomAnnotations::new(store.clone());
        assert_eq!(second.ensure_seeded().await.unwrap(), SeedReport::default());
        assert_eq!(second.ensure_seeded().await.unwrap(), SeedReport::default());

        assert_eq!(store.count_descriptions().await.unwrap(), 5);
        assert_eq!(store.count_responses().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_seed_skips_populated_table() {
        let store = memory_store();
        store
            .insert_descriptions(&[NewBirdDescription {
                bird_name: "Osprey".to_string(),
                description: "Fish hawk.".to_string(),
                created_at: Utc::now(),
            }])
            .await
            .unwrap();

        let report = RandomAnnotations::new(store.clone())
            .ensure_seeded()
            .await
            .unwrap();
        assert_eq!(report.descriptions, 0);
        assert_eq!(report.responses, 3);
        assert_eq!(store.count_descriptions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_random_selection_covers_every_row() {
        let store = memory_store();
        let provider = RandomAnnotations::new(store.clone());

        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            if let Some(description) = provider.annotation().await.description {
                seen.insert(description.bird_name);
            }
        }

        assert_eq!(seen.len(), seed::SEED_DESCRIPTIONS.len());
        for (name, _) in seed::SEED_DESCRIPTIONS {
            assert!(seen.contains(*name), "{name} never selected");
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_partial_annotation() {
        let provider = RandomAnnotations::new(Arc::new(FlakyStore::new(0)));

        let annotation = provider.annotation().await;
        assert!(annotation.description.is_some());
        assert!(annotation.analysis.is_none());
    }

    #[tokio::test]
    async fn test_failed_seed_is_retried() {
        let store = Arc::new(FlakyStore::new(1));
        let provider = RandomAnnotations::new(store.clone());

        let first = provider.annotation().await;
        assert!(first.description.is_none());

        let second = provider.annotation().await;
        assert!(second.description.is_some());
        assert_eq!(store.count_descriptions().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_ensure_seeded_reports_failure() {
        let provider = RandomAnnotations::new(Arc::new(FlakyStore::new(0)));
        let err = provider.ensure_seeded().await.unwrap_err();
        assert!(matches!(err, Error::AnnotationFetch { table: "responses", .. }));
    }
}
