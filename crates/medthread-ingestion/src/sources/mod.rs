//! Literature source clients.

pub mod pubmed;

use async_trait::async_trait;
use medthread_common::SelectionMode;

use crate::models::{ArticleId, ArticleRecord};

/// Search window and selection policy for one locate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateParams {
    /// Articles published in `[current_year - lookback_years, current_year]`.
    pub lookback_years: u32,
    pub max_results: usize,
    pub mode: SelectionMode,
}

impl Default for LocateParams {
    fn default() -> Self {
        Self { lookback_years: 5, max_results: 10, mode: SelectionMode::All }
    }
}

/// Common interface for literature source clients.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Find recent articles for a search term.
    ///
    /// An empty vector covers both "no hits" and "upstream answered with a
    /// non-success status"; `Err` is reserved for transport and decoding
    /// failures.
    async fn locate(
        &self,
        term: &str,
        params: &LocateParams,
    ) -> anyhow::Result<Vec<ArticleId>>;

    /// Fetch records for `ids` in one request; output follows the order of `ids`.
    async fn resolve(
        &self,
        ids: &[ArticleId],
    ) -> anyhow::Result<Vec<ArticleRecord>>;

    /// Single-id form of [`LiteratureSource::resolve`].
    async fn resolve_one(
        &self,
        id: &ArticleId,
    ) -> anyhow::Result<Option<ArticleRecord>> {
        Ok(self.resolve(std::slice::from_ref(id)).await?.into_iter().next())
    }
}
