use async_trait::async_trait;
use readcal_core::{Chapter, CountCandidate, ProviderError, Work};

/// A source of manga metadata.
///
/// Implementations map source-native records onto the shared model and fold
/// every failure into [`ProviderError`].
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short identifier used in work references, e.g. `"anilist"`.
    fn name(&self) -> &'static str;

    /// Whether this source's chapter data is too sparse to use directly.
    /// When true the engine synthesizes chapters even if some were returned.
    fn chapter_data_poor(&self) -> bool {
        false
    }

    async fn search(&self, query: &str) -> Result<Vec<Work>, ProviderError>;

    async fn fetch_details(&self, source_id: &str) -> Result<Work, ProviderError>;

    /// Chapters in ascending number order. May be empty.
    async fn fetch_chapters(&self, source_id: &str) -> Result<Vec<Chapter>, ProviderError>;

    /// Recently updated or currently publishing works.
    async fn fetch_latest(&self) -> Result<Vec<Work>, ProviderError>;
}

/// A source that can report chapter and volume totals for a title.
///
/// `Ok(None)` means the source has nothing useful for this title.
#[async_trait]
pub trait CountProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn count(&self, title: &str) -> Result<Option<CountCandidate>, ProviderError>;
}
