use async_trait::async_trait;

use crate::types::{ArticleData, Document, SummaryPage};
use crate::Result;

/// Fetches a continuation page from the opaque `next_page` token.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, next_page: &str) -> Result<SummaryPage>;
}

/// The CMS query interface both pages depend on.
#[async_trait]
pub trait ContentSource: PageFetcher {
    /// Returns the name of the backend
    fn name(&self) -> &str;

    /// First page of documents of the given type
    async fn fetch_by_type(&self, document_type: &str, page_size: u32) -> Result<SummaryPage>;

    /// A single document by its uid
    async fn fetch_by_uid(&self, document_type: &str, uid: &str) -> Result<Document<ArticleData>>;
}
