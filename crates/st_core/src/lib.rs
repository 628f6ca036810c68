pub mod article;
pub mod cms;
pub mod config;
pub mod dates;
pub mod error;
pub mod listing;
pub mod types;

pub use article::{compute_read_time, ArticlePage, ArticleView};
pub use cms::{ContentSource, PageFetcher};
pub use config::{CmsConfig, SiteConfig};
pub use error::{Error, Result};
pub use listing::{ListingController, LoadOutcome, PaginationState};
pub use types::{
    ApiPage, Article, ArticleData, ArticleSummary, ContentBlock, Document, ListingEntry,
    RichTextFragment, SummaryData, SummaryPage,
};

pub mod prelude {
    pub use super::{Article, ContentSource, Error, ListingController, PageFetcher, Result};
}
