use std::sync::Arc;

use st_core::{CmsConfig, ContentSource, Result};
use tracing::info;

pub mod backends;

pub use backends::*;

/// Builds the content source described by `config`: the fixture-backed
/// memory store when one is given, the Prismic API otherwise.
pub async fn create_source(config: &CmsConfig) -> Result<Arc<dyn ContentSource>> {
    config.validate()?;

    if let Some(fixture) = &config.offline_fixture {
        let cms = MemoryCms::from_fixture(fixture).await?;
        info!("📦 Loaded {} documents from {}", cms.len().await, fixture.display());
        return Ok(Arc::new(cms));
    }

    let client = PrismicClient::new(config)?;
    info!("🌐 Using Prismic repository at {}", client.endpoint());
    Ok(Arc::new(client))
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_source;
    pub use st_core::{ContentSource, PageFetcher};
}
