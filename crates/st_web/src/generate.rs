//! Static generation: article paths, single article pages, and the full
//! site written to disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use st_core::article::{load_article, ArticlePage};
use st_core::config::MAX_PAGE_SIZE;
use st_core::listing::{load_initial_listing, ListingController};
use st_core::{CmsConfig, ContentSource, Result};
use st_render::PageRenderer;
use tracing::{info, warn};

/// Every article uid, walking all pages of the document type.
pub async fn static_paths<S>(source: &S, config: &CmsConfig) -> Result<Vec<String>>
where
    S: ContentSource + ?Sized,
{
    let walk = config.clone().with_page_size(MAX_PAGE_SIZE);
    let listing = load_initial_listing(source, &walk).await?;
    listing.load_all(source).await?;

    let mut seen = HashSet::new();
    Ok(listing
        .entries()
        .into_iter()
        .map(|entry| entry.summary.uid)
        .filter(|uid| !uid.is_empty() && seen.insert(uid.clone()))
        .collect())
}

pub async fn generate_article_page<S>(
    source: &S,
    renderer: &PageRenderer,
    config: &CmsConfig,
    uid: &str,
) -> Result<String>
where
    S: ContentSource + ?Sized,
{
    let article = load_article(source, config, uid).await?;
    renderer.render_article(&ArticlePage::resolve(Some(article)))
}

/// Uids become directory names, so only plain slugs are written.
fn is_safe_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid != "."
        && uid != ".."
        && uid
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub listing_pages: usize,
    pub articles: usize,
    pub failures: Vec<(String, String)>,
}

async fn write_page(path: PathBuf, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, html).await?;
    Ok(())
}

fn listing_path(out_dir: &Path, page: u32) -> PathBuf {
    if page <= 1 {
        out_dir.join("index.html")
    } else {
        out_dir.join("page").join(page.to_string()).join("index.html")
    }
}

async fn write_listing(
    listing: &ListingController,
    renderer: &PageRenderer,
    out_dir: &Path,
) -> Result<()> {
    let page = listing.current_page();
    let load_more = listing
        .has_more()
        .then(|| format!("/page/{}/", page + 1));
    let html = renderer.render_listing(&listing.entries(), load_more.as_deref())?;
    write_page(listing_path(out_dir, page), &html).await
}

/// Writes `index.html`, one `page/{n}/index.html` per continuation page
/// (each holding everything loaded so far), and `post/{uid}/index.html`
/// per article. Article failures are reported, not fatal.
pub async fn build_site<S>(
    source: &S,
    renderer: &PageRenderer,
    config: &CmsConfig,
    out_dir: &Path,
) -> Result<BuildReport>
where
    S: ContentSource + ?Sized,
{
    let mut report = BuildReport::default();

    let listing = load_initial_listing(source, config).await?;
    write_listing(&listing, renderer, out_dir).await?;
    report.listing_pages += 1;
    while listing.load_pages(source, 1).await? == 1 {
        write_listing(&listing, renderer, out_dir).await?;
        report.listing_pages += 1;
    }
    info!("🗂️ Wrote {} listing pages", report.listing_pages);

    for uid in static_paths(source, config).await? {
        if !is_safe_uid(&uid) {
            warn!("Skipping article with unusable uid {:?}", uid);
            report.failures.push((uid, "unsafe uid".to_string()));
            continue;
        }
        match generate_article_page(source, renderer, config, &uid).await {
            Ok(html) => {
                let path = out_dir.join("post").join(&uid).join("index.html");
                write_page(path, &html).await?;
                report.articles += 1;
            }
            Err(e) => {
                warn!("Failed to generate {}: {}", uid, e);
                report.failures.push((uid, e.to_string()));
            }
        }
    }
    info!("📰 Wrote {} articles", report.articles);

    Ok(report)
}
