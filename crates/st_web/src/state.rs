use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use st_core::{CmsConfig, ContentSource, Result};
use st_render::PageRenderer;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use url::Url;

use crate::generate::{generate_article_page, static_paths};

/// Seconds the fallback page waits before reloading itself.
pub const DEFAULT_REFRESH_SECS: u32 = 1;

/// Most `Missing`/`Failed` slots kept at once; the oldest are evicted first.
pub const MAX_NEGATIVE_SLOTS: usize = 256;

#[derive(Debug, Clone)]
pub enum PageSlot {
    Generating,
    Ready(Arc<String>),
    Missing,
    /// Generation failed; reported once, then retried on the next request.
    Failed(String),
}

impl PageSlot {
    fn is_negative(&self) -> bool {
        matches!(self, PageSlot::Missing | PageSlot::Failed(_))
    }
}

#[derive(Debug, Default)]
struct PageCache {
    slots: HashMap<String, PageSlot>,
    negative: VecDeque<String>,
}

impl PageCache {
    fn insert(&mut self, uid: &str, slot: PageSlot) {
        if slot.is_negative() {
            self.negative.push_back(uid.to_string());
            while self.negative.len() > MAX_NEGATIVE_SLOTS {
                if let Some(oldest) = self.negative.pop_front() {
                    if self.slots.get(&oldest).is_some_and(PageSlot::is_negative)
                        && !self.negative.contains(&oldest)
                    {
                        self.slots.remove(&oldest);
                    }
                }
            }
        }
        self.slots.insert(uid.to_string(), slot);
    }
}

pub struct AppState {
    pub source: Arc<dyn ContentSource>,
    pub renderer: Arc<PageRenderer>,
    pub config: CmsConfig,
    pub refresh_secs: u32,
    pages: RwLock<PageCache>,
}

impl AppState {
    pub fn new(source: Arc<dyn ContentSource>, renderer: Arc<PageRenderer>, config: CmsConfig) -> Self {
        Self {
            source,
            renderer,
            config,
            refresh_secs: DEFAULT_REFRESH_SECS,
            pages: RwLock::new(PageCache::default()),
        }
    }

    pub async fn page_slot(&self, uid: &str) -> Option<PageSlot> {
        self.pages.read().await.slots.get(uid).cloned()
    }

    /// Number of uids with a cached slot of any kind.
    pub async fn cached_pages(&self) -> usize {
        self.pages.read().await.slots.len()
    }

    /// Starts generating `uid` in the background unless a page or a
    /// generation for it already exists. Returns the slot as it stands.
    /// A `Failed` slot is handed out once and cleared so a later request
    /// tries again.
    pub async fn request_page(self: &Arc<Self>, uid: &str) -> PageSlot {
        let mut pages = self.pages.write().await;
        if matches!(pages.slots.get(uid), Some(PageSlot::Failed(_))) {
            if let Some(slot) = pages.slots.remove(uid) {
                return slot;
            }
        }
        if let Some(slot) = pages.slots.get(uid) {
            return slot.clone();
        }
        pages.insert(uid, PageSlot::Generating);
        drop(pages);

        let state = Arc::clone(self);
        let uid = uid.to_string();
        tokio::spawn(async move {
            state.generate(&uid).await;
        });
        PageSlot::Generating
    }

    async fn generate(&self, uid: &str) {
        let result =
            generate_article_page(self.source.as_ref(), &self.renderer, &self.config, uid).await;

        let mut pages = self.pages.write().await;
        match result {
            Ok(html) => {
                info!("📄 Generated /post/{}", uid);
                pages.insert(uid, PageSlot::Ready(Arc::new(html)));
            }
            Err(e) if e.is_not_found() => {
                warn!("No article for /post/{}", uid);
                pages.insert(uid, PageSlot::Missing);
            }
            Err(e) => {
                error!("Failed to generate /post/{}: {}", uid, e);
                pages.insert(uid, PageSlot::Failed(e.to_string()));
            }
        }
    }

    /// Generates every known article ahead of the first request.
    pub async fn prerender(&self) -> Result<usize> {
        let uids = static_paths(self.source.as_ref(), &self.config).await?;
        for uid in &uids {
            self.pages.write().await.insert(uid, PageSlot::Generating);
            self.generate(uid).await;
        }
        Ok(uids.len())
    }

    /// Continuation tokens must point back at the configured backend.
    pub fn is_trusted_token(&self, token: &str) -> bool {
        let Ok(url) = Url::parse(token) else {
            return false;
        };
        if self.source.name() == "memory" {
            return url.scheme() == "memory";
        }
        match self.config.endpoint_url() {
            Ok(endpoint) => {
                matches!(url.scheme(), "http" | "https")
                    && url.host_str() == endpoint.host_str()
                    && url.port_or_known_default() == endpoint.port_or_known_default()
            }
            Err(_) => false,
        }
    }
}
