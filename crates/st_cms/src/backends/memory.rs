use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use st_core::types::{ApiPage, ArticleData, Document, SummaryData, SummaryPage};
use st_core::{ContentSource, Error, PageFetcher, Result};
use tokio::sync::RwLock;
use url::Url;

const SCHEME: &str = "memory";

/// A document tagged with its custom type, as stored in fixture files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "type")]
    pub document_type: String,
    #[serde(flatten)]
    pub document: Document<ArticleData>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Vec<StoredDocument>,
}

impl MemoryStore {
    pub fn insert(&mut self, document_type: &str, document: Document<ArticleData>) {
        let uid = document.uid.clone();
        if let Some(existing) = self
            .documents
            .iter_mut()
            .find(|d| d.document_type == document_type && uid.is_some() && d.document.uid == uid)
        {
            existing.document = document;
        } else {
            self.documents.push(StoredDocument {
                document_type: document_type.to_string(),
                document,
            });
        }
    }

    fn of_type<'a>(&'a self, document_type: &'a str) -> impl Iterator<Item = &'a StoredDocument> + 'a {
        self.documents
            .iter()
            .filter(move |d| d.document_type == document_type)
    }

    fn page(&self, document_type: &str, page: u32, page_size: u32) -> SummaryPage {
        let total = self.of_type(document_type).count() as u32;
        let total_pages = total.div_ceil(page_size);
        // Client tokens may point far past the end; an offset that overflows
        // yields an empty page.
        let skip = (page - 1)
            .checked_mul(page_size)
            .and_then(|offset| usize::try_from(offset).ok())
            .unwrap_or(usize::MAX);

        let results = self
            .of_type(document_type)
            .skip(skip)
            .take(page_size as usize)
            .map(|d| Document {
                uid: d.document.uid.clone(),
                first_publication_date: d.document.first_publication_date.clone(),
                data: SummaryData {
                    title: d.document.data.title.clone(),
                    subtitle: d.document.data.subtitle.clone(),
                    author: d.document.data.author.clone(),
                },
            })
            .collect();

        let link = |p: u32| format!("{SCHEME}://{document_type}?page={p}&pageSize={page_size}");
        ApiPage {
            page,
            results_per_page: page_size,
            total_results_size: total,
            total_pages,
            next_page: (page < total_pages).then(|| link(page + 1)),
            prev_page: (page > 1).then(|| link(page - 1)),
            results,
        }
    }
}

/// In-process content source, paging with `memory://{type}?page=N&pageSize=M` tokens.
#[derive(Clone, Default)]
pub struct MemoryCms {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryCms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<StoredDocument>) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore { documents })),
        }
    }

    /// Loads a JSON array of documents, each carrying its `type`.
    pub async fn from_fixture(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let documents: Vec<StoredDocument> = serde_json::from_str(&raw)?;
        Ok(Self::from_documents(documents))
    }

    pub async fn insert(&self, document_type: &str, document: Document<ArticleData>) {
        self.store.write().await.insert(document_type, document);
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn parse_token(token: &str) -> Result<(String, u32, u32)> {
    let invalid = || Error::InvalidUrl(token.to_string());
    let url = Url::parse(token).map_err(|_| invalid())?;
    if url.scheme() != SCHEME {
        return Err(invalid());
    }
    let document_type = url.host_str().ok_or_else(invalid)?.to_string();

    let mut page = None;
    let mut page_size = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "page" => page = value.parse::<u32>().ok(),
            "pageSize" => page_size = value.parse::<u32>().ok(),
            _ => {}
        }
    }
    match (page, page_size) {
        (Some(page), Some(page_size)) if page > 0 && page_size > 0 => Ok((document_type, page, page_size)),
        _ => Err(invalid()),
    }
}

#[async_trait]
impl PageFetcher for MemoryCms {
    async fn fetch_page(&self, next_page: &str) -> Result<SummaryPage> {
        let (document_type, page, page_size) = parse_token(next_page)?;
        Ok(self.store.read().await.page(&document_type, page, page_size))
    }
}

#[async_trait]
impl ContentSource for MemoryCms {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_by_type(&self, document_type: &str, page_size: u32) -> Result<SummaryPage> {
        if page_size == 0 {
            return Err(Error::Config("page size must be positive".to_string()));
        }
        Ok(self.store.read().await.page(document_type, 1, page_size))
    }

    async fn fetch_by_uid(&self, document_type: &str, uid: &str) -> Result<Document<ArticleData>> {
        self.store
            .read()
            .await
            .of_type(document_type)
            .find(|d| d.document.uid.as_deref() == Some(uid))
            .map(|d| d.document.clone())
            .ok_or_else(|| Error::NotFound(format!("{document_type}/{uid}")))
    }
}
