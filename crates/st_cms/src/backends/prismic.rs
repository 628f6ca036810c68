use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use st_core::types::{ApiPage, ArticleData, Document, SummaryPage};
use st_core::{CmsConfig, ContentSource, Error, PageFetcher, Result};
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Prismic REST API v2 client.
pub struct PrismicClient {
    client: Client,
    endpoint: Url,
    access_token: Option<String>,
    master_ref: OnceCell<String>,
}

impl fmt::Debug for PrismicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrismicClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &self.access_token.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PrismicClient {
    pub fn new(config: &CmsConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint,
            access_token: config.access_token.clone(),
            master_ref: OnceCell::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    fn with_token(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        url
    }

    async fn master_ref(&self) -> Result<&str> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async move {
                let info: ApiInfo = self.get_json(self.with_token(self.endpoint.clone())).await?;
                info.refs
                    .into_iter()
                    .find(|r| r.is_master_ref)
                    .map(|r| r.reference)
                    .ok_or_else(|| Error::Config("repository has no master ref".to_string()))
            })
            .await?;
        Ok(reference.as_str())
    }

    fn search_url(&self, master_ref: &str, predicate: &str, page_size: u32) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["documents", "search"]);
        url.query_pairs_mut()
            .append_pair("ref", master_ref)
            .append_pair("q", predicate)
            .append_pair("pageSize", &page_size.to_string());
        Ok(self.with_token(url))
    }
}

/// A predicate string literal, with `"` and `\` escaped.
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[async_trait]
impl PageFetcher for PrismicClient {
    async fn fetch_page(&self, next_page: &str) -> Result<SummaryPage> {
        let url = Url::parse(next_page).map_err(|e| Error::InvalidUrl(format!("{next_page}: {e}")))?;
        self.get_json(url).await
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    fn name(&self) -> &str {
        "prismic"
    }

    async fn fetch_by_type(&self, document_type: &str, page_size: u32) -> Result<SummaryPage> {
        let master_ref = self.master_ref().await?;
        let predicate = format!("[[at(document.type,{})]]", quoted(document_type));
        let url = self.search_url(master_ref, &predicate, page_size)?;
        self.get_json(url).await
    }

    async fn fetch_by_uid(&self, document_type: &str, uid: &str) -> Result<Document<ArticleData>> {
        let master_ref = self.master_ref().await?;
        let predicate = format!("[[at(my.{document_type}.uid,{})]]", quoted(uid));
        let url = self.search_url(master_ref, &predicate, 1)?;
        let page: ApiPage<ArticleData> = self.get_json(url).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("{document_type}/{uid}")))
    }
}
