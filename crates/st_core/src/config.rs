use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Prismic caps `pageSize` at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    /// API entry point, e.g. `https://spacetraveling.cdn.prismic.io/api/v2`.
    pub api_endpoint: Option<String>,
    pub access_token: Option<String>,
    pub document_type: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    /// Serve documents from a JSON fixture instead of a live repository.
    pub offline_fixture: Option<PathBuf>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            access_token: None,
            document_type: "home".to_string(),
            page_size: 1,
            timeout_secs: 10,
            offline_fixture: None,
        }
    }
}

impl CmsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = document_type.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = self
            .api_endpoint
            .as_deref()
            .ok_or_else(|| Error::Config("no API endpoint configured".to_string()))?;
        Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.document_type.trim().is_empty() {
            return Err(Error::Config("document type must not be empty".to_string()));
        }
        // Custom type ids are spliced into `my.{type}.uid` predicates.
        if !self
            .document_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        {
            return Err(Error::Config(format!(
                "invalid document type {:?}",
                self.document_type
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.offline_fixture.is_none() {
            self.endpoint_url()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub site_name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "Spacetraveling".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_listing_page() {
        let config = CmsConfig::default();
        assert_eq!(config.document_type, "home");
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn test_validate() {
        assert!(CmsConfig::new().validate().is_err());
        assert!(CmsConfig::new()
            .with_endpoint("https://spacetraveling.cdn.prismic.io/api/v2")
            .validate()
            .is_ok());
        assert!(CmsConfig::new()
            .with_endpoint("not a url")
            .validate()
            .is_err());
        assert!(CmsConfig::new()
            .with_endpoint("https://example.com/api/v2")
            .with_page_size(0)
            .validate()
            .is_err());
        assert!(CmsConfig::new()
            .with_endpoint("https://example.com/api/v2")
            .with_page_size(101)
            .validate()
            .is_err());
        assert!(CmsConfig::new()
            .with_endpoint("https://example.com/api/v2")
            .with_document_type("home.uid,\"x\")]]")
            .validate()
            .is_err());
        assert!(CmsConfig::new()
            .with_endpoint("https://example.com/api/v2")
            .with_document_type("blog_post")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_offline_needs_no_endpoint() {
        let config = CmsConfig {
            offline_fixture: Some(PathBuf::from("fixture.json")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
