use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::dates::{format_listing_date, parse_timestamp};
use crate::{Error, Result};

/// A document as the CMS returns it, before any shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    pub data: T,
}

/// The subset of fields the listing needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub banner: Banner,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// Image field. Prismic sends `{}` for an empty image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<RichTextFragment>,
}

/// A structured rich-text node. The system only reads `text` for word
/// counting; everything else is for the rendering delegate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextFragment {
    #[serde(rename = "type", default)]
    pub kind: FragmentKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<serde_json::Value>,
}

impl RichTextFragment {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentKind {
    #[default]
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

/// Inline formatting over `[start, end)` character offsets of the fragment text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// One page of a paginated CMS response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPage<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "zero")]
    pub results_per_page: u32,
    #[serde(default = "zero")]
    pub total_results_size: u32,
    #[serde(default = "zero")]
    pub total_pages: u32,
    #[serde(default = "none")]
    pub next_page: Option<String>,
    #[serde(default = "none")]
    pub prev_page: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<Document<T>>,
}

fn first_page() -> u32 {
    1
}

fn zero() -> u32 {
    0
}

fn none() -> Option<String> {
    None
}

pub type SummaryPage = ApiPage<SummaryData>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl TryFrom<Document<SummaryData>> for ArticleSummary {
    type Error = Error;

    fn try_from(doc: Document<SummaryData>) -> Result<Self> {
        let first_publication_date = doc
            .first_publication_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Self {
            uid: doc.uid.unwrap_or_default(),
            first_publication_date,
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
        })
    }
}

/// A summary whose publication date has been formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingEntry {
    #[serde(flatten)]
    pub summary: ArticleSummary,
    pub published: String,
}

impl ListingEntry {
    pub fn from_document(doc: Document<SummaryData>) -> Result<Self> {
        let summary = ArticleSummary::try_from(doc)?;
        let published = summary
            .first_publication_date
            .as_ref()
            .map(format_listing_date)
            .unwrap_or_default();
        Ok(Self { summary, published })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub content: Vec<ContentBlock>,
}

impl TryFrom<Document<ArticleData>> for Article {
    type Error = Error;

    fn try_from(doc: Document<ArticleData>) -> Result<Self> {
        let first_publication_date = doc
            .first_publication_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Self {
            uid: doc.uid.unwrap_or_default(),
            first_publication_date,
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            banner_url: doc.data.banner.url,
            author: doc.data.author,
            content: doc.data.content,
        })
    }
}
