//! Article page: derived metadata and the fallback state.

use serde::Serialize;
use tracing::warn;

use crate::cms::ContentSource;
use crate::config::CmsConfig;
use crate::dates::format_article_date;
use crate::types::Article;
use crate::{Error, Result};

pub const WORDS_PER_MINUTE: usize = 200;

fn words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words across every block heading and every body fragment's text.
pub fn count_words(article: &Article) -> usize {
    article
        .content
        .iter()
        .map(|block| {
            words(&block.heading) + block.body.iter().map(|f| words(&f.text)).sum::<usize>()
        })
        .sum()
}

/// Minutes to read at 200 words per minute, rounded up. An empty article is 0.
pub fn compute_read_time(article: &Article) -> u32 {
    read_time_for(count_words(article))
}

pub fn read_time_for(total_words: usize) -> u32 {
    total_words.div_ceil(WORDS_PER_MINUTE) as u32
}

pub fn format_publication_date(article: &Article) -> Result<String> {
    article
        .first_publication_date
        .as_ref()
        .map(format_article_date)
        .ok_or(Error::MissingPublicationDate)
}

/// An article with everything the page shows next to it.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub article: Article,
    pub read_time: u32,
    pub published: Option<String>,
}

impl ArticleView {
    pub fn new(article: Article) -> Self {
        let read_time = compute_read_time(&article);
        let published = match format_publication_date(&article) {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("Article {} rendered without a date: {}", article.uid, e);
                None
            }
        };
        Self {
            article,
            read_time,
            published,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ArticlePage {
    /// Data is still being resolved; render the placeholder only.
    Fallback,
    Ready(ArticleView),
}

impl ArticlePage {
    pub fn resolve(article: Option<Article>) -> Self {
        match article {
            Some(article) => ArticlePage::Ready(ArticleView::new(article)),
            None => ArticlePage::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ArticlePage::Fallback)
    }
}

pub async fn load_article<S>(source: &S, config: &CmsConfig, uid: &str) -> Result<Article>
where
    S: ContentSource + ?Sized,
{
    let doc = source.fetch_by_uid(&config.document_type, uid).await?;
    Article::try_from(doc)
}
