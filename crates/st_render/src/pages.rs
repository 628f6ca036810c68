//! Full HTML pages rendered through Tera.

use serde::Serialize;
use st_core::article::{ArticlePage, ArticleView};
use st_core::types::{ListingEntry, RichTextFragment};
use st_core::{Error, Result, SiteConfig};
use tera::{Context, Tera};
use tracing::debug;

use crate::richtext::{PrismicHtmlRenderer, RichTextRenderer};
use crate::sanitize::Sanitizer;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("listing.html", include_str!("../templates/listing.html")),
    ("article.html", include_str!("../templates/article.html")),
    ("fallback.html", include_str!("../templates/fallback.html")),
    ("error.html", include_str!("../templates/error.html")),
];

#[derive(Debug, Serialize)]
struct RenderedBlock<'a> {
    heading: &'a str,
    html: String,
}

/// Collect complete error chain as strings
fn collect_error_chain(err: &dyn std::error::Error) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(err) = source {
        chain.push(err.to_string());
        source = err.source();
    }
    chain
}

fn render_error(err: tera::Error) -> Error {
    Error::Render(collect_error_chain(&err).join(": "))
}

pub struct PageRenderer {
    tera: Tera,
    site: SiteConfig,
    rich_text: Box<dyn RichTextRenderer>,
    sanitizer: Sanitizer,
}

impl PageRenderer {
    pub fn new(site: SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .map_err(render_error)?;
        Ok(Self {
            tera,
            site,
            rich_text: Box::new(PrismicHtmlRenderer::new()),
            sanitizer: Sanitizer::default(),
        })
    }

    pub fn with_rich_text(mut self, renderer: impl RichTextRenderer + 'static) -> Self {
        self.rich_text = Box::new(renderer);
        self
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site_name", &self.site.site_name);
        context
    }

    fn render(&self, template: &str, context: &Context) -> Result<String> {
        debug!("Rendering {}", template);
        self.tera.render(template, context).map_err(render_error)
    }

    /// Delegate output, passed through the allow-list.
    pub fn render_body(&self, fragments: &[RichTextFragment]) -> String {
        self.sanitizer.clean(&self.rich_text.as_html(fragments))
    }

    /// `load_more` is the target of the "load more" control; `None` hides it.
    pub fn render_listing(&self, entries: &[ListingEntry], load_more: Option<&str>) -> Result<String> {
        let posts: Vec<_> = entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "uid": entry.summary.uid,
                    "title": entry.summary.title,
                    "subtitle": entry.summary.subtitle,
                    "author": entry.summary.author,
                    "published": entry.published,
                })
            })
            .collect();

        let mut context = self.context();
        context.insert("posts", &posts);
        context.insert("load_more", &load_more);
        self.render("listing.html", &context)
    }

    pub fn render_article(&self, page: &ArticlePage) -> Result<String> {
        match page {
            ArticlePage::Fallback => self.render_fallback(None),
            ArticlePage::Ready(view) => self.render_article_view(view),
        }
    }

    fn render_article_view(&self, view: &ArticleView) -> Result<String> {
        let article = &view.article;
        let blocks: Vec<RenderedBlock<'_>> = article
            .content
            .iter()
            .map(|block| RenderedBlock {
                heading: &block.heading,
                html: self.render_body(&block.body),
            })
            .collect();

        let mut context = self.context();
        context.insert("title", &article.title);
        context.insert("author", &article.author);
        context.insert("banner_url", &article.banner_url);
        context.insert("published", &view.published);
        context.insert("read_time", &view.read_time);
        context.insert("blocks", &blocks);
        self.render("article.html", &context)
    }

    /// The loading placeholder. With `refresh_secs` the browser reloads
    /// the page after that many seconds.
    pub fn render_fallback(&self, refresh_secs: Option<u32>) -> Result<String> {
        let mut context = self.context();
        context.insert("refresh_secs", &refresh_secs);
        self.render("fallback.html", &context)
    }

    pub fn render_error(&self, status: u16, message: &str) -> Result<String> {
        let mut context = self.context();
        context.insert("status", &status);
        context.insert("message", message);
        self.render("error.html", &context)
    }
}
