use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use st_core::article::{load_article, ArticleView};
use st_core::listing::load_initial_listing;
use st_core::{CmsConfig, ContentSource, SiteConfig};
use st_render::PageRenderer;
use st_web::{build_site, create_app, static_paths, AppState};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Spacetraveling blog: static build and server", long_about = None)]
pub struct Cli {
    /// Prismic API entry point, e.g. https://spacetraveling.cdn.prismic.io/api/v2
    #[arg(long, env = "PRISMIC_API_ENDPOINT")]
    pub api_endpoint: Option<String>,
    #[arg(long, env = "PRISMIC_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
    /// Custom type holding the posts
    #[arg(long, default_value = "home")]
    pub document_type: String,
    /// Posts per listing page
    #[arg(long, default_value_t = 1)]
    pub page_size: u32,
    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
    /// Serve documents from a JSON fixture instead of Prismic
    #[arg(long)]
    pub offline: Option<PathBuf>,
    #[arg(long, default_value = "Spacetraveling")]
    pub site_name: String,
    #[arg(short, long)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the blog, generating article pages on demand
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
        /// Generate every article before accepting requests
        #[arg(long)]
        prerender: bool,
    },
    /// Write the static site to a directory
    Build {
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
    /// Print the listing
    List {
        /// Follow every continuation page
        #[arg(long)]
        all: bool,
    },
    /// Print one article with its reading time
    Show { uid: String },
    /// Print every article path
    Paths,
}

impl Cli {
    pub fn cms_config(&self) -> CmsConfig {
        CmsConfig {
            api_endpoint: self.api_endpoint.clone(),
            access_token: self.access_token.clone(),
            document_type: self.document_type.clone(),
            page_size: self.page_size,
            timeout_secs: self.timeout,
            offline_fixture: self.offline.clone(),
        }
    }

    pub fn site_config(&self) -> SiteConfig {
        SiteConfig {
            site_name: self.site_name.clone(),
        }
    }
}

pub async fn handle_command(
    command: Commands,
    source: Arc<dyn ContentSource>,
    config: CmsConfig,
    site: SiteConfig,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve { addr, prerender } => {
            let renderer = Arc::new(PageRenderer::new(site)?);
            let state = Arc::new(AppState::new(source, renderer, config));
            if prerender {
                let count = state.prerender().await?;
                info!("📄 Prerendered {} articles", count);
            }

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!("🚀 Listening on http://{}", addr);
            axum::serve(listener, create_app(state)).await?;
        }
        Commands::Build { out } => {
            let renderer = PageRenderer::new(site)?;
            let report = build_site(source.as_ref(), &renderer, &config, &out).await?;
            info!(
                "✨ Built {} listing pages and {} articles into {}",
                report.listing_pages,
                report.articles,
                out.display()
            );
            for (uid, reason) in &report.failures {
                eprintln!("Failed to build {}: {}", uid, reason);
            }
        }
        Commands::List { all } => {
            let listing = load_initial_listing(source.as_ref(), &config).await?;
            if all {
                listing.load_all(source.as_ref()).await?;
            }
            for entry in listing.entries() {
                println!(
                    "📰 {} | {} | {} | /post/{}",
                    entry.published, entry.summary.title, entry.summary.author, entry.summary.uid
                );
            }
            if listing.has_more() {
                println!("… more posts available (use --all)");
            }
        }
        Commands::Show { uid } => {
            let article = load_article(source.as_ref(), &config, &uid).await?;
            let view = ArticleView::new(article);
            println!("{}", view.article.title);
            println!(
                "📅 {}  👤 {}  ⏱️ {} min",
                view.published.as_deref().unwrap_or("-"),
                view.article.author,
                view.read_time
            );
            for block in &view.article.content {
                println!();
                println!("## {}", block.heading);
                for fragment in &block.body {
                    println!("{}", fragment.text);
                }
            }
        }
        Commands::Paths => {
            for uid in static_paths(source.as_ref(), &config).await? {
                println!("/post/{}", uid);
            }
        }
    }
    Ok(())
}
