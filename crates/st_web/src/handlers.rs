use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use st_core::listing::load_initial_listing;
use st_core::types::ListingEntry;
use st_core::{Error, PageFetcher};
use tracing::{debug, error};

use crate::state::PageSlot;
use crate::AppState;

/// Upper bound on pages a single listing request may load.
pub const MAX_LISTING_PAGES: usize = 50;

pub enum AppError {
    Core(Error),
    BadRequest(String),
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        AppError::Core(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::Core(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, e.to_string()).into_response()
            }
            AppError::Core(e) => {
                error!("Request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub pages: Option<usize>,
}

/// The listing, with `?pages=N` standing in for N-1 "load more" clicks.
pub async fn listing(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListingQuery>,
) -> Result<Html<String>, AppError> {
    let pages = query.pages.unwrap_or(1).clamp(1, MAX_LISTING_PAGES);

    let listing = load_initial_listing(state.source.as_ref(), &state.config).await?;
    let loaded = listing.load_pages(state.source.as_ref(), pages - 1).await?;
    debug!("Listing loaded {} continuation pages", loaded);

    let load_more = listing
        .has_more()
        .then(|| format!("/?pages={}", listing.current_page() + 1));
    let html = state
        .renderer
        .render_listing(&listing.entries(), load_more.as_deref())?;
    Ok(Html(html))
}

pub async fn post(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Response, AppError> {
    match state.request_page(&uid).await {
        PageSlot::Ready(html) => Ok(Html(html.as_str().to_owned()).into_response()),
        PageSlot::Missing => {
            let html = state
                .renderer
                .render_error(404, "Post não encontrado")?;
            Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
        }
        PageSlot::Failed(reason) => {
            debug!("Reporting failed generation of /post/{}: {}", uid, reason);
            let html = state
                .renderer
                .render_error(500, "Não foi possível carregar o post")?;
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response())
        }
        PageSlot::Generating => {
            let html = state.renderer.render_fallback(Some(state.refresh_secs))?;
            Ok(Html(html).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NextPageQuery {
    pub next: String,
}

#[derive(Debug, Serialize)]
pub struct PostsPage {
    pub page: u32,
    pub next_page: Option<String>,
    pub results: Vec<ListingEntry>,
}

/// One continuation page, shaped like the listing's entries.
pub async fn next_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextPageQuery>,
) -> Result<Json<PostsPage>, AppError> {
    if !state.is_trusted_token(&query.next) {
        return Err(AppError::BadRequest("untrusted continuation token".to_string()));
    }

    let page = state.source.fetch_page(&query.next).await?;
    let results = page
        .results
        .into_iter()
        .map(ListingEntry::from_document)
        .collect::<st_core::Result<Vec<_>>>()?;

    Ok(Json(PostsPage {
        page: page.page,
        next_page: page.next_page,
        results,
    }))
}

pub async fn health() -> impl IntoResponse {
    "ok"
}
