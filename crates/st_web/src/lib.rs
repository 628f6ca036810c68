use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod generate;
pub mod handlers;
pub mod state;

pub use generate::{build_site, static_paths, BuildReport};
pub use state::{AppState, PageSlot, MAX_NEGATIVE_SLOTS};

pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/", get(handlers::listing))
        .route("/post/:uid", get(handlers::post))
        .route("/api/posts", get(handlers::next_posts))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub mod prelude {
    pub use crate::{create_app, AppState};
    pub use st_core::{Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use st_cms::{MemoryCms, PrismicClient};
    use st_core::types::{ArticleData, ContentBlock, Document, RichTextFragment};
    use st_core::{CmsConfig, ContentSource, SiteConfig};
    use st_render::PageRenderer;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn memory_state(n: usize) -> Arc<AppState> {
        let cms = MemoryCms::new();
        for i in 0..n {
            cms.insert(
                "home",
                Document {
                    uid: Some(format!("post-{i}")),
                    first_publication_date: Some("2021-03-19T15:49:00+0000".to_string()),
                    data: ArticleData {
                        title: format!("Post {i}"),
                        author: "Danilo Vieira".to_string(),
                        content: vec![ContentBlock {
                            heading: "H".to_string(),
                            body: vec![RichTextFragment::paragraph("one two three")],
                        }],
                        ..Default::default()
                    },
                },
            )
            .await;
        }
        state_for(Arc::new(cms), CmsConfig::default())
    }

    fn state_for(source: Arc<dyn ContentSource>, config: CmsConfig) -> Arc<AppState> {
        let renderer = Arc::new(PageRenderer::new(SiteConfig::default()).unwrap());
        Arc::new(AppState::new(source, renderer, config))
    }

    async fn request(state: &Arc<AppState>, uri: &str) -> (StatusCode, String) {
        let response = create_app(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn wait_until_settled(state: &Arc<AppState>, uid: &str) {
        for _ in 0..100 {
            if !matches!(state.page_slot(uid).await, Some(PageSlot::Generating)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("generation of {uid} did not finish");
    }

    #[tokio::test]
    async fn test_health() {
        let state = memory_state(0).await;
        let (status, body) = request(&state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_listing_pages_query() {
        let state = memory_state(3).await;

        let (status, body) = request(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.matches("class=\"post\"").count(), 1);
        assert!(body.contains("Carregar mais posts"));

        let (_, body) = request(&state, "/?pages=3").await;
        assert_eq!(body.matches("class=\"post\"").count(), 3);
        assert!(!body.contains("Carregar mais posts"));
    }

    #[tokio::test]
    async fn test_post_falls_back_then_serves() {
        let state = memory_state(1).await;

        let (status, body) = request(&state, "/post/post-0").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));

        wait_until_settled(&state, "post-0").await;
        let (status, body) = request(&state, "/post/post-0").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Post 0 | Spacetraveling"));
        assert!(body.contains("1 min"));
    }

    #[tokio::test]
    async fn test_unknown_post_is_404() {
        let state = memory_state(1).await;
        request(&state, "/post/nope").await;
        wait_until_settled(&state, "nope").await;
        let (status, _) = request(&state, "/post/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_generation_is_reported() {
        let cms = MemoryCms::new();
        cms.insert(
            "home",
            Document {
                uid: Some("bad".to_string()),
                first_publication_date: Some("not-a-date".to_string()),
                data: ArticleData {
                    title: "Bad".to_string(),
                    ..Default::default()
                },
            },
        )
        .await;
        let state = state_for(Arc::new(cms), CmsConfig::default());

        let (status, body) = request(&state, "/post/bad").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));

        wait_until_settled(&state, "bad").await;
        let (status, body) = request(&state, "/post/bad").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("Carregando..."));

        // The next request retries the generation.
        let (status, _) = request(&state, "/post/bad").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_uids_are_bounded() {
        let state = memory_state(0).await;
        for i in 0..MAX_NEGATIVE_SLOTS + 20 {
            let uid = format!("junk-{i}");
            state.request_page(&uid).await;
            wait_until_settled(&state, &uid).await;
        }
        assert_eq!(state.cached_pages().await, MAX_NEGATIVE_SLOTS);

        let (status, _) = request(&state, &format!("/post/junk-{}", MAX_NEGATIVE_SLOTS + 19)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prerender() {
        let state = memory_state(2).await;
        assert_eq!(state.prerender().await.unwrap(), 2);
        let (_, body) = request(&state, "/post/post-1").await;
        assert!(body.contains("Post 1 | Spacetraveling"));
    }

    #[tokio::test]
    async fn test_api_posts() {
        let state = memory_state(2).await;
        let (status, body) = request(&state, "/api/posts?next=memory%3A%2F%2Fhome%3Fpage%3D2%26pageSize%3D1").await;
        assert_eq!(status, StatusCode::OK);
        let page: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(page["page"], 2);
        assert_eq!(page["next_page"], Value::Null);
        assert_eq!(page["results"][0]["uid"], "post-1");
    }

    #[tokio::test]
    async fn test_api_posts_page_past_the_end() {
        let state = memory_state(2).await;
        let (status, body) = request(
            &state,
            "/api/posts?next=memory%3A%2F%2Fhome%3Fpage%3D4294967295%26pageSize%3D2",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let page: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(page["results"], json!([]));
        assert_eq!(page["next_page"], Value::Null);
    }

    #[tokio::test]
    async fn test_api_posts_rejects_foreign_tokens() {
        let state = memory_state(2).await;
        let (status, _) = request(&state, "/api/posts?next=https%3A%2F%2Fevil.example%2F").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_listing_over_prismic_load_more() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "refs": [{ "ref": "master-ref", "isMasterRef": true }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/documents/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "next_page": format!("{}/url2", server.uri()),
                "results": [{
                    "uid": "a",
                    "first_publication_date": "2021-01-01",
                    "data": { "title": "T", "subtitle": "S", "author": "A" }
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/url2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 2,
                "next_page": null,
                "results": [{
                    "uid": "b",
                    "first_publication_date": "2021-01-02",
                    "data": { "title": "U", "subtitle": "S", "author": "A" }
                }]
            })))
            .mount(&server)
            .await;

        let config = CmsConfig::new().with_endpoint(format!("{}/api/v2", server.uri()));
        let client = PrismicClient::new(&config).unwrap();
        let state = state_for(Arc::new(client), config);

        let (_, body) = request(&state, "/").await;
        assert_eq!(body.matches("class=\"post\"").count(), 1);
        assert!(body.contains("<strong>T</strong>"));
        assert!(body.contains("Carregar mais posts"));

        let (_, body) = request(&state, "/?pages=2").await;
        assert_eq!(body.matches("class=\"post\"").count(), 2);
        assert!(!body.contains("Carregar mais posts"));
    }
}
