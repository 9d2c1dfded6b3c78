//! Conditional-fetch behavior against a loopback feed server.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use uuid::Uuid;

use skein_common::{SkeinError, Source};
use skein_pipeline::FeedFetcher;

const FEED_ETAG: &str = "\"abc123\"";

const FEED_XML: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Loopback Feed</title>
<item><title>First post</title><link>https://example.com/1</link>
<description>One</description><pubDate>Mon, 01 Jun 2026 00:00:00 GMT</pubDate></item>
<item><title>Second post</title><link>https://example.com/2</link>
<description>Two</description><pubDate>Tue, 02 Jun 2026 00:00:00 GMT</pubDate></item>
</channel></rss>"#;

async fn feed(headers: HeaderMap) -> impl IntoResponse {
    let revalidated = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        == Some(FEED_ETAG);

    if revalidated {
        (
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, FEED_ETAG)],
            String::new(),
        )
    } else {
        (
            StatusCode::OK,
            [(header::ETAG, FEED_ETAG)],
            FEED_XML.to_string(),
        )
    }
}

async fn broken() -> impl IntoResponse {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Serve the feed routes on an ephemeral loopback port.
async fn serve() -> String {
    let app = Router::new()
        .route("/feed.xml", get(feed))
        .route("/broken.xml", get(broken));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn source(url: String, etag: Option<&str>) -> Source {
    Source {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        url,
        label: "Loopback".to_string(),
        is_active: true,
        etag: etag.map(str::to_string),
        last_modified: None,
        last_fetched_at: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn first_fetch_parses_entries_and_captures_etag() {
    let base = serve().await;
    let fetcher = FeedFetcher::new();

    let outcome = fetcher
        .fetch(&source(format!("{base}/feed.xml"), None))
        .await
        .unwrap();

    assert!(!outcome.not_modified);
    assert_eq!(outcome.entries.len(), 2);
    assert_eq!(outcome.entries[0].title, "Second post", "newest first");
    assert_eq!(outcome.etag.as_deref(), Some(FEED_ETAG));
}

#[tokio::test]
async fn matching_etag_short_circuits_with_304() {
    let base = serve().await;
    let fetcher = FeedFetcher::new();

    let outcome = fetcher
        .fetch(&source(format!("{base}/feed.xml"), Some(FEED_ETAG)))
        .await
        .unwrap();

    assert!(outcome.not_modified);
    assert!(outcome.entries.is_empty());
    // The stored validator is carried forward for the next poll.
    assert_eq!(outcome.etag.as_deref(), Some(FEED_ETAG));
}

#[tokio::test]
async fn server_error_is_a_network_error() {
    let base = serve().await;
    let fetcher = FeedFetcher::new();

    let err = fetcher
        .fetch(&source(format!("{base}/broken.xml"), None))
        .await
        .unwrap_err();
    assert!(matches!(err, SkeinError::Network(_)));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let fetcher = FeedFetcher::new();
    // Nothing listens on this port.
    let err = fetcher
        .fetch(&source("http://127.0.0.1:9/feed.xml".to_string(), None))
        .await
        .unwrap_err();
    assert!(matches!(err, SkeinError::Network(_)));
}
