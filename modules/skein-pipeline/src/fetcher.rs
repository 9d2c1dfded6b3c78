use std::time::Duration;

use chrono::Utc;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use reqwest::StatusCode;
use tracing::info;

use skein_common::{fingerprint, FeedEntry, SkeinError, Source};

const FEED_TIMEOUT_SECS: u64 = 15;
const FEED_USER_AGENT: &str = "skein-pipeline/0.1";
const MAX_ENTRIES: usize = 20;

/// Result of polling one source.
#[derive(Debug, Clone)]
pub struct FeedFetchOutcome {
    pub entries: Vec<FeedEntry>,
    pub not_modified: bool,
    /// Conditional metadata to store back on the source. Carries the previous
    /// values forward when the server omits the headers.
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Fetches and parses RSS/Atom feeds with conditional requests.
pub struct FeedFetcher {
    client: reqwest::Client,
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .build()
            .expect("Failed to build feed HTTP client");
        Self { client }
    }

    /// Poll a source. Sends the stored `etag`/`last_modified` as conditional
    /// headers; a 304 short-circuits with no entries. On a normal response the
    /// body is parsed into at most 20 entries, newest first.
    pub async fn fetch(&self, source: &Source) -> Result<FeedFetchOutcome, SkeinError> {
        let mut request = self
            .client
            .get(&source.url)
            .header(USER_AGENT, FEED_USER_AGENT);
        if let Some(etag) = &source.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &source.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SkeinError::Network(format!("feed fetch failed: {e}")))?;

        if response.status() == StatusCode::NOT_MODIFIED {
            info!(url = %source.url, "Feed not modified");
            return Ok(FeedFetchOutcome {
                entries: Vec::new(),
                not_modified: true,
                etag: source.etag.clone(),
                last_modified: source.last_modified.clone(),
            });
        }

        if !response.status().is_success() {
            return Err(SkeinError::Network(format!(
                "feed fetch returned {} for {}",
                response.status(),
                source.url
            )));
        }

        let etag = header_value(&response, ETAG.as_str()).or_else(|| source.etag.clone());
        let last_modified =
            header_value(&response, LAST_MODIFIED.as_str()).or_else(|| source.last_modified.clone());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SkeinError::Network(format!("failed to read feed body: {e}")))?;

        let entries = parse_entries(&bytes)?;
        info!(url = %source.url, entries = entries.len(), "Feed fetched");

        Ok(FeedFetchOutcome {
            entries,
            not_modified: false,
            etag,
            last_modified,
        })
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Parse a feed document into entries. Tolerates partial markup: entries
/// without a link are dropped, missing titles fall back to "Untitled", missing
/// descriptions to empty. Newest first, capped at `MAX_ENTRIES`.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<FeedEntry>, SkeinError> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| SkeinError::MalformedFeed(e.to_string()))?;

    let mut entries: Vec<FeedEntry> = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

            let title = entry
                .title
                .map(|t| t.content)
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            let description = entry.summary.map(|t| t.content).unwrap_or_default();

            let published = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc));

            Some(FeedEntry {
                title,
                link: sanitize_link(&link),
                description,
                published,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.published.cmp(&a.published));
    entries.truncate(MAX_ENTRIES);
    Ok(entries)
}

/// Dedup key for a feed entry: hash over the stable fields. Publish timestamps
/// and titles get rewritten by feed generators; the link + description pair
/// identifies the article.
pub fn entry_fingerprint(entry: &FeedEntry) -> String {
    fingerprint(&[&entry.link, &entry.description])
}

/// Strip tracking parameters that vary per poll and would break dedup.
pub(crate) fn sanitize_link(url: &str) -> String {
    const TRACKING_PARAMS: &[&str] = &[
        "fbclid",
        "gclid",
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_term",
        "utm_content",
        "mc_cid",
        "mc_eid",
    ];

    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    if parsed.query().is_none() {
        return url.to_string();
    }

    let clean_pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if clean_pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(clean_pairs);
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss(items: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0"?>
            <rss version="2.0"><channel><title>Test Feed</title>{items}</channel></rss>"#
        )
        .into_bytes()
    }

    #[test]
    fn missing_title_falls_back_to_untitled() {
        let bytes = rss(
            r#"<item><link>https://example.com/a</link>
                <description>desc</description></item>"#,
        );
        let entries = parse_entries(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Untitled");
        assert_eq!(entries[0].description, "desc");
    }

    #[test]
    fn entry_without_link_is_dropped() {
        let bytes = rss(
            r#"<item><title>No link here</title></item>
               <item><title>Linked</title><link>https://example.com/b</link></item>"#,
        );
        let entries = parse_entries(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Linked");
    }

    #[test]
    fn entries_sorted_newest_first_and_capped() {
        let mut items = String::new();
        for i in 0..25 {
            items.push_str(&format!(
                "<item><title>Post {i}</title><link>https://example.com/{i}</link>\
                 <pubDate>{:02} Jun 2026 00:00:00 GMT</pubDate></item>",
                i % 28 + 1
            ));
        }
        let entries = parse_entries(&rss(&items)).unwrap();
        assert_eq!(entries.len(), 20);
        assert!(entries
            .windows(2)
            .all(|w| w[0].published >= w[1].published));
    }

    #[test]
    fn garbage_bytes_are_a_malformed_feed() {
        let err = parse_entries(b"this is not xml at all {{{").unwrap_err();
        assert!(matches!(err, SkeinError::MalformedFeed(_)));
    }

    #[test]
    fn sanitize_strips_tracking_params_only() {
        assert_eq!(
            sanitize_link("https://example.com/post?utm_source=rss&id=7"),
            "https://example.com/post?id=7"
        );
        assert_eq!(
            sanitize_link("https://example.com/post?utm_source=rss"),
            "https://example.com/post"
        );
        assert_eq!(
            sanitize_link("https://example.com/post"),
            "https://example.com/post"
        );
    }

    #[test]
    fn fingerprint_ignores_tracking_noise() {
        let a = FeedEntry {
            title: "T".into(),
            link: sanitize_link("https://example.com/post?utm_source=rss"),
            description: "d".into(),
            published: None,
        };
        let b = FeedEntry {
            title: "T (updated)".into(),
            link: sanitize_link("https://example.com/post?utm_campaign=x"),
            description: "d".into(),
            published: Some(Utc::now()),
        };
        assert_eq!(entry_fingerprint(&a), entry_fingerprint(&b));
    }
}
