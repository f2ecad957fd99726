//! Paginated upstream clients and the shared normalization helpers.
//!
//! Every upstream implements [`Source`]: one page fetch plus a pure mapping
//! from its raw record shape into the canonical [`NewNotice`]. The generic
//! [`fetch_all`] driver owns pagination, inter-page pacing and the
//! partial-failure policy, so a new upstream only has to describe its own
//! wire format.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use html_escape::decode_html_entities;
use regex::Regex;
use thiserror::Error;

use crate::domain::notice::NewNotice;

pub mod lh_notice;
pub mod youth_policy;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("source reported an error: {0}")]
    Api(String),
    #[error("unreadable payload: {0}")]
    Payload(String),
}

/// One page of raw upstream records plus the total the source claims to have.
#[derive(Debug)]
pub struct SourcePage<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

/// An abstraction over paginated notice upstreams.
#[async_trait]
pub trait Source: Send + Sync {
    type Raw: Send;

    fn name(&self) -> &'static str;

    /// Page size requested from the upstream.
    fn page_size(&self) -> usize {
        100
    }

    /// Pause between page fetches, respecting upstream rate limits.
    fn page_delay(&self) -> Duration;

    /// Fetch a single page. Pages are numbered from 1.
    async fn fetch_page(&self, page: usize) -> Result<SourcePage<Self::Raw>, UpstreamError>;

    /// Map one raw record into the canonical shape. Pure, no I/O.
    fn map_to_canonical(&self, raw: Self::Raw) -> NewNotice;
}

/// Fetch every record the source has, page by page.
///
/// Stops when a page comes back empty, when the accumulated count reaches
/// the total reported on the first page, or when a short page signals the
/// end. A failure on the first page propagates; a failure on any later page
/// keeps the records accumulated so far.
pub async fn fetch_all<S: Source>(source: &S) -> Result<Vec<S::Raw>, UpstreamError> {
    fetch_up_to(source, usize::MAX).await
}

/// Like [`fetch_all`] but stops once `max_items` records are accumulated.
pub async fn fetch_up_to<S: Source>(
    source: &S,
    max_items: usize,
) -> Result<Vec<S::Raw>, UpstreamError> {
    let mut items: Vec<S::Raw> = Vec::new();
    let mut total_count = 0usize;
    let mut page = 1usize;

    loop {
        match source.fetch_page(page).await {
            Ok(fetched) => {
                if page == 1 {
                    total_count = fetched.total_count;
                    log::info!("{}: reported total {total_count}", source.name());
                }

                let count = fetched.items.len();
                if count == 0 {
                    break;
                }

                items.extend(fetched.items);
                log::info!(
                    "{}: page {page} fetched {count}, accumulated {}",
                    source.name(),
                    items.len()
                );

                if items.len() >= max_items {
                    items.truncate(max_items);
                    break;
                }
                if items.len() >= total_count || count < source.page_size() {
                    break;
                }

                page += 1;
                tokio::time::sleep(source.page_delay()).await;
            }
            Err(e) if page > 1 => {
                // Keep the partial result; only a first-page failure is total.
                log::error!("{}: page {page} failed, keeping partial data: {e}", source.name());
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(items)
}

/// HTTP client shared by the upstream fetchers. Every call carries the same
/// per-request timeout; a timed-out call fails like any other.
pub fn build_reqwest_client() -> Result<reqwest::Client, UpstreamError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?)
}

static COMPACT_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{8}$").unwrap());
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static DOTTED_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}\.\d{2}\.\d{2}$").unwrap());
static DATE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{8})\s*~\s*(\d{8})$").unwrap());

/// Parse an upstream calendar date.
///
/// Accepts `YYYYMMDD`, `YYYY-MM-DD` and `YYYY.MM.DD`; anything else,
/// including calendar-invalid values, is `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if COMPACT_DATE.is_match(trimmed) {
        NaiveDate::parse_from_str(trimmed, "%Y%m%d").ok()
    } else if ISO_DATE.is_match(trimmed) {
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
    } else if DOTTED_DATE.is_match(trimmed) {
        NaiveDate::parse_from_str(trimmed, "%Y.%m.%d").ok()
    } else {
        None
    }
}

/// Parse an application period: either `"<8 digits> ~ <8 digits>"` or a
/// single date applied to both ends. Malformed input yields `(None, None)`,
/// never an error.
pub fn parse_date_range(raw: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let trimmed = raw.trim();
    if let Some(captures) = DATE_RANGE.captures(trimmed) {
        return (parse_date(&captures[1]), parse_date(&captures[2]));
    }
    let single = parse_date(trimmed);
    (single, single)
}

/// Decode HTML entities and trim; empty text becomes `None`.
pub fn clean_text(raw: &str) -> Option<String> {
    let decoded = decode_html_entities(raw);
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// [`clean_text`] over an optional upstream field.
pub fn opt_text(raw: Option<&str>) -> Option<String> {
    raw.and_then(clean_text)
}

/// Pick the modern field variant, falling back to its legacy sibling.
pub fn modern_or_legacy(modern: Option<&str>, legacy: Option<&str>) -> Option<String> {
    opt_text(modern).or_else(|| opt_text(legacy))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn parses_compact_dates() {
        assert_eq!(
            parse_date("20250310"),
            NaiveDate::from_ymd_opt(2025, 3, 10)
        );
        assert_eq!(parse_date(" 20250310 "), NaiveDate::from_ymd_opt(2025, 3, 10));
    }

    #[test]
    fn passes_iso_and_dotted_dates_through() {
        assert_eq!(
            parse_date("2025-03-10"),
            NaiveDate::from_ymd_opt(2025, 3, 10)
        );
        assert_eq!(
            parse_date("2025.07.25"),
            NaiveDate::from_ymd_opt(2025, 7, 25)
        );
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_eq!(parse_date("abcdefgh"), None);
        assert_eq!(parse_date("2025031"), None);
        assert_eq!(parse_date("20251301"), None); // month 13
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn parses_date_ranges() {
        let (start, end) = parse_date_range("20250310 ~ 20250326");
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 10));
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 3, 26));

        let (start, end) = parse_date_range("20250310");
        assert_eq!(start, end);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 10));

        assert_eq!(parse_date_range("next week"), (None, None));
    }

    #[test]
    fn cleans_entity_laden_text() {
        assert_eq!(
            clean_text("&lt;b&gt;지원&lt;/b&gt; "),
            Some("<b>지원</b>".to_string())
        );
        assert_eq!(clean_text("   "), None);
        assert_eq!(
            modern_or_legacy(Some(""), Some("우편 접수")),
            Some("우편 접수".to_string())
        );
    }

    struct FakeSource {
        pages: Mutex<Vec<Result<SourcePage<u32>, UpstreamError>>>,
    }

    impl FakeSource {
        fn new(pages: Vec<Result<SourcePage<u32>, UpstreamError>>) -> Self {
            Self {
                pages: Mutex::new(pages),
            }
        }
    }

    #[async_trait]
    impl Source for FakeSource {
        type Raw = u32;

        fn name(&self) -> &'static str {
            "fake"
        }

        fn page_size(&self) -> usize {
            3
        }

        fn page_delay(&self) -> Duration {
            Duration::ZERO
        }

        async fn fetch_page(&self, _page: usize) -> Result<SourcePage<u32>, UpstreamError> {
            self.pages.lock().unwrap().remove(0)
        }

        fn map_to_canonical(&self, raw: u32) -> NewNotice {
            NewNotice {
                title: raw.to_string(),
                ..Default::default()
            }
        }
    }

    fn page(items: Vec<u32>, total: usize) -> Result<SourcePage<u32>, UpstreamError> {
        Ok(SourcePage {
            items,
            total_count: total,
        })
    }

    #[tokio::test]
    async fn stops_when_total_reached() {
        let source = FakeSource::new(vec![
            page(vec![1, 2, 3], 5),
            page(vec![4, 5, 6], 5),
            page(vec![7], 5), // must never be requested
        ]);
        let items = fetch_all(&source).await.unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn stops_on_short_page() {
        let source = FakeSource::new(vec![page(vec![1, 2, 3], 100), page(vec![4], 100)]);
        let items = fetch_all(&source).await.unwrap();
        assert_eq!(items, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let source = FakeSource::new(vec![page(vec![1, 2, 3], 100), page(vec![], 100)]);
        let items = fetch_all(&source).await.unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn first_page_failure_propagates() {
        let source = FakeSource::new(vec![Err(UpstreamError::Api("closed".to_string()))]);
        assert!(fetch_all(&source).await.is_err());
    }

    #[tokio::test]
    async fn later_page_failure_keeps_partial_data() {
        let source = FakeSource::new(vec![
            page(vec![1, 2, 3], 100),
            Err(UpstreamError::Api("rate limited".to_string())),
        ]);
        let items = fetch_all(&source).await.unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn bounded_fetch_truncates() {
        let source = FakeSource::new(vec![page(vec![1, 2, 3], 10), page(vec![4, 5, 6], 10)]);
        let items = fetch_up_to(&source, 4).await.unwrap();
        assert_eq!(items, vec![1, 2, 3, 4]);
    }
}
