//! Client for the LH lease-notice open-data API.
//!
//! The upstream is a JSON/XML hybrid: errors can arrive as an XML body or as
//! an `SS_CODE` flag inside an HTTP 200 payload, and the payload itself is a
//! two-element array whose second element carries the actual page.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::domain::notice::NewNotice;
use crate::sources::{Source, SourcePage, UpstreamError, build_reqwest_client, opt_text, parse_date};

const API_URL: &str = "http://apis.data.go.kr/B552555/lhLeaseNoticeInfo1/lhLeaseNoticeInfo1";
const INSTITUTION_NAME: &str = "한국토지주택공사";

const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("주거", &["임대"]),
    ("토지", &["토지"]),
    ("창업", &["상가"]),
    ("주거", &["주거복지", "복지"]),
];

#[derive(Debug, Clone, Deserialize)]
pub struct LhNoticeItem {
    #[serde(rename = "PAN_NM")]
    pub title: String,
    #[serde(rename = "PAN_ID", default)]
    pub notice_id: Option<String>,
    #[serde(rename = "DTL_URL", default)]
    pub detail_url: Option<String>,
    #[serde(rename = "UPP_AIS_TP_NM", default)]
    pub business_group: Option<String>,
    #[serde(rename = "AIS_TP_CD_NM", default)]
    pub business_type: Option<String>,
    #[serde(rename = "CNP_CD_NM", default)]
    pub region: Option<String>,
    #[serde(rename = "PAN_SS", default)]
    pub status: Option<String>,
    #[serde(rename = "PAN_NT_ST_DT", default)]
    pub posted_date: Option<String>,
    #[serde(rename = "CLSG_DT", default)]
    pub closing_date: Option<String>,
    #[serde(rename = "ALL_CNT", default)]
    pub total_count: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(rename = "dsList", default)]
    items: Vec<LhNoticeItem>,
    #[serde(rename = "resHeader", default)]
    headers: Vec<ResHeader>,
}

#[derive(Debug, Deserialize)]
struct ResHeader {
    #[serde(rename = "SS_CODE", default)]
    status_code: Option<String>,
}

pub struct LhNoticeSource {
    api_key: String,
    client: reqwest::Client,
}

impl LhNoticeSource {
    pub fn new(api_key: &str) -> Result<Self, UpstreamError> {
        Ok(Self {
            api_key: api_key.to_string(),
            client: build_reqwest_client()?,
        })
    }
}

/// Parse the array-shaped page envelope, rejecting XML error bodies and
/// payloads flagged with a non-`Y` status code.
fn parse_page_body(text: &str) -> Result<SourcePage<LhNoticeItem>, UpstreamError> {
    if text.contains("<?xml") || text.contains("<OpenAPI_ServiceResponse>") {
        return Err(UpstreamError::Payload(
            "XML error response instead of JSON".to_string(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| UpstreamError::Payload(format!("invalid JSON: {e}")))?;

    let envelope = value
        .as_array()
        .filter(|parts| parts.len() >= 2)
        .ok_or_else(|| UpstreamError::Payload("unexpected envelope shape".to_string()))?;

    let body: PageBody = serde_json::from_value(envelope[1].clone())
        .map_err(|e| UpstreamError::Payload(format!("invalid page body: {e}")))?;

    let status_code = body
        .headers
        .first()
        .and_then(|header| header.status_code.as_deref())
        .unwrap_or("");
    if status_code != "Y" {
        return Err(UpstreamError::Api(format!("status code {status_code:?}")));
    }

    let total_count = body
        .items
        .first()
        .and_then(|item| item.total_count.as_ref())
        .and_then(|raw| match raw {
            serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0);

    Ok(SourcePage {
        items: body.items,
        total_count,
    })
}

#[async_trait]
impl Source for LhNoticeSource {
    type Raw = LhNoticeItem;

    fn name(&self) -> &'static str {
        "lh-notice"
    }

    fn page_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn fetch_page(&self, page: usize) -> Result<SourcePage<LhNoticeItem>, UpstreamError> {
        let mut url = Url::parse(API_URL).map_err(|e| UpstreamError::Payload(e.to_string()))?;
        // Portal service keys come pre-encoded; passing them through
        // query_pairs_mut would encode them a second time.
        url.set_query(Some(&format!(
            "serviceKey={}&PG_SZ={}&PAGE={page}",
            self.api_key,
            self.page_size(),
        )));

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        let text = response.text().await?;
        parse_page_body(&text)
    }

    fn map_to_canonical(&self, raw: LhNoticeItem) -> NewNotice {
        let original_url = opt_text(raw.detail_url.as_deref()).or_else(|| {
            raw.notice_id.as_deref().map(|id| {
                format!("https://www.lh.or.kr/contents/SH_3_3_1.asp?PAN_ID={id}")
            })
        });

        let content_summary = {
            let parts: Vec<String> = [
                opt_text(raw.business_type.as_deref()),
                opt_text(raw.region.as_deref()),
                opt_text(raw.status.as_deref()),
            ]
            .into_iter()
            .flatten()
            .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" | "))
            }
        };

        NewNotice {
            policy_number: None,
            original_url,
            title: raw.title.trim().to_string(),
            category: Some(infer_category(
                raw.business_group.as_deref(),
                raw.business_type.as_deref(),
            )),
            source: Some(INSTITUTION_NAME.to_string()),
            start_date: raw.posted_date.as_deref().and_then(parse_date),
            end_date: raw.closing_date.as_deref().and_then(parse_date),
            content_summary,
            supervising_institution: Some(INSTITUTION_NAME.to_string()),
            registering_institution: Some(INSTITUTION_NAME.to_string()),
            operating_institution: Some(INSTITUTION_NAME.to_string()),
            regional_institution: opt_text(raw.region.as_deref()),
            ..Default::default()
        }
    }
}

fn infer_category(group: Option<&str>, business_type: Option<&str>) -> String {
    let joined: String = [group, business_type]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    for (category, keywords) in CATEGORY_RULES {
        if keywords.iter().any(|keyword| joined.contains(keyword)) {
            return (*category).to_string();
        }
    }
    "주거".to_string()
}
