//! Client for the national youth-policy listing API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::domain::notice::NewNotice;
use crate::sources::{
    Source, SourcePage, UpstreamError, build_reqwest_client, clean_text, modern_or_legacy,
    opt_text, parse_date, parse_date_range,
};

const API_URL: &str = "https://www.youthcenter.go.kr/go/ythip/getPlcy";
const DEFAULT_SOURCE_NAME: &str = "청년센터";

/// Keyword rules for category inference, checked in order over the joined
/// classification labels; the first match wins.
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("주거", &["주거", "임대", "월세"]),
    ("창업", &["창업", "사업", "기업"]),
    ("취업", &["취업", "일자리", "고용"]),
    ("금융", &["금융", "대출", "자금"]),
];

#[derive(Debug, Clone, Deserialize)]
pub struct YouthPolicyItem {
    #[serde(rename = "plcyNo")]
    pub policy_number: String,
    #[serde(rename = "plcyNm")]
    pub title: String,
    #[serde(rename = "lclsfNm", default)]
    pub top_classification: Option<String>,
    #[serde(rename = "mclsfNm", default)]
    pub mid_classification: Option<String>,
    #[serde(rename = "sclsfNm", default)]
    pub sub_classification: Option<String>,
    #[serde(rename = "orgNm", default)]
    pub organization: Option<String>,
    #[serde(rename = "aplyYmd", default)]
    pub application_period: Option<String>,
    #[serde(rename = "aplyBgnYmd", default)]
    pub application_start: Option<String>,
    #[serde(rename = "aplyEndYmd", default)]
    pub application_end: Option<String>,
    #[serde(rename = "plcyUrl", default)]
    pub policy_url: Option<String>,
    #[serde(rename = "aplyUrlAddr", default)]
    pub application_url: Option<String>,
    #[serde(rename = "plcySprttgCn", default)]
    pub support_target: Option<String>,
    #[serde(rename = "plcySprtCn", default)]
    pub support_content: Option<String>,
    #[serde(rename = "plcyAplyMthdCn", default)]
    pub application_method: Option<String>,
    #[serde(rename = "aplyMthCn", default)]
    pub application_method_legacy: Option<String>,
    #[serde(rename = "plcyExplnCn", default)]
    pub description: Option<String>,
    #[serde(rename = "etcMttrCn", default)]
    pub additional_info: Option<String>,
    #[serde(rename = "srngMthdCn", default)]
    pub screening_method: Option<String>,
    #[serde(rename = "sbmsnDcmntCn", default)]
    pub required_documents: Option<String>,
    #[serde(rename = "refUrlAddr1", default)]
    pub reference_url: Option<String>,
    #[serde(rename = "sprvsnInstCdNm", default)]
    pub supervising_institution: Option<String>,
    #[serde(rename = "rgtrInstCdNm", default)]
    pub registering_institution: Option<String>,
    #[serde(rename = "operInstCdNm", default)]
    pub operating_institution: Option<String>,
    #[serde(rename = "rgtrHghrkInstCdNm", default)]
    pub regional_institution: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "resultCode")]
    result_code: i64,
    #[serde(rename = "resultMessage", default)]
    result_message: Option<String>,
    #[serde(default)]
    result: Option<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    // upstream spells it "pagging"
    #[serde(rename = "pagging")]
    paging: Paging,
    #[serde(rename = "youthPolicyList", default)]
    policies: Vec<YouthPolicyItem>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(rename = "totalCount")]
    total_count: usize,
}

pub struct YouthPolicySource {
    api_key: String,
    client: reqwest::Client,
}

impl YouthPolicySource {
    pub fn new(api_key: &str) -> Result<Self, UpstreamError> {
        Ok(Self {
            api_key: api_key.to_string(),
            client: build_reqwest_client()?,
        })
    }
}

#[async_trait]
impl Source for YouthPolicySource {
    type Raw = YouthPolicyItem;

    fn name(&self) -> &'static str {
        "youth-policy"
    }

    fn page_delay(&self) -> Duration {
        Duration::from_millis(500)
    }

    async fn fetch_page(&self, page: usize) -> Result<SourcePage<YouthPolicyItem>, UpstreamError> {
        let mut url = Url::parse(API_URL).map_err(|e| UpstreamError::Payload(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("apiKeyNm", &self.api_key)
            .append_pair("pageNum", &page.to_string())
            .append_pair("pageSize", &self.page_size().to_string())
            .append_pair("rtnType", "json");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        let body: ApiResponse = response.json().await?;
        if body.result_code != 200 {
            return Err(UpstreamError::Api(
                body.result_message
                    .unwrap_or_else(|| format!("result code {}", body.result_code)),
            ));
        }

        let result = body
            .result
            .ok_or_else(|| UpstreamError::Payload("missing result section".to_string()))?;

        Ok(SourcePage {
            items: result.policies,
            total_count: result.paging.total_count,
        })
    }

    fn map_to_canonical(&self, raw: YouthPolicyItem) -> NewNotice {
        let (start_date, end_date) = match raw.application_period.as_deref().map(str::trim) {
            Some(period) if !period.is_empty() => parse_date_range(period),
            _ => (
                raw.application_start.as_deref().and_then(parse_date),
                raw.application_end.as_deref().and_then(parse_date),
            ),
        };

        let application_method = modern_or_legacy(
            raw.application_method.as_deref(),
            raw.application_method_legacy.as_deref(),
        );

        let content_summary = {
            let parts: Vec<String> = [
                opt_text(raw.support_target.as_deref()),
                opt_text(raw.support_content.as_deref()),
                application_method.clone(),
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
            policy_number: clean_text(&raw.policy_number),
            original_url: opt_text(raw.application_url.as_deref())
                .or_else(|| opt_text(raw.policy_url.as_deref())),
            title: raw.title.trim().to_string(),
            category: Some(infer_category(
                raw.top_classification.as_deref(),
                raw.mid_classification.as_deref(),
                raw.sub_classification.as_deref(),
            )),
            source: opt_text(raw.organization.as_deref())
                .or_else(|| Some(DEFAULT_SOURCE_NAME.to_string())),
            start_date,
            end_date,
            content_summary,
            description: opt_text(raw.description.as_deref()),
            support_content: opt_text(raw.support_content.as_deref()),
            application_method,
            screening_method: opt_text(raw.screening_method.as_deref()),
            required_documents: opt_text(raw.required_documents.as_deref()),
            additional_info: opt_text(raw.additional_info.as_deref()),
            reference_url: opt_text(raw.reference_url.as_deref()),
            supervising_institution: opt_text(raw.supervising_institution.as_deref()),
            registering_institution: opt_text(raw.registering_institution.as_deref()),
            operating_institution: opt_text(raw.operating_institution.as_deref()),
            regional_institution: opt_text(raw.regional_institution.as_deref()),
        }
    }
}

/// Infer the canonical category from the upstream classification labels.
fn infer_category(
    top: Option<&str>,
    mid: Option<&str>,
    sub: Option<&str>,
) -> String {
    let joined: String = [top, mid, sub]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    for (category, keywords) in CATEGORY_RULES {
        if keywords.iter().any(|keyword| joined.contains(keyword)) {
            return (*category).to_string();
        }
    }

    match top.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => "기타".to_string(),
    }
}
