//! Embedding provider client and the batch run that fills missing vectors.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::notice::Notice;
use crate::domain::policy::Policy;
use crate::models::config::{EmbeddingConfig, ServerConfig};
use crate::processing::{EmbedTarget, record_error};
use crate::repository::errors::RepositoryError;
use crate::repository::{DieselRepository, NoticeReader, NoticeWriter, PolicyReader, PolicyWriter};

const EMBEDDING_MODEL: &str = "models/gemini-embedding-001";
const TASK_TYPE: &str = "RETRIEVAL_DOCUMENT";

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// One text in, one fixed-length vector out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: RequestContent<'a>,
    task_type: &'a str,
    #[serde(rename = "outputDimensionality")]
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<ResponseEmbedding>,
}

#[derive(Deserialize)]
struct ResponseEmbedding {
    values: Option<Vec<f32>>,
}

/// HTTP client for the Gemini embedding endpoint.
pub struct GeminiEmbeddingClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    output_dimensionality: usize,
}

impl GeminiEmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            output_dimensionality: config.output_dimensionality,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedRequest {
            model: EMBEDDING_MODEL,
            content: RequestContent {
                parts: vec![RequestPart { text }],
            },
            task_type: TASK_TYPE,
            output_dimensionality: self.output_dimensionality,
        };

        let response = self
            .http
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api { status, body });
        }

        let parsed: EmbedResponse = response.json().await?;
        parsed
            .embedding
            .and_then(|embedding| embedding.values)
            .filter(|values| !values.is_empty())
            .ok_or_else(|| EmbeddingError::Malformed("missing embedding values".to_string()))
    }
}

/// Normalize a vector to unit length.
///
/// Returns the original vector when the norm is zero.
pub(crate) fn normalize_embedding(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vec.to_vec()
    } else {
        vec.iter().map(|x| x / norm).collect()
    }
}

fn labeled_lines(fields: Vec<(&str, Option<String>)>) -> Option<String> {
    let lines: Vec<String> = fields
        .into_iter()
        .filter_map(|(label, value)| {
            let value = value?;
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(format!("{label}: {trimmed}"))
            }
        })
        .collect();

    if lines.is_empty() { None } else { Some(lines.join("\n")) }
}

/// Build the embedding input for a notice; `None` when every field is
/// empty, in which case no provider call must be made.
pub fn notice_embedding_prompt(notice: &Notice) -> Option<String> {
    let period = match (notice.start_date, notice.end_date) {
        (None, None) => None,
        (start, end) => Some(format!(
            "{} ~ {}",
            start.map(|d| d.to_string()).unwrap_or_default(),
            end.map(|d| d.to_string()).unwrap_or_default()
        )),
    };

    labeled_lines(vec![
        ("제목", Some(notice.title.clone())),
        ("카테고리", notice.category.clone()),
        ("출처", notice.source.clone()),
        ("내용 요약", notice.content_summary.clone()),
        ("정책 번호", notice.policy_number.clone()),
        ("신청 기간", period),
    ])
}

/// Embedding input for a policy, same skip rule as notices.
pub fn policy_embedding_prompt(policy: &Policy) -> Option<String> {
    labeled_lines(vec![
        ("제목", Some(policy.title.clone())),
        ("카테고리", Some(policy.category.clone())),
        ("세부 카테고리", policy.sub_category.clone()),
        ("출처", policy.source.clone()),
        ("대상", policy.target_group.clone()),
        ("설명", policy.description.clone()),
        ("신청 절차", policy.application_process.clone()),
    ])
}

/// Outcome counts for one batch run.
#[derive(Debug, Default)]
pub struct EmbeddingReport {
    pub candidates: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EmbeddingRunError {
    /// The provider failed more than the allowed number of times; the run
    /// stopped early. Work persisted before the abort is kept.
    #[error("embedding run aborted after {} failures", report.failed)]
    AbortThreshold { report: EmbeddingReport },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Failures tolerated before the run aborts.
    pub max_errors: usize,
    /// Take a longer pause after this many successes.
    pub pause_every: usize,
    pub batch_pause: Duration,
    /// Small delay after every record, on top of the batch pause.
    pub call_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_errors: 10,
            pause_every: 10,
            batch_pause: Duration::from_secs(1),
            call_delay: Duration::from_millis(100),
        }
    }
}

impl BatchOptions {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            max_errors: config.max_errors,
            ..Default::default()
        }
    }
}

/// Fill vectors for every notice that lacks one.
///
/// Each vector is persisted as soon as it is produced, so an aborted run
/// keeps its completed work.
pub async fn embed_pending_notices(
    repo: &(impl NoticeReader + NoticeWriter),
    provider: &dyn EmbeddingProvider,
    options: &BatchOptions,
) -> Result<EmbeddingReport, EmbeddingRunError> {
    let pending = repo.list_unembedded_notices()?;
    let mut report = EmbeddingReport {
        candidates: pending.len(),
        ..Default::default()
    };
    log::info!("embedding run: {} notices pending", report.candidates);

    for notice in pending {
        let Some(prompt) = notice_embedding_prompt(&notice) else {
            report.skipped += 1;
            continue;
        };

        let outcome = match provider.embed(&prompt).await {
            Ok(vector) => {
                let vector = normalize_embedding(&vector);
                repo.set_notice_embedding(notice.id, &vector)
                    .map(|_| ())
                    .map_err(|e| format!("notice {}: failed to persist vector: {e}", notice.id))
            }
            Err(e) => Err(format!("notice {}: {e}", notice.id)),
        };

        if !advance(&mut report, outcome, options).await {
            return Err(EmbeddingRunError::AbortThreshold { report });
        }
    }

    log::info!(
        "embedding run finished: {} succeeded, {} failed, {} skipped",
        report.succeeded,
        report.failed,
        report.skipped
    );
    Ok(report)
}

/// Fill vectors for every policy that lacks one. Same pacing and abort
/// rules as the notice run.
pub async fn embed_pending_policies(
    repo: &(impl PolicyReader + PolicyWriter),
    provider: &dyn EmbeddingProvider,
    options: &BatchOptions,
) -> Result<EmbeddingReport, EmbeddingRunError> {
    let pending = repo.list_unembedded_policies()?;
    let mut report = EmbeddingReport {
        candidates: pending.len(),
        ..Default::default()
    };
    log::info!("embedding run: {} policies pending", report.candidates);

    for policy in pending {
        let Some(prompt) = policy_embedding_prompt(&policy) else {
            report.skipped += 1;
            continue;
        };

        let outcome = match provider.embed(&prompt).await {
            Ok(vector) => {
                let vector = normalize_embedding(&vector);
                repo.set_policy_embedding(policy.id, &vector)
                    .map(|_| ())
                    .map_err(|e| format!("policy {}: failed to persist vector: {e}", policy.id))
            }
            Err(e) => Err(format!("policy {}: {e}", policy.id)),
        };

        if !advance(&mut report, outcome, options).await {
            return Err(EmbeddingRunError::AbortThreshold { report });
        }
    }

    log::info!(
        "embedding run finished: {} succeeded, {} failed, {} skipped",
        report.succeeded,
        report.failed,
        report.skipped
    );
    Ok(report)
}

/// Book one record's outcome into the report and apply pacing. Returns
/// `false` once the failure budget is exhausted.
async fn advance(
    report: &mut EmbeddingReport,
    outcome: Result<(), String>,
    options: &BatchOptions,
) -> bool {
    match outcome {
        Ok(()) => {
            report.succeeded += 1;
            if options.pause_every > 0 && report.succeeded % options.pause_every == 0 {
                tokio::time::sleep(options.batch_pause).await;
            }
        }
        Err(message) => {
            report.failed += 1;
            record_error(&mut report.errors, message);
            if report.failed > options.max_errors {
                log::error!("embedding run aborted: too many failures");
                return false;
            }
        }
    }

    tokio::time::sleep(options.call_delay).await;
    true
}

/// Handle one `Embed` job.
pub async fn process_embed_message(
    target: EmbedTarget,
    repo: &DieselRepository,
    config: &ServerConfig,
) {
    log::info!("Received embed job: {target:?}");

    let provider = match GeminiEmbeddingClient::new(&config.embedding) {
        Ok(provider) => provider,
        Err(e) => {
            log::error!("Failed to build embedding client: {e}");
            return;
        }
    };
    let options = BatchOptions::from_config(&config.embedding);

    let result = match target {
        EmbedTarget::Notices => embed_pending_notices(repo, &provider, &options).await,
        EmbedTarget::Policies => embed_pending_policies(repo, &provider, &options).await,
    };

    match result {
        Ok(report) => log::info!("Finished embed job {target:?}: {report:?}"),
        Err(e) => log::error!("Embed job {target:?} failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn notice(title: &str) -> Notice {
        Notice {
            id: 1,
            policy_number: None,
            original_url: None,
            title: title.to_string(),
            category: None,
            source: None,
            start_date: None,
            end_date: None,
            content_summary: None,
            description: None,
            support_content: None,
            application_method: None,
            screening_method: None,
            required_documents: None,
            additional_info: None,
            reference_url: None,
            supervising_institution: None,
            registering_institution: None,
            operating_institution: None,
            regional_institution: None,
            embedding: None,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn prompt_skips_empty_fields() {
        let mut subject = notice("청년 월세 지원");
        subject.category = Some("주거".to_string());
        subject.content_summary = Some("   ".to_string());

        let prompt = notice_embedding_prompt(&subject).unwrap();
        assert_eq!(prompt, "제목: 청년 월세 지원\n카테고리: 주거");
    }

    #[test]
    fn prompt_includes_period_when_any_date_present() {
        let mut subject = notice("청년 월세 지원");
        subject.start_date = NaiveDate::from_ymd_opt(2025, 3, 10);

        let prompt = notice_embedding_prompt(&subject).unwrap();
        assert!(prompt.contains("신청 기간: 2025-03-10 ~"));
    }

    #[test]
    fn fully_empty_record_yields_no_prompt() {
        assert_eq!(notice_embedding_prompt(&notice("")), None);
    }

    #[test]
    fn normalizes_to_unit_length() {
        let normalized = normalize_embedding(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < f32::EPSILON);
        assert!((normalized[1] - 0.8).abs() < f32::EPSILON);

        // zero vector stays untouched
        assert_eq!(normalize_embedding(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
