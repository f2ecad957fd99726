use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// A stored public notice or policy announcement in canonical form.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub id: i32,
    pub policy_number: Option<String>,
    pub original_url: Option<String>,
    pub title: String,
    pub category: Option<String>,
    pub source: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub content_summary: Option<String>,
    pub description: Option<String>,
    pub support_content: Option<String>,
    pub application_method: Option<String>,
    pub screening_method: Option<String>,
    pub required_documents: Option<String>,
    pub additional_info: Option<String>,
    pub reference_url: Option<String>,
    pub supervising_institution: Option<String>,
    pub registering_institution: Option<String>,
    pub operating_institution: Option<String>,
    pub regional_institution: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A notice as produced by a source mapping, before it has a store id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewNotice {
    pub policy_number: Option<String>,
    pub original_url: Option<String>,
    pub title: String,
    pub category: Option<String>,
    pub source: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub content_summary: Option<String>,
    pub description: Option<String>,
    pub support_content: Option<String>,
    pub application_method: Option<String>,
    pub screening_method: Option<String>,
    pub required_documents: Option<String>,
    pub additional_info: Option<String>,
    pub reference_url: Option<String>,
    pub supervising_institution: Option<String>,
    pub registering_institution: Option<String>,
    pub operating_institution: Option<String>,
    pub regional_institution: Option<String>,
}

impl NewNotice {
    /// The business identifier used for deduplication. The source-issued
    /// policy number is stable across url churn, so it wins when present.
    pub fn natural_key(&self) -> Option<NaturalKey<'_>> {
        if let Some(number) = self.policy_number.as_deref() {
            return Some(NaturalKey::PolicyNumber(number));
        }
        self.original_url.as_deref().map(NaturalKey::Url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalKey<'a> {
    PolicyNumber(&'a str),
    Url(&'a str),
}

/// A null-only update: every field is `Some` only when the stored record
/// lacks a value and the incoming one has it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoticePatch {
    pub policy_number: Option<String>,
    pub original_url: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub content_summary: Option<String>,
    pub description: Option<String>,
    pub support_content: Option<String>,
    pub application_method: Option<String>,
    pub screening_method: Option<String>,
    pub required_documents: Option<String>,
    pub additional_info: Option<String>,
    pub reference_url: Option<String>,
    pub supervising_institution: Option<String>,
    pub registering_institution: Option<String>,
    pub operating_institution: Option<String>,
    pub regional_institution: Option<String>,
}

impl NoticePatch {
    pub fn is_empty(&self) -> bool {
        self.policy_number.is_none()
            && self.original_url.is_none()
            && self.category.is_none()
            && self.source.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.content_summary.is_none()
            && self.description.is_none()
            && self.support_content.is_none()
            && self.application_method.is_none()
            && self.screening_method.is_none()
            && self.required_documents.is_none()
            && self.additional_info.is_none()
            && self.reference_url.is_none()
            && self.supervising_institution.is_none()
            && self.registering_institution.is_none()
            && self.operating_institution.is_none()
            && self.regional_institution.is_none()
    }
}

fn fill<T: Clone>(existing: &Option<T>, incoming: &Option<T>) -> Option<T> {
    match (existing, incoming) {
        (None, Some(value)) => Some(value.clone()),
        _ => None,
    }
}

/// Compute the backfill patch for an already stored notice. Populated
/// fields on the stored record are left untouched; only null fields that
/// the incoming record can fill appear in the patch.
pub fn backfill_patch(existing: &Notice, incoming: &NewNotice) -> NoticePatch {
    NoticePatch {
        policy_number: fill(&existing.policy_number, &incoming.policy_number),
        original_url: fill(&existing.original_url, &incoming.original_url),
        category: fill(&existing.category, &incoming.category),
        source: fill(&existing.source, &incoming.source),
        start_date: fill(&existing.start_date, &incoming.start_date),
        end_date: fill(&existing.end_date, &incoming.end_date),
        content_summary: fill(&existing.content_summary, &incoming.content_summary),
        description: fill(&existing.description, &incoming.description),
        support_content: fill(&existing.support_content, &incoming.support_content),
        application_method: fill(&existing.application_method, &incoming.application_method),
        screening_method: fill(&existing.screening_method, &incoming.screening_method),
        required_documents: fill(&existing.required_documents, &incoming.required_documents),
        additional_info: fill(&existing.additional_info, &incoming.additional_info),
        reference_url: fill(&existing.reference_url, &incoming.reference_url),
        supervising_institution: fill(
            &existing.supervising_institution,
            &incoming.supervising_institution,
        ),
        registering_institution: fill(
            &existing.registering_institution,
            &incoming.registering_institution,
        ),
        operating_institution: fill(
            &existing.operating_institution,
            &incoming.operating_institution,
        ),
        regional_institution: fill(
            &existing.regional_institution,
            &incoming.regional_institution,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(category: Option<&str>, description: Option<&str>) -> Notice {
        Notice {
            id: 1,
            policy_number: Some("R2024123".to_string()),
            original_url: None,
            title: "청년 월세 지원".to_string(),
            category: category.map(str::to_string),
            source: Some("청년센터".to_string()),
            start_date: None,
            end_date: None,
            content_summary: None,
            description: description.map(str::to_string),
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
    fn natural_key_prefers_policy_number() {
        let notice = NewNotice {
            policy_number: Some("R2024123".to_string()),
            original_url: Some("https://example.com/1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            notice.natural_key(),
            Some(NaturalKey::PolicyNumber("R2024123"))
        );
    }

    #[test]
    fn natural_key_falls_back_to_url() {
        let notice = NewNotice {
            original_url: Some("https://example.com/1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            notice.natural_key(),
            Some(NaturalKey::Url("https://example.com/1"))
        );
        assert_eq!(NewNotice::default().natural_key(), None);
    }

    #[test]
    fn patch_fills_only_null_fields() {
        let existing = stored(Some("주거"), None);
        let incoming = NewNotice {
            title: "청년 월세 지원".to_string(),
            category: Some("금융".to_string()),
            description: Some("월세를 지원합니다".to_string()),
            original_url: Some("https://example.com/1".to_string()),
            ..Default::default()
        };

        let patch = backfill_patch(&existing, &incoming);

        // populated category must not be replaced
        assert_eq!(patch.category, None);
        assert_eq!(patch.description.as_deref(), Some("월세를 지원합니다"));
        assert_eq!(patch.original_url.as_deref(), Some("https://example.com/1"));
    }

    #[test]
    fn patch_never_writes_null_over_value() {
        let existing = stored(Some("주거"), Some("기존 설명"));
        let incoming = NewNotice {
            title: "청년 월세 지원".to_string(),
            ..Default::default()
        };

        assert!(backfill_patch(&existing, &incoming).is_empty());
    }
}
