//! Consumer-facing retrieval: pagination rules, response shapes and the
//! storage-agnostic query services. HTTP wiring lives in [`http`].

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::notice::Notice;
use crate::domain::policy::Policy;
use crate::repository::errors::RepositoryError;
use crate::repository::{ListFilter, NoticeReader, PolicyReader};

pub mod http;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalized pagination input: page floored to 1, limit clamped to
/// `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total_count: i64) -> Self {
        let limit = i64::from(request.limit);
        Self {
            page: request.page,
            limit: request.limit,
            total_count,
            total_pages: (total_count + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request parameter: {0}")]
    InvalidParameter(String),
    #[error("{0} not found")]
    NotFound(String),
    /// The reference policy exists but its vector has not been generated
    /// yet; the caller should retry after the embedding batcher has run.
    #[error("embedding for policy {0} is not ready")]
    VectorNotReady(i32),
    #[error("storage failure")]
    Storage(#[source] RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => ServiceError::NotFound("record".to_string()),
            other => ServiceError::Storage(other),
        }
    }
}

// --- Response shapes ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeListItem {
    pub id: i32,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub supervising_institution: Option<String>,
    pub regional_institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl NoticeListItem {
    fn from_notice(notice: Notice, similarity: Option<f32>) -> Self {
        Self {
            id: notice.id,
            title: notice.title,
            category: notice.category,
            description: notice.description,
            url: notice.original_url,
            start_date: notice.start_date,
            end_date: notice.end_date,
            supervising_institution: notice.supervising_institution,
            regional_institution: notice.regional_institution,
            similarity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeDetail {
    pub id: i32,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub content_summary: Option<String>,
    pub support_content: Option<String>,
    pub additional_info: Option<String>,
    pub application_method: Option<String>,
    pub screening_method: Option<String>,
    pub required_documents: Option<String>,
    pub reference_url: Option<String>,
    pub supervising_institution: Option<String>,
    pub registering_institution: Option<String>,
    pub operating_institution: Option<String>,
    pub regional_institution: Option<String>,
}

impl From<Notice> for NoticeDetail {
    fn from(notice: Notice) -> Self {
        Self {
            id: notice.id,
            title: notice.title,
            category: notice.category,
            description: notice.description,
            url: notice.original_url,
            start_date: notice.start_date,
            end_date: notice.end_date,
            content_summary: notice.content_summary,
            support_content: notice.support_content,
            additional_info: notice.additional_info,
            application_method: notice.application_method,
            screening_method: notice.screening_method,
            required_documents: notice.required_documents,
            reference_url: notice.reference_url,
            supervising_institution: notice.supervising_institution,
            registering_institution: notice.registering_institution,
            operating_institution: notice.operating_institution,
            regional_institution: notice.regional_institution,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListItem {
    pub id: i32,
    pub title: String,
    pub category: String,
    pub target_group: Option<String>,
    pub description: Option<String>,
}

impl From<Policy> for PolicyListItem {
    fn from(policy: Policy) -> Self {
        Self {
            id: policy.id,
            title: policy.title,
            category: policy.category,
            target_group: policy.target_group,
            description: policy.description,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDetail {
    pub id: i32,
    pub title: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub source: Option<String>,
    pub target_group: Option<String>,
    pub description: Option<String>,
    pub application_process: Option<String>,
    pub content_summary: Option<String>,
}

impl From<Policy> for PolicyDetail {
    fn from(policy: Policy) -> Self {
        Self {
            id: policy.id,
            title: policy.title,
            category: policy.category,
            sub_category: policy.sub_category,
            source: policy.source,
            target_group: policy.target_group,
            description: policy.description,
            application_process: policy.application_process,
            content_summary: policy.content_summary,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyInfo {
    pub id: i32,
    pub title: String,
    pub search_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeListResponse {
    pub data: Vec<NoticeListItem>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_info: Option<PolicyInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListResponse {
    pub data: Vec<PolicyListItem>,
    pub pagination: Pagination,
}

// --- Query services ---

/// Filtered notice listing, newest first. Pages past the end return empty
/// data with accurate pagination metadata.
pub fn list_notices(
    repo: &impl NoticeReader,
    filter: &ListFilter,
    page: PageRequest,
) -> Result<NoticeListResponse, ServiceError> {
    let total_count = repo.count_notices(filter)?;
    let notices = repo.list_notices(filter, i64::from(page.limit), page.offset())?;

    Ok(NoticeListResponse {
        data: notices
            .into_iter()
            .map(|notice| NoticeListItem::from_notice(notice, None))
            .collect(),
        pagination: Pagination::new(page, total_count),
        policy_info: None,
    })
}

/// Notices similar to the reference policy's stored vector, best match
/// first. The similarity threshold is a deployment constant.
pub fn similar_notices(
    repo: &(impl NoticeReader + PolicyReader),
    policy_id: i32,
    threshold: f32,
    page: PageRequest,
) -> Result<NoticeListResponse, ServiceError> {
    let policy = match repo.get_policy(policy_id) {
        Ok(policy) => policy,
        Err(RepositoryError::NotFound) => {
            return Err(ServiceError::NotFound(format!("policy {policy_id}")));
        }
        Err(other) => return Err(ServiceError::Storage(other)),
    };

    let Some(vector) = policy.embedding.as_deref() else {
        return Err(ServiceError::VectorNotReady(policy_id));
    };

    let total_count = repo.count_nearest_notices(vector, threshold)?;
    let neighbors = repo.nearest_notices(vector, threshold, i64::from(page.limit), page.offset())?;

    Ok(NoticeListResponse {
        data: neighbors
            .into_iter()
            .map(|(notice, similarity)| NoticeListItem::from_notice(notice, Some(similarity)))
            .collect(),
        pagination: Pagination::new(page, total_count),
        policy_info: Some(PolicyInfo {
            id: policy.id,
            title: policy.title,
            search_type: "vector_similarity",
        }),
    })
}

pub fn get_notice(repo: &impl NoticeReader, id: i32) -> Result<NoticeDetail, ServiceError> {
    if id <= 0 {
        return Err(ServiceError::InvalidParameter(format!("notice id {id}")));
    }
    match repo.get_notice(id) {
        Ok(notice) => Ok(notice.into()),
        Err(RepositoryError::NotFound) => Err(ServiceError::NotFound(format!("notice {id}"))),
        Err(other) => Err(ServiceError::Storage(other)),
    }
}

pub fn list_policies(
    repo: &impl PolicyReader,
    filter: &ListFilter,
    page: PageRequest,
) -> Result<PolicyListResponse, ServiceError> {
    let total_count = repo.count_policies(filter)?;
    let policies = repo.list_policies(filter, i64::from(page.limit), page.offset())?;

    Ok(PolicyListResponse {
        data: policies.into_iter().map(PolicyListItem::from).collect(),
        pagination: Pagination::new(page, total_count),
    })
}

pub fn get_policy(repo: &impl PolicyReader, id: i32) -> Result<PolicyDetail, ServiceError> {
    if id <= 0 {
        return Err(ServiceError::InvalidParameter(format!("policy id {id}")));
    }
    match repo.get_policy(id) {
        Ok(policy) => Ok(policy.into()),
        Err(RepositoryError::NotFound) => Err(ServiceError::NotFound(format!("policy {id}"))),
        Err(other) => Err(ServiceError::Storage(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_inputs() {
        let request = PageRequest::new(None, None);
        assert_eq!(request, PageRequest { page: 1, limit: 20 });

        let request = PageRequest::new(Some(0), Some(500));
        assert_eq!(request, PageRequest { page: 1, limit: 100 });

        let request = PageRequest::new(Some(3), Some(0));
        assert_eq!(request, PageRequest { page: 3, limit: 1 });
    }

    #[test]
    fn pagination_arithmetic() {
        let request = PageRequest::new(Some(5), Some(20));
        let pagination = Pagination::new(request, 95);
        assert_eq!(pagination.total_pages, 5);
        assert_eq!(pagination.total_count, 95);

        assert_eq!(Pagination::new(request, 0).total_pages, 0);
        assert_eq!(Pagination::new(request, 100).total_pages, 5);
        assert_eq!(Pagination::new(request, 101).total_pages, 6);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        assert_eq!(PageRequest::new(Some(1), Some(20)).offset(), 0);
        assert_eq!(PageRequest::new(Some(6), Some(20)).offset(), 100);
    }
}
