use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::domain::notice::{NewNotice, Notice, NoticePatch};
use crate::models::vector_from_blob;
use crate::schema::notices;

#[derive(Debug, Queryable, Identifiable)]
#[diesel(table_name = notices)]
pub struct NoticeRow {
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
    pub embedding: Option<Vec<u8>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<NoticeRow> for Notice {
    fn from(row: NoticeRow) -> Self {
        Notice {
            id: row.id,
            policy_number: row.policy_number,
            original_url: row.original_url,
            title: row.title,
            category: row.category,
            source: row.source,
            start_date: row.start_date,
            end_date: row.end_date,
            content_summary: row.content_summary,
            description: row.description,
            support_content: row.support_content,
            application_method: row.application_method,
            screening_method: row.screening_method,
            required_documents: row.required_documents,
            additional_info: row.additional_info,
            reference_url: row.reference_url,
            supervising_institution: row.supervising_institution,
            registering_institution: row.registering_institution,
            operating_institution: row.operating_institution,
            regional_institution: row.regional_institution,
            embedding: row.embedding.as_deref().map(vector_from_blob),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notices)]
pub struct NewNoticeRow {
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

impl From<&NewNotice> for NewNoticeRow {
    fn from(notice: &NewNotice) -> Self {
        NewNoticeRow {
            policy_number: notice.policy_number.clone(),
            original_url: notice.original_url.clone(),
            title: notice.title.clone(),
            category: notice.category.clone(),
            source: notice.source.clone(),
            start_date: notice.start_date,
            end_date: notice.end_date,
            content_summary: notice.content_summary.clone(),
            description: notice.description.clone(),
            support_content: notice.support_content.clone(),
            application_method: notice.application_method.clone(),
            screening_method: notice.screening_method.clone(),
            required_documents: notice.required_documents.clone(),
            additional_info: notice.additional_info.clone(),
            reference_url: notice.reference_url.clone(),
            supervising_institution: notice.supervising_institution.clone(),
            registering_institution: notice.registering_institution.clone(),
            operating_institution: notice.operating_institution.clone(),
            regional_institution: notice.regional_institution.clone(),
        }
    }
}

/// `None` fields are skipped by diesel, which is exactly the null-only
/// backfill contract of [`NoticePatch`].
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = notices)]
pub struct NoticeChangeset {
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
    pub updated_at: Option<NaiveDateTime>,
}

impl From<NoticePatch> for NoticeChangeset {
    fn from(patch: NoticePatch) -> Self {
        NoticeChangeset {
            policy_number: patch.policy_number,
            original_url: patch.original_url,
            category: patch.category,
            source: patch.source,
            start_date: patch.start_date,
            end_date: patch.end_date,
            content_summary: patch.content_summary,
            description: patch.description,
            support_content: patch.support_content,
            application_method: patch.application_method,
            screening_method: patch.screening_method,
            required_documents: patch.required_documents,
            additional_info: patch.additional_info,
            reference_url: patch.reference_url,
            supervising_institution: patch.supervising_institution,
            registering_institution: patch.registering_institution,
            operating_institution: patch.operating_institution,
            regional_institution: patch.regional_institution,
            updated_at: None,
        }
    }
}
