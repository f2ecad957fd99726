use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::policy::{NewPolicy, Policy};
use crate::models::vector_from_blob;
use crate::schema::policies;

#[derive(Debug, Queryable, Identifiable)]
#[diesel(table_name = policies)]
pub struct PolicyRow {
    pub id: i32,
    pub title: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub source: Option<String>,
    pub target_group: Option<String>,
    pub description: Option<String>,
    pub application_process: Option<String>,
    pub content_summary: Option<String>,
    pub embedding: Option<Vec<u8>>,
    pub created_at: NaiveDateTime,
}

impl From<PolicyRow> for Policy {
    fn from(row: PolicyRow) -> Self {
        Policy {
            id: row.id,
            title: row.title,
            category: row.category,
            sub_category: row.sub_category,
            source: row.source,
            target_group: row.target_group,
            description: row.description,
            application_process: row.application_process,
            content_summary: row.content_summary,
            embedding: row.embedding.as_deref().map(vector_from_blob),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = policies)]
pub struct NewPolicyRow {
    pub title: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub source: Option<String>,
    pub target_group: Option<String>,
    pub description: Option<String>,
    pub application_process: Option<String>,
    pub content_summary: Option<String>,
}

impl From<&NewPolicy> for NewPolicyRow {
    fn from(policy: &NewPolicy) -> Self {
        NewPolicyRow {
            title: policy.title.clone(),
            category: policy.category.clone(),
            sub_category: policy.sub_category.clone(),
            source: policy.source.clone(),
            target_group: policy.target_group.clone(),
            description: policy.description.clone(),
            application_process: policy.application_process.clone(),
            content_summary: policy.content_summary.clone(),
        }
    }
}
