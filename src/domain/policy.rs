use chrono::NaiveDateTime;
use serde::Serialize;

/// A standing, curated policy. Policies carry the same embedding lifecycle
/// as notices and act as reference objects for similarity queries.
#[derive(Debug, Clone, Serialize)]
pub struct Policy {
    pub id: i32,
    pub title: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub source: Option<String>,
    pub target_group: Option<String>,
    pub description: Option<String>,
    pub application_process: Option<String>,
    pub content_summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPolicy {
    pub title: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub source: Option<String>,
    pub target_group: Option<String>,
    pub description: Option<String>,
    pub application_process: Option<String>,
    pub content_summary: Option<String>,
}
