use crate::db::{DbConnection, DbPool};
use crate::domain::notice::{NewNotice, Notice, NoticePatch};
use crate::domain::policy::{NewPolicy, Policy};
use crate::repository::errors::RepositoryResult;

pub mod errors;
pub mod notice;
pub mod policy;
mod vector;

/// Result of writing one canonical record through the deduplicating writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Duplicate,
}

/// Optional filters shared by the listing queries.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub category: Option<String>,
    /// Free-text term matched against title and content summary.
    pub search: Option<String>,
}

pub trait NoticeReader {
    fn get_notice(&self, id: i32) -> RepositoryResult<Notice>;
    fn list_notices(
        &self,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<Notice>>;
    fn count_notices(&self, filter: &ListFilter) -> RepositoryResult<i64>;
    /// Records still waiting for a vector, in stable id order.
    fn list_unembedded_notices(&self) -> RepositoryResult<Vec<Notice>>;
    /// Records eligible for upstream reconciliation: they carry a policy
    /// number but never received an application start date.
    fn list_stale_notices(&self) -> RepositoryResult<Vec<Notice>>;
    /// Notices within `threshold` cosine similarity of the query vector,
    /// best match first.
    fn nearest_notices(
        &self,
        query: &[f32],
        threshold: f32,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<(Notice, f32)>>;
    fn count_nearest_notices(&self, query: &[f32], threshold: f32) -> RepositoryResult<i64>;
}

pub trait NoticeWriter {
    fn upsert_notice(&self, notice: &NewNotice) -> RepositoryResult<UpsertOutcome>;
    fn backfill_notice(&self, id: i32, patch: NoticePatch) -> RepositoryResult<usize>;
    fn set_notice_embedding(&self, id: i32, embedding: &[f32]) -> RepositoryResult<usize>;
}

pub trait PolicyReader {
    fn get_policy(&self, id: i32) -> RepositoryResult<Policy>;
    fn list_policies(
        &self,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<Policy>>;
    fn count_policies(&self, filter: &ListFilter) -> RepositoryResult<i64>;
    fn list_unembedded_policies(&self) -> RepositoryResult<Vec<Policy>>;
}

pub trait PolicyWriter {
    fn create_policy(&self, policy: &NewPolicy) -> RepositoryResult<i32>;
    fn set_policy_embedding(&self, id: i32, embedding: &[f32]) -> RepositoryResult<usize>;
}

#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}
