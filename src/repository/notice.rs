use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;

use crate::domain::notice::{NaturalKey, NewNotice, Notice, NoticePatch, backfill_patch};
use crate::models::notice::{NewNoticeRow, NoticeChangeset, NoticeRow};
use crate::models::{vector_from_blob, vector_to_blob};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::vector::rank_by_similarity;
use crate::repository::{DieselRepository, ListFilter, NoticeReader, NoticeWriter, UpsertOutcome};

fn filtered(filter: &ListFilter) -> crate::schema::notices::BoxedQuery<'static, diesel::sqlite::Sqlite> {
    use crate::schema::notices;

    let mut query = notices::table.into_boxed();
    if let Some(category) = &filter.category {
        query = query.filter(notices::category.eq(category.clone()));
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{term}%");
        query = query.filter(
            notices::title
                .like(pattern.clone())
                .or(notices::content_summary.like(pattern)),
        );
    }
    query
}

impl NoticeReader for DieselRepository {
    fn get_notice(&self, id: i32) -> RepositoryResult<Notice> {
        use crate::schema::notices;

        let mut conn = self.conn()?;
        let row = notices::table
            .filter(notices::id.eq(id))
            .first::<NoticeRow>(&mut conn)?;
        Ok(row.into())
    }

    fn list_notices(
        &self,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<Notice>> {
        use crate::schema::notices;

        let mut conn = self.conn()?;
        let rows = filtered(filter)
            .order(notices::created_at.desc())
            .then_order_by(notices::id.desc())
            .limit(limit)
            .offset(offset)
            .load::<NoticeRow>(&mut conn)?;
        Ok(rows.into_iter().map(Notice::from).collect())
    }

    fn count_notices(&self, filter: &ListFilter) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        Ok(filtered(filter).count().get_result(&mut conn)?)
    }

    fn list_unembedded_notices(&self) -> RepositoryResult<Vec<Notice>> {
        use crate::schema::notices;

        let mut conn = self.conn()?;
        let rows = notices::table
            .filter(notices::embedding.is_null())
            .order(notices::id.asc())
            .load::<NoticeRow>(&mut conn)?;
        Ok(rows.into_iter().map(Notice::from).collect())
    }

    fn list_stale_notices(&self) -> RepositoryResult<Vec<Notice>> {
        use crate::schema::notices;

        let mut conn = self.conn()?;
        let rows = notices::table
            .filter(notices::policy_number.is_not_null())
            .filter(notices::start_date.is_null())
            .order(notices::id.asc())
            .load::<NoticeRow>(&mut conn)?;
        Ok(rows.into_iter().map(Notice::from).collect())
    }

    fn nearest_notices(
        &self,
        query: &[f32],
        threshold: f32,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<(Notice, f32)>> {
        use crate::schema::notices;

        let mut conn = self.conn()?;
        let stored: Vec<(i32, Option<Vec<u8>>)> = notices::table
            .filter(notices::embedding.is_not_null())
            .select((notices::id, notices::embedding))
            .load(&mut conn)?;

        let candidates: Vec<(i32, Vec<f32>)> = stored
            .into_iter()
            .filter_map(|(id, blob)| blob.map(|blob| (id, vector_from_blob(&blob))))
            .collect();

        let ranked = rank_by_similarity(query, &candidates, threshold)?;
        let page: Vec<(i32, f32)> = ranked
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        if page.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = page.iter().map(|(id, _)| *id).collect();
        let rows = notices::table
            .filter(notices::id.eq_any(&ids))
            .load::<NoticeRow>(&mut conn)?;
        let mut by_id: HashMap<i32, Notice> = rows
            .into_iter()
            .map(|row| (row.id, Notice::from(row)))
            .collect();

        Ok(page
            .into_iter()
            .filter_map(|(id, similarity)| by_id.remove(&id).map(|notice| (notice, similarity)))
            .collect())
    }

    fn count_nearest_notices(&self, query: &[f32], threshold: f32) -> RepositoryResult<i64> {
        use crate::schema::notices;

        let mut conn = self.conn()?;
        let stored: Vec<(i32, Option<Vec<u8>>)> = notices::table
            .filter(notices::embedding.is_not_null())
            .select((notices::id, notices::embedding))
            .load(&mut conn)?;

        let candidates: Vec<(i32, Vec<f32>)> = stored
            .into_iter()
            .filter_map(|(id, blob)| blob.map(|blob| (id, vector_from_blob(&blob))))
            .collect();

        Ok(rank_by_similarity(query, &candidates, threshold)?.len() as i64)
    }
}

impl NoticeWriter for DieselRepository {
    fn upsert_notice(&self, notice: &NewNotice) -> RepositoryResult<UpsertOutcome> {
        use crate::schema::notices;

        let key = notice.natural_key().ok_or_else(|| {
            RepositoryError::Validation(format!("notice {:?} has no natural key", notice.title))
        })?;

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let existing = match key {
                NaturalKey::PolicyNumber(number) => notices::table
                    .filter(notices::policy_number.eq(number))
                    .first::<NoticeRow>(conn)
                    .optional()?,
                NaturalKey::Url(url) => notices::table
                    .filter(notices::original_url.eq(url))
                    .first::<NoticeRow>(conn)
                    .optional()?,
            };

            let Some(row) = existing else {
                diesel::insert_into(notices::table)
                    .values(NewNoticeRow::from(notice))
                    .execute(conn)?;
                return Ok(UpsertOutcome::Inserted);
            };

            let stored: Notice = row.into();
            let patch = backfill_patch(&stored, notice);
            if patch.is_empty() {
                return Ok(UpsertOutcome::Duplicate);
            }

            let mut changeset = NoticeChangeset::from(patch);
            changeset.updated_at = Some(Utc::now().naive_utc());
            diesel::update(notices::table.filter(notices::id.eq(stored.id)))
                .set(&changeset)
                .execute(conn)?;
            Ok(UpsertOutcome::Updated)
        })
    }

    fn backfill_notice(&self, id: i32, patch: NoticePatch) -> RepositoryResult<usize> {
        use crate::schema::notices;

        let mut conn = self.conn()?;
        let mut changeset = NoticeChangeset::from(patch);
        changeset.updated_at = Some(Utc::now().naive_utc());

        let affected = diesel::update(notices::table.filter(notices::id.eq(id)))
            .set(&changeset)
            .execute(&mut conn)?;
        Ok(affected)
    }

    fn set_notice_embedding(&self, id: i32, embedding: &[f32]) -> RepositoryResult<usize> {
        use crate::schema::notices;

        let mut conn = self.conn()?;
        let blob = vector_to_blob(embedding);

        let affected = diesel::update(notices::table.filter(notices::id.eq(id)))
            .set(notices::embedding.eq(blob))
            .execute(&mut conn)?;
        Ok(affected)
    }
}
