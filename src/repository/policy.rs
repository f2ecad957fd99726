use diesel::prelude::*;

use crate::domain::policy::{NewPolicy, Policy};
use crate::models::policy::{NewPolicyRow, PolicyRow};
use crate::models::vector_to_blob;
use crate::repository::errors::RepositoryResult;
use crate::repository::{DieselRepository, ListFilter, PolicyReader, PolicyWriter};

fn filtered(filter: &ListFilter) -> crate::schema::policies::BoxedQuery<'static, diesel::sqlite::Sqlite> {
    use crate::schema::policies;

    let mut query = policies::table.into_boxed();
    if let Some(category) = &filter.category {
        query = query.filter(policies::category.eq(category.clone()));
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{term}%");
        query = query.filter(
            policies::title
                .like(pattern.clone())
                .or(policies::content_summary.like(pattern)),
        );
    }
    query
}

impl PolicyReader for DieselRepository {
    fn get_policy(&self, id: i32) -> RepositoryResult<Policy> {
        use crate::schema::policies;

        let mut conn = self.conn()?;
        let row = policies::table
            .filter(policies::id.eq(id))
            .first::<PolicyRow>(&mut conn)?;
        Ok(row.into())
    }

    fn list_policies(
        &self,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<Policy>> {
        use crate::schema::policies;

        let mut conn = self.conn()?;
        let rows = filtered(filter)
            .order(policies::created_at.desc())
            .then_order_by(policies::id.desc())
            .limit(limit)
            .offset(offset)
            .load::<PolicyRow>(&mut conn)?;
        Ok(rows.into_iter().map(Policy::from).collect())
    }

    fn count_policies(&self, filter: &ListFilter) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        Ok(filtered(filter).count().get_result(&mut conn)?)
    }

    fn list_unembedded_policies(&self) -> RepositoryResult<Vec<Policy>> {
        use crate::schema::policies;

        let mut conn = self.conn()?;
        let rows = policies::table
            .filter(policies::embedding.is_null())
            .order(policies::id.asc())
            .load::<PolicyRow>(&mut conn)?;
        Ok(rows.into_iter().map(Policy::from).collect())
    }
}

impl PolicyWriter for DieselRepository {
    fn create_policy(&self, policy: &NewPolicy) -> RepositoryResult<i32> {
        use crate::schema::policies;

        let mut conn = self.conn()?;
        let id = diesel::insert_into(policies::table)
            .values(NewPolicyRow::from(policy))
            .returning(policies::id)
            .get_result::<i32>(&mut conn)?;
        Ok(id)
    }

    fn set_policy_embedding(&self, id: i32, embedding: &[f32]) -> RepositoryResult<usize> {
        use crate::schema::policies;

        let mut conn = self.conn()?;
        let blob = vector_to_blob(embedding);

        let affected = diesel::update(policies::table.filter(policies::id.eq(id)))
            .set(policies::embedding.eq(blob))
            .execute(&mut conn)?;
        Ok(affected)
    }
}
