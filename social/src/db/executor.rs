use futures::TryStreamExt;

use crate::context::RequestContext;
use crate::db::query::Query;
use crate::db::store::Store;
use crate::db::table::Table;
use crate::errors::DbError;

/// Runs single statements through a [`Store`], each bounded by the request context.
pub struct Executor<'a, S> {
    db: &'a S,
    ctx: &'a RequestContext,
}

impl<'a, S: Store> Executor<'a, S> {
    pub fn new(db: &'a S, ctx: &'a RequestContext) -> Self {
        Self { db, ctx }
    }

    pub async fn insert<M: Table>(&self, model: &M) -> Result<(), DbError> {
        self.ctx
            .run(M::DB_MODEL_NAME, |timeout| self.db.insert(model, timeout))
            .await
    }

    pub async fn delete<M: Table>(&self, model: &M) -> Result<(), DbError> {
        self.ctx
            .run(M::DB_MODEL_NAME, |timeout| self.db.delete(model, timeout))
            .await
    }

    /// First row addressed by `query`.
    pub async fn find<M: Table>(&self, query: Query<M>) -> Result<Option<M>, DbError> {
        let mut rows = self.list(query.limit(1)).await?;

        Ok(rows.pop())
    }

    /// Rows addressed by `query` in clustering order, up to its limit. The deadline covers
    /// reading every page.
    pub async fn list<M: Table>(&self, query: Query<M>) -> Result<Vec<M>, DbError> {
        let query = &query;

        self.ctx
            .run(M::DB_MODEL_NAME, |timeout| async move {
                self.db.select(query, timeout).await?.try_collect().await
            })
            .await
    }

    /// Cost grows with the rows counted.
    pub async fn count<M: Table>(&self, query: Query<M>) -> Result<i64, DbError> {
        self.ctx
            .run(M::DB_MODEL_NAME, |timeout| self.db.count(&query, timeout))
            .await
    }
}
