use charybdis::model::BaseModel;

use crate::context::RequestContext;
use crate::db::{Executor, Operation, Store};
use crate::errors::{DbError, Inconsistency};
use crate::models::traits::Denormalized;

/// Runs the two-table protocol of a [`Denormalized`] entity: the primary table first, then the
/// view, stopping at the first failing statement. Nothing is rolled back.
pub(crate) struct Fanout<'a, S> {
    executor: Executor<'a, S>,
}

impl<'a, S: Store> Fanout<'a, S> {
    pub fn new(db: &'a S, ctx: &'a RequestContext) -> Self {
        Self {
            executor: Executor::new(db, ctx),
        }
    }

    pub fn executor(&self) -> &Executor<'a, S> {
        &self.executor
    }

    pub async fn insert<E: Denormalized>(&self, entity: &E) -> Result<(), DbError> {
        self.write(entity, Operation::Insert).await
    }

    /// Rewrites every column of `entity` in both tables. The entity must carry the pre-read
    /// clustering values (`created_at`), so the view row keeps its position. A view row missing
    /// from an earlier failure is written back whole.
    pub async fn update<E: Denormalized>(&self, entity: &E) -> Result<(), DbError> {
        self.write(entity, Operation::Update).await
    }

    pub async fn delete<E: Denormalized>(&self, entity: &E) -> Result<(), DbError> {
        if let Err(e) = self.executor.delete(entity).await {
            return Err(primary_failed(entity, Operation::Delete, e));
        }

        let view = entity.view();

        if let Err(e) = self.executor.delete(&view).await {
            let state = E::partial_failure(Operation::Delete);
            let table = <E::View as BaseModel>::DB_MODEL_NAME;

            return Err(partial_write(entity, state, Operation::Delete, table, e));
        }

        Ok(())
    }

    async fn write<E: Denormalized>(&self, entity: &E, operation: Operation) -> Result<(), DbError> {
        if let Err(e) = self.executor.insert(entity).await {
            return Err(primary_failed(entity, operation, e));
        }

        let view = entity.view();

        if let Err(e) = self.executor.insert(&view).await {
            let state = E::partial_failure(operation);
            let table = <E::View as BaseModel>::DB_MODEL_NAME;

            return Err(partial_write(entity, state, operation, table, e));
        }

        Ok(())
    }
}

fn primary_failed<E: Denormalized>(entity: &E, operation: Operation, source: DbError) -> DbError {
    log::error!(
        "{} {} failed on {} ({}): {}",
        E::KIND,
        operation,
        E::DB_MODEL_NAME,
        entity.log_key(),
        source
    );

    source
}

/// Logs the state a stopped protocol leaves behind, with what a repair job needs to find it.
pub(crate) fn partial_write<E: Denormalized>(
    entity: &E,
    state: Inconsistency,
    operation: Operation,
    failed_table: &'static str,
    source: DbError,
) -> DbError {
    log::error!(
        "[{}] {} {} stopped at {} ({}): {}",
        state,
        E::KIND,
        operation,
        failed_table,
        entity.log_key(),
        source
    );

    DbError::PartialWrite {
        state,
        failed_table,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::utils::now;
    use crate::models::{Post, Subscription};
    use charybdis::types::Uuid;

    fn post() -> Post {
        let now = now();

        Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: "hi".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn writes_primary_before_view() {
        let store = MemoryStore::new();
        let ctx = RequestContext::new();

        Fanout::new(&store, &ctx).insert(&post()).await.unwrap();

        assert_eq!(
            store.journal(),
            vec![(Operation::Insert, "posts"), (Operation::Insert, "posts_by_author")]
        );
    }

    #[tokio::test]
    async fn primary_failure_writes_nothing() {
        let store = MemoryStore::new();
        let ctx = RequestContext::new();
        store.fail_next("posts", Operation::Insert);

        let err = Fanout::new(&store, &ctx).insert(&post()).await.unwrap_err();

        assert_eq!(err.inconsistency(), None);
        assert_eq!(store.journal(), vec![(Operation::Insert, "posts")]);
    }

    #[tokio::test]
    async fn view_failure_reports_partial_write() {
        let store = MemoryStore::new();
        let ctx = RequestContext::new();
        let post = post();
        let fanout = Fanout::new(&store, &ctx);

        fanout.insert(&post).await.unwrap();
        store.fail_next("posts_by_author", Operation::Delete);

        let err = fanout.delete(&post).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::PartialWrite {
                state: Inconsistency::DanglingView,
                failed_table: "posts_by_author",
                ..
            }
        ));
        assert_eq!(store.row_count("posts"), 0);
        assert_eq!(store.row_count("posts_by_author"), 1);
    }

    #[tokio::test]
    async fn update_writes_whole_rows() {
        let store = MemoryStore::new();
        let ctx = RequestContext::new();
        let mut post = post();
        let fanout = Fanout::new(&store, &ctx);

        fanout.insert(&post).await.unwrap();
        post.content = "edited".to_string();
        fanout.update(&post).await.unwrap();

        assert_eq!(
            store.journal()[2..],
            [(Operation::Insert, "posts"), (Operation::Insert, "posts_by_author")]
        );
        assert_eq!(store.row_count("posts_by_author"), 1);
    }

    #[tokio::test]
    async fn edge_failure_is_one_sided() {
        let store = MemoryStore::new();
        let ctx = RequestContext::new();
        let edge = Subscription {
            follower_id: Uuid::new_v4(),
            following_id: Uuid::new_v4(),
            created_at: now(),
        };
        store.fail_next("followers", Operation::Insert);

        let err = Fanout::new(&store, &ctx).insert(&edge).await.unwrap_err();

        assert_eq!(err.inconsistency(), Some(Inconsistency::OneSidedEdge));
        assert_eq!(store.row_count("subscriptions"), 1);
        assert_eq!(store.row_count("followers"), 0);
    }
}
