use std::collections::BTreeMap;
use std::sync::Arc;

use charybdis::types::Uuid;

use crate::context::RequestContext;
use crate::db::{Operation, Store};
use crate::errors::{Inconsistency, SocialError};
use crate::models::traits::Denormalized;
use crate::models::utils::{now, validate_id, validate_text};
use crate::models::{Reaction, ReactionByTarget, TargetType};
use crate::repositories::fanout::{partial_write, Fanout};
use crate::repositories::RepositoryConfig;

/// Reactions are keyed by target and author in `reactions`, and additionally by kind in
/// `reactions_by_target` so a target's reactions can be enumerated and counted per kind.
pub struct ReactionRepository<S> {
    db: Arc<S>,
    config: RepositoryConfig,
}

impl<S> ReactionRepository<S> {
    pub fn new(db: Arc<S>, config: RepositoryConfig) -> Self {
        Self { db, config }
    }
}

impl<S: Store> ReactionRepository<S> {
    fn fanout<'a>(&'a self, ctx: &'a RequestContext) -> Fanout<'a, S> {
        Fanout::new(self.db.as_ref(), ctx)
    }

    /// Reacts to a target, replacing the author's previous reaction (last write wins). When the
    /// kind changes, the view row stored under the old kind is removed after the new rows are
    /// written.
    pub async fn save(
        &self,
        ctx: &RequestContext,
        target_id: Uuid,
        target_type: TargetType,
        author_id: Uuid,
        kind: &str,
    ) -> Result<Reaction, SocialError> {
        validate_id("target_id", target_id)?;
        validate_id("author_id", author_id)?;
        validate_text("kind", kind)?;

        let fanout = self.fanout(ctx);
        let previous = fanout
            .executor()
            .find(Reaction::by_author(target_id, target_type, author_id))
            .await?;

        let reaction = Reaction {
            target_id,
            target_type: target_type.to_string(),
            author_id,
            reaction_kind: kind.to_string(),
            created_at: now(),
        };

        fanout.insert(&reaction).await?;

        if let Some(previous) = previous.filter(|previous| previous.reaction_kind != reaction.reaction_kind) {
            if let Err(e) = fanout.executor().delete(&previous.view()).await {
                let state = Inconsistency::DanglingView;
                let table = "reactions_by_target";

                return Err(partial_write(&previous, state, Operation::Delete, table, e).into());
            }
        }

        Ok(reaction)
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        target_id: Uuid,
        target_type: TargetType,
        author_id: Uuid,
    ) -> Result<Reaction, SocialError> {
        validate_id("target_id", target_id)?;
        validate_id("author_id", author_id)?;

        self.fanout(ctx)
            .executor()
            .find(Reaction::by_author(target_id, target_type, author_id))
            .await?
            .ok_or_else(|| SocialError::NotFound("Reaction not found".to_string()))
    }

    /// Reactions of a target grouped by kind, then by author.
    pub async fn list_by_target(
        &self,
        ctx: &RequestContext,
        target_id: Uuid,
        target_type: TargetType,
        limit: Option<i32>,
    ) -> Result<Vec<Reaction>, SocialError> {
        validate_id("target_id", target_id)?;

        let query = ReactionByTarget::by_target(target_id, target_type).limit(self.config.limit(limit));
        let rows = self.fanout(ctx).executor().list(query).await?;

        Ok(rows.into_iter().map(Reaction::from).collect())
    }

    pub async fn list_by_kind(
        &self,
        ctx: &RequestContext,
        target_id: Uuid,
        target_type: TargetType,
        kind: &str,
        limit: Option<i32>,
    ) -> Result<Vec<Reaction>, SocialError> {
        validate_id("target_id", target_id)?;
        validate_text("kind", kind)?;

        let query = ReactionByTarget::by_kind(target_id, target_type, kind).limit(self.config.limit(limit));
        let rows = self.fanout(ctx).executor().list(query).await?;

        Ok(rows.into_iter().map(Reaction::from).collect())
    }

    pub async fn count(
        &self,
        ctx: &RequestContext,
        target_id: Uuid,
        target_type: TargetType,
        kind: &str,
    ) -> Result<i64, SocialError> {
        validate_id("target_id", target_id)?;
        validate_text("kind", kind)?;

        let query = ReactionByTarget::by_kind(target_id, target_type, kind)
            .with_cql(ReactionByTarget::COUNT_BY_KIND_QUERY);
        let count = self.fanout(ctx).executor().count(query).await?;

        Ok(count)
    }

    /// Scans the whole target partition once and tallies kinds.
    pub async fn count_by_kind(
        &self,
        ctx: &RequestContext,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Result<BTreeMap<String, i64>, SocialError> {
        validate_id("target_id", target_id)?;

        let rows = self
            .fanout(ctx)
            .executor()
            .list(ReactionByTarget::by_target(target_id, target_type))
            .await?;

        let mut counts = BTreeMap::new();

        for row in rows {
            *counts.entry(row.reaction_kind).or_insert(0) += 1;
        }

        Ok(counts)
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        target_id: Uuid,
        target_type: TargetType,
        author_id: Uuid,
    ) -> Result<(), SocialError> {
        let reaction = self.get(ctx, target_id, target_type, author_id).await?;

        self.fanout(ctx).delete(&reaction).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::errors::DbError;

    fn repository() -> (Arc<MemoryStore>, ReactionRepository<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let repository = ReactionRepository::new(store.clone(), RepositoryConfig::default());

        (store, repository)
    }

    #[tokio::test]
    async fn one_reaction_per_author_and_target() {
        let (store, reactions) = repository();
        let ctx = RequestContext::new();
        let post_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();

        reactions.save(&ctx, post_id, TargetType::Post, author_id, "like").await.unwrap();
        let latest = reactions
            .save(&ctx, post_id, TargetType::Post, author_id, "laugh")
            .await
            .unwrap();

        assert_eq!(
            reactions.get(&ctx, post_id, TargetType::Post, author_id).await.unwrap(),
            latest
        );
        assert_eq!(
            reactions.list_by_target(&ctx, post_id, TargetType::Post, None).await.unwrap(),
            vec![latest]
        );
        assert_eq!(store.row_count("reactions"), 1);
        assert_eq!(store.row_count("reactions_by_target"), 1);
    }

    #[tokio::test]
    async fn counts_per_kind() {
        let (_, reactions) = repository();
        let ctx = RequestContext::new();
        let comment_id = Uuid::new_v4();

        for kind in ["like", "like", "wow"] {
            reactions
                .save(&ctx, comment_id, TargetType::Comment, Uuid::new_v4(), kind)
                .await
                .unwrap();
        }
        reactions
            .save(&ctx, comment_id, TargetType::Post, Uuid::new_v4(), "like")
            .await
            .unwrap();

        let counts = reactions
            .count_by_kind(&ctx, comment_id, TargetType::Comment)
            .await
            .unwrap();

        assert_eq!(counts.get("like"), Some(&2));
        assert_eq!(counts.get("wow"), Some(&1));
        assert_eq!(counts.len(), 2);
        assert_eq!(
            reactions.count(&ctx, comment_id, TargetType::Comment, "like").await.unwrap(),
            2
        );
        assert_eq!(
            reactions
                .list_by_kind(&ctx, comment_id, TargetType::Comment, "wow", Some(5))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn delete_removes_both_rows() {
        let (store, reactions) = repository();
        let ctx = RequestContext::new();
        let post_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();
        reactions.save(&ctx, post_id, TargetType::Post, author_id, "like").await.unwrap();

        reactions.delete(&ctx, post_id, TargetType::Post, author_id).await.unwrap();

        assert!(matches!(
            reactions.get(&ctx, post_id, TargetType::Post, author_id).await,
            Err(SocialError::NotFound(_))
        ));
        assert_eq!(store.row_count("reactions_by_target"), 0);
        assert!(matches!(
            reactions.delete(&ctx, post_id, TargetType::Post, author_id).await,
            Err(SocialError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_old_kind_cleanup_leaves_dangling_view() {
        let (store, reactions) = repository();
        let ctx = RequestContext::new();
        let post_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();
        reactions.save(&ctx, post_id, TargetType::Post, author_id, "like").await.unwrap();
        store.fail_next("reactions_by_target", Operation::Delete);

        let res = reactions.save(&ctx, post_id, TargetType::Post, author_id, "sad").await;

        assert!(matches!(
            res,
            Err(SocialError::DatabaseError(DbError::PartialWrite {
                state: Inconsistency::DanglingView,
                ..
            }))
        ));
        assert_eq!(
            reactions
                .get(&ctx, post_id, TargetType::Post, author_id)
                .await
                .unwrap()
                .reaction_kind,
            "sad"
        );
        assert_eq!(store.row_count("reactions_by_target"), 2);
    }
}
