use std::collections::HashSet;
use std::sync::Arc;

use charybdis::types::Uuid;

use crate::context::RequestContext;
use crate::db::Store;
use crate::errors::SocialError;
use crate::models::utils::{now, validate_id};
use crate::models::{Follower, Subscription};
use crate::repositories::fanout::Fanout;
use crate::repositories::RepositoryConfig;

/// Follow edges, stored once per direction: `subscriptions` by follower and `followers` by the
/// followed user. Writes go to `subscriptions` first.
pub struct SubscriptionRepository<S> {
    db: Arc<S>,
    config: RepositoryConfig,
}

impl<S> SubscriptionRepository<S> {
    pub fn new(db: Arc<S>, config: RepositoryConfig) -> Self {
        Self { db, config }
    }
}

impl<S: Store> SubscriptionRepository<S> {
    fn fanout<'a>(&'a self, ctx: &'a RequestContext) -> Fanout<'a, S> {
        Fanout::new(self.db.as_ref(), ctx)
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<Subscription, SocialError> {
        validate_id("follower_id", follower_id)?;
        validate_id("following_id", following_id)?;

        if follower_id == following_id {
            return Err(SocialError::validation("user", "cannot follow yourself"));
        }

        if self.is_following(ctx, follower_id, following_id).await? {
            return Err(SocialError::validation("user", "already following"));
        }

        let subscription = Subscription {
            follower_id,
            following_id,
            created_at: now(),
        };

        self.fanout(ctx).insert(&subscription).await?;

        Ok(subscription)
    }

    pub async fn delete(&self, ctx: &RequestContext, follower_id: Uuid, following_id: Uuid) -> Result<(), SocialError> {
        validate_id("follower_id", follower_id)?;
        validate_id("following_id", following_id)?;

        let subscription = self
            .fanout(ctx)
            .executor()
            .find(Subscription::edge(follower_id, following_id))
            .await?
            .ok_or_else(|| SocialError::NotFound("Subscription not found".to_string()))?;

        self.fanout(ctx).delete(&subscription).await?;

        Ok(())
    }

    /// Looks at `subscriptions` only.
    pub async fn is_following(
        &self,
        ctx: &RequestContext,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<bool, SocialError> {
        let subscription = self
            .fanout(ctx)
            .executor()
            .find(Subscription::edge(follower_id, following_id))
            .await?;

        Ok(subscription.is_some())
    }

    /// Users `user_id` follows, ordered by their id.
    pub async fn get_following(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        limit: Option<i32>,
    ) -> Result<Vec<Subscription>, SocialError> {
        validate_id("user_id", user_id)?;

        let query = Subscription::by_follower(user_id).limit(self.config.limit(limit));
        let following = self.fanout(ctx).executor().list(query).await?;

        Ok(following)
    }

    /// Users following `user_id`, ordered by their id.
    pub async fn get_followers(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        limit: Option<i32>,
    ) -> Result<Vec<Subscription>, SocialError> {
        validate_id("user_id", user_id)?;

        let query = Follower::by_following(user_id).limit(self.config.limit(limit));
        let rows = self.fanout(ctx).executor().list(query).await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    /// `COUNT` scan of the user's `followers` partition. Cost grows with the follower count; no
    /// counter table is maintained.
    pub async fn count_followers(&self, ctx: &RequestContext, user_id: Uuid) -> Result<i64, SocialError> {
        validate_id("user_id", user_id)?;

        let query = Follower::by_following(user_id).with_cql(Follower::COUNT_BY_FOLLOWING_QUERY);
        let count = self.fanout(ctx).executor().count(query).await?;

        Ok(count)
    }

    pub async fn count_following(&self, ctx: &RequestContext, user_id: Uuid) -> Result<i64, SocialError> {
        validate_id("user_id", user_id)?;

        let query = Subscription::by_follower(user_id).with_cql(Subscription::COUNT_BY_FOLLOWER_QUERY);
        let count = self.fanout(ctx).executor().count(query).await?;

        Ok(count)
    }

    /// Users both `user_id` and `other_id` follow. Each following list is read up to
    /// `mutual_scan_limit` rows; follows beyond that are not considered.
    pub async fn get_mutual_followings(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        other_id: Uuid,
    ) -> Result<Vec<Uuid>, SocialError> {
        validate_id("user_id", user_id)?;
        validate_id("other_id", other_id)?;

        let (following, other_following) = futures::try_join!(
            self.following_ids(ctx, user_id),
            self.following_ids(ctx, other_id)
        )?;

        let other_following: HashSet<Uuid> = other_following.into_iter().collect();

        Ok(following
            .into_iter()
            .filter(|id| other_following.contains(id))
            .collect())
    }

    async fn following_ids(&self, ctx: &RequestContext, user_id: Uuid) -> Result<Vec<Uuid>, SocialError> {
        let query = Subscription::by_follower(user_id).limit(self.config.mutual_scan_limit);
        let following = self.fanout(ctx).executor().list(query).await?;

        Ok(following.into_iter().map(|edge| edge.following_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, Operation};
    use crate::errors::{DbError, Inconsistency};

    fn repository() -> (Arc<MemoryStore>, SubscriptionRepository<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let repository = SubscriptionRepository::new(store.clone(), RepositoryConfig::default());

        (store, repository)
    }

    #[tokio::test]
    async fn follow_is_visible_from_both_sides() {
        let (_, subscriptions) = repository();
        let ctx = RequestContext::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let edge = subscriptions.create(&ctx, a, b).await.unwrap();

        assert!(subscriptions.is_following(&ctx, a, b).await.unwrap());
        assert!(!subscriptions.is_following(&ctx, b, a).await.unwrap());
        assert_eq!(subscriptions.get_following(&ctx, a, None).await.unwrap(), vec![edge.clone()]);
        assert_eq!(subscriptions.get_followers(&ctx, b, None).await.unwrap(), vec![edge]);
    }

    #[tokio::test]
    async fn unfollow_removes_both_sides() {
        let (store, subscriptions) = repository();
        let ctx = RequestContext::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        subscriptions.create(&ctx, a, b).await.unwrap();

        subscriptions.delete(&ctx, a, b).await.unwrap();

        assert!(!subscriptions.is_following(&ctx, a, b).await.unwrap());
        assert!(subscriptions.get_following(&ctx, a, None).await.unwrap().is_empty());
        assert!(subscriptions.get_followers(&ctx, b, None).await.unwrap().is_empty());
        assert_eq!(store.row_count("followers"), 0);
    }

    #[tokio::test]
    async fn lists_come_back_in_id_order() {
        let (_, subscriptions) = repository();
        let ctx = RequestContext::new();
        let user = Uuid::new_v4();
        let mut followed = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

        for id in &followed {
            subscriptions.create(&ctx, user, *id).await.unwrap();
        }

        followed.sort();
        let listed: Vec<Uuid> = subscriptions
            .get_following(&ctx, user, None)
            .await
            .unwrap()
            .into_iter()
            .map(|edge| edge.following_id)
            .collect();

        assert_eq!(listed, followed);
    }

    #[tokio::test]
    async fn second_follow_is_rejected() {
        let (_, subscriptions) = repository();
        let ctx = RequestContext::new();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        subscriptions.create(&ctx, u1, u2).await.unwrap();
        let res = subscriptions.create(&ctx, u1, u2).await;

        match res {
            Err(SocialError::ValidationError((_, message))) => assert_eq!(message, "already following"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(subscriptions.count_followers(&ctx, u2).await.unwrap(), 1);
        assert_eq!(subscriptions.count_following(&ctx, u1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn self_follow_is_rejected() {
        let (store, subscriptions) = repository();
        let ctx = RequestContext::new();
        let user = Uuid::new_v4();

        assert!(matches!(
            subscriptions.create(&ctx, user, user).await,
            Err(SocialError::ValidationError(_))
        ));
        assert!(store.journal().is_empty());
    }

    #[tokio::test]
    async fn unfollow_without_edge_is_not_found() {
        let (_, subscriptions) = repository();
        let ctx = RequestContext::new();

        let res = subscriptions.delete(&ctx, Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(matches!(res, Err(SocialError::NotFound(_))));
    }

    #[tokio::test]
    async fn mutual_followings_intersect() {
        let (_, subscriptions) = repository();
        let ctx = RequestContext::new();
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        subscriptions.create(&ctx, a, c).await.unwrap();
        subscriptions.create(&ctx, b, c).await.unwrap();
        subscriptions.create(&ctx, a, d).await.unwrap();

        assert_eq!(subscriptions.get_mutual_followings(&ctx, a, b).await.unwrap(), vec![c]);
        assert_eq!(subscriptions.get_mutual_followings(&ctx, b, a).await.unwrap(), vec![c]);
        assert!(subscriptions
            .get_mutual_followings(&ctx, a, Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn failed_followers_write_leaves_one_sided_edge() {
        let (store, subscriptions) = repository();
        let ctx = RequestContext::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.fail_next("followers", Operation::Insert);

        let res = subscriptions.create(&ctx, a, b).await;

        assert!(matches!(
            res,
            Err(SocialError::DatabaseError(DbError::PartialWrite {
                state: Inconsistency::OneSidedEdge,
                failed_table: "followers",
                ..
            }))
        ));
        assert!(subscriptions.is_following(&ctx, a, b).await.unwrap());
        assert_eq!(subscriptions.count_followers(&ctx, b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_followers_delete_leaves_one_sided_edge() {
        let (store, subscriptions) = repository();
        let ctx = RequestContext::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        subscriptions.create(&ctx, a, b).await.unwrap();
        store.fail_next("followers", Operation::Delete);

        let err = subscriptions.delete(&ctx, a, b).await.unwrap_err();

        match err {
            SocialError::DatabaseError(db_err) => {
                assert_eq!(db_err.inconsistency(), Some(Inconsistency::OneSidedEdge))
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(!subscriptions.is_following(&ctx, a, b).await.unwrap());
        assert_eq!(subscriptions.get_followers(&ctx, b, None).await.unwrap().len(), 1);
    }
}
