use std::sync::Arc;

use charybdis::types::Uuid;

use crate::context::RequestContext;
use crate::db::Store;
use crate::errors::SocialError;
use crate::models::utils::{now, validate_id, validate_text};
use crate::models::{Comment, CommentByPost};
use crate::repositories::fanout::Fanout;
use crate::repositories::{ensure_author, RepositoryConfig};

pub struct CommentRepository<S> {
    db: Arc<S>,
    config: RepositoryConfig,
}

impl<S> CommentRepository<S> {
    pub fn new(db: Arc<S>, config: RepositoryConfig) -> Self {
        Self { db, config }
    }
}

impl<S: Store> CommentRepository<S> {
    fn fanout<'a>(&'a self, ctx: &'a RequestContext) -> Fanout<'a, S> {
        Fanout::new(self.db.as_ref(), ctx)
    }

    /// The post is not looked up: a comment on a deleted post is only reachable through
    /// `comments_by_post` of that post id.
    pub async fn save(
        &self,
        ctx: &RequestContext,
        author_id: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> Result<Comment, SocialError> {
        self.save_with_id(ctx, Uuid::new_v4(), author_id, post_id, content)
            .await
    }

    pub async fn save_with_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        author_id: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> Result<Comment, SocialError> {
        validate_id("id", id)?;
        validate_id("author_id", author_id)?;
        validate_id("post_id", post_id)?;
        validate_text("content", content)?;

        let now = now();
        let comment = Comment {
            id,
            post_id,
            author_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.fanout(ctx).insert(&comment).await?;

        Ok(comment)
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> Result<Comment, SocialError> {
        validate_id("id", id)?;

        self.fanout(ctx)
            .executor()
            .find(Comment::by_id(id))
            .await?
            .ok_or_else(|| SocialError::NotFound("Comment not found".to_string()))
    }

    pub async fn list_by_post(
        &self,
        ctx: &RequestContext,
        post_id: Uuid,
        limit: Option<i32>,
    ) -> Result<Vec<Comment>, SocialError> {
        validate_id("post_id", post_id)?;

        let query = CommentByPost::by_post(post_id).limit(self.config.limit(limit));
        let rows = self.fanout(ctx).executor().list(query).await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    /// `COUNT` over the post's partition; no counter table is kept.
    pub async fn count_by_post(&self, ctx: &RequestContext, post_id: Uuid) -> Result<i64, SocialError> {
        validate_id("post_id", post_id)?;

        let query = CommentByPost::by_post(post_id).with_cql(CommentByPost::COUNT_BY_POST_QUERY);
        let count = self.fanout(ctx).executor().count(query).await?;

        Ok(count)
    }

    pub async fn update(&self, ctx: &RequestContext, id: Uuid, content: &str) -> Result<Comment, SocialError> {
        validate_text("content", content)?;

        let mut comment = self.get(ctx, id).await?;

        comment.content = content.to_string();
        comment.updated_at = now();

        self.fanout(ctx).update(&comment).await?;

        Ok(comment)
    }

    pub async fn delete(&self, ctx: &RequestContext, caller_id: Uuid, id: Uuid) -> Result<(), SocialError> {
        let comment = self.get(ctx, id).await?;

        ensure_author(&comment, caller_id, "comment")?;

        self.fanout(ctx).delete(&comment).await?;

        Ok(())
    }
}
