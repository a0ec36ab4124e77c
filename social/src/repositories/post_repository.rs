use std::sync::Arc;

use charybdis::types::Uuid;

use crate::context::RequestContext;
use crate::db::Store;
use crate::errors::SocialError;
use crate::models::utils::{now, validate_id, validate_text};
use crate::models::{FeedEntry, Post, PostByAuthor};
use crate::repositories::fanout::Fanout;
use crate::repositories::{ensure_author, RepositoryConfig};

/// Posts live in `posts` (by id) and `posts_by_author` (newest first per author).
pub struct PostRepository<S> {
    db: Arc<S>,
    config: RepositoryConfig,
}

impl<S> PostRepository<S> {
    pub fn new(db: Arc<S>, config: RepositoryConfig) -> Self {
        Self { db, config }
    }
}

impl<S: Store> PostRepository<S> {
    fn fanout<'a>(&'a self, ctx: &'a RequestContext) -> Fanout<'a, S> {
        Fanout::new(self.db.as_ref(), ctx)
    }

    pub async fn save(&self, ctx: &RequestContext, author_id: Uuid, content: &str) -> Result<Post, SocialError> {
        self.save_with_id(ctx, Uuid::new_v4(), author_id, content).await
    }

    /// Creates the post under a caller-chosen id. Retrying a failed save with the same id
    /// overwrites the same rows instead of creating a duplicate.
    pub async fn save_with_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<Post, SocialError> {
        validate_id("id", id)?;
        validate_id("author_id", author_id)?;
        validate_text("content", content)?;

        let now = now();
        let post = Post {
            id,
            author_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.fanout(ctx).insert(&post).await?;

        Ok(post)
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> Result<Post, SocialError> {
        validate_id("id", id)?;

        self.fanout(ctx)
            .executor()
            .find(Post::by_id(id))
            .await?
            .ok_or_else(|| SocialError::NotFound("Post not found".to_string()))
    }

    pub async fn list_by_author(
        &self,
        ctx: &RequestContext,
        author_id: Uuid,
        limit: Option<i32>,
    ) -> Result<Vec<Post>, SocialError> {
        validate_id("author_id", author_id)?;

        let rows = self
            .fanout(ctx)
            .executor()
            .list(PostByAuthor::by_author(author_id).limit(self.config.limit(limit)))
            .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Posts of followed authors, newest first. The feed rows are written elsewhere.
    pub async fn get_feed(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        limit: Option<i32>,
    ) -> Result<Vec<FeedEntry>, SocialError> {
        validate_id("user_id", user_id)?;

        let entries = self
            .fanout(ctx)
            .executor()
            .list(FeedEntry::by_user(user_id).limit(self.config.limit(limit)))
            .await?;

        Ok(entries)
    }

    pub async fn update(&self, ctx: &RequestContext, id: Uuid, content: &str) -> Result<Post, SocialError> {
        validate_text("content", content)?;

        let mut post = self.get(ctx, id).await?;

        post.content = content.to_string();
        post.updated_at = now();

        self.fanout(ctx).update(&post).await?;

        Ok(post)
    }

    /// Deletes the post and its `posts_by_author` row. Feed rows pointing at it are left to the
    /// feed builder.
    pub async fn delete(&self, ctx: &RequestContext, caller_id: Uuid, id: Uuid) -> Result<(), SocialError> {
        let post = self.get(ctx, id).await?;

        ensure_author(&post, caller_id, "post")?;

        self.fanout(ctx).delete(&post).await?;

        Ok(())
    }
}
