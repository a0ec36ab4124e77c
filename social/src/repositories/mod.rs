use std::sync::Arc;

use charybdis::types::Uuid;
use serde::Deserialize;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MUTUAL_SCAN_LIMIT};
use crate::errors::SocialError;
use crate::models::traits::{Authored, Id};

mod comment_repository;
mod fanout;
mod post_repository;
mod profile_repository;
mod reaction_repository;
mod subscription_repository;

pub use comment_repository::CommentRepository;
pub use post_repository::PostRepository;
pub use profile_repository::ProfileRepository;
pub use reaction_repository::ReactionRepository;
pub use subscription_repository::SubscriptionRepository;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    pub default_page_size: i32,
    pub max_page_size: i32,
    pub mutual_scan_limit: i32,
    /// Deadline applied to each request context built by the app. `None` leaves requests
    /// unbounded apart from the driver's own timeouts.
    pub statement_timeout_ms: Option<u64>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            mutual_scan_limit: MUTUAL_SCAN_LIMIT,
            statement_timeout_ms: None,
        }
    }
}

impl RepositoryConfig {
    /// Row limit for a list call: absent or non-positive falls back to the default page size,
    /// anything above the maximum is clamped.
    pub fn limit(&self, requested: Option<i32>) -> i32 {
        match requested {
            Some(limit) if limit > 0 => limit.min(self.max_page_size),
            _ => self.default_page_size,
        }
    }
}

/// Every repository, sharing one store handle.
pub struct Repositories<S> {
    pub posts: PostRepository<S>,
    pub comments: CommentRepository<S>,
    pub reactions: ReactionRepository<S>,
    pub subscriptions: SubscriptionRepository<S>,
    pub profiles: ProfileRepository<S>,
}

impl<S> Repositories<S> {
    pub fn new(db: Arc<S>, config: &RepositoryConfig) -> Self {
        Self {
            posts: PostRepository::new(db.clone(), config.clone()),
            comments: CommentRepository::new(db.clone(), config.clone()),
            reactions: ReactionRepository::new(db.clone(), config.clone()),
            subscriptions: SubscriptionRepository::new(db.clone(), config.clone()),
            profiles: ProfileRepository::new(db),
        }
    }
}

fn ensure_author<E: Authored + Id>(entity: &E, caller_id: Uuid, kind: &str) -> Result<(), SocialError> {
    if entity.author_id() != caller_id {
        return Err(SocialError::Forbidden(format!(
            "Only the author can delete {} {}",
            kind,
            entity.id()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_falls_back_and_clamps() {
        let config = RepositoryConfig::default();

        assert_eq!(config.limit(None), DEFAULT_PAGE_SIZE);
        assert_eq!(config.limit(Some(0)), DEFAULT_PAGE_SIZE);
        assert_eq!(config.limit(Some(-3)), DEFAULT_PAGE_SIZE);
        assert_eq!(config.limit(Some(10)), 10);
        assert_eq!(config.limit(Some(MAX_PAGE_SIZE + 1)), MAX_PAGE_SIZE);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: RepositoryConfig = toml::from_str("default_page_size = 5").unwrap();

        assert_eq!(config.default_page_size, 5);
        assert_eq!(config.max_page_size, MAX_PAGE_SIZE);
        assert_eq!(config.statement_timeout_ms, None);
    }
}
