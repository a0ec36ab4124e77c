use std::sync::Arc;

use charybdis::types::Uuid;
use email_address::EmailAddress;

use crate::context::RequestContext;
use crate::db::{Executor, Store};
use crate::errors::SocialError;
use crate::models::utils::{now, validate_id, validate_text};
use crate::models::{Profile, ProfileChanges};

/// Single-table entity: every operation is one statement plus its pre-reads, so no partial
/// state can be left behind.
pub struct ProfileRepository<S> {
    db: Arc<S>,
}

impl<S> ProfileRepository<S> {
    pub fn new(db: Arc<S>) -> Self {
        Self { db }
    }
}

impl<S: Store> ProfileRepository<S> {
    fn executor<'a>(&'a self, ctx: &'a RequestContext) -> Executor<'a, S> {
        Executor::new(self.db.as_ref(), ctx)
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Profile, SocialError> {
        validate_id("user_id", user_id)?;
        validate_text("first_name", first_name)?;
        validate_text("last_name", last_name)?;
        validate_email(email)?;

        if self.find(ctx, user_id).await?.is_some() {
            return Err(SocialError::validation("user", "already has a profile"));
        }

        self.validate_email_free(ctx, email, None).await?;

        let now = now();
        let profile = Profile {
            user_id,
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.executor(ctx).insert(&profile).await?;

        Ok(profile)
    }

    pub async fn get(&self, ctx: &RequestContext, user_id: Uuid) -> Result<Profile, SocialError> {
        validate_id("user_id", user_id)?;

        self.find(ctx, user_id)
            .await?
            .ok_or_else(|| SocialError::NotFound("Profile not found".to_string()))
    }

    /// Reads through the secondary index on `email`.
    pub async fn get_by_email(&self, ctx: &RequestContext, email: &str) -> Result<Profile, SocialError> {
        validate_text("email", email)?;

        self.find_by_email(ctx, email)
            .await?
            .ok_or_else(|| SocialError::NotFound("Profile not found".to_string()))
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Profile, SocialError> {
        let mut profile = self.get(ctx, user_id).await?;

        if let Some(email) = changes.email {
            if email != profile.email {
                validate_email(&email)?;
                self.validate_email_free(ctx, &email, Some(user_id)).await?;

                profile.email = email;
            }
        }

        if let Some(first_name) = changes.first_name {
            validate_text("first_name", &first_name)?;
            profile.first_name = first_name;
        }

        if let Some(last_name) = changes.last_name {
            validate_text("last_name", &last_name)?;
            profile.last_name = last_name;
        }

        profile.updated_at = now();

        self.executor(ctx).insert(&profile).await?;

        Ok(profile)
    }

    pub async fn delete(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), SocialError> {
        let profile = self.get(ctx, user_id).await?;

        self.executor(ctx).delete(&profile).await?;

        Ok(())
    }

    async fn find(&self, ctx: &RequestContext, user_id: Uuid) -> Result<Option<Profile>, SocialError> {
        let profile = self.executor(ctx).find(Profile::by_user(user_id)).await?;

        Ok(profile)
    }

    async fn find_by_email(&self, ctx: &RequestContext, email: &str) -> Result<Option<Profile>, SocialError> {
        let profile = self.executor(ctx).find(Profile::by_email(email)).await?;

        Ok(profile)
    }

    /// Check-then-write: two concurrent requests can still both claim the same email.
    async fn validate_email_free(
        &self,
        ctx: &RequestContext,
        email: &str,
        owner: Option<Uuid>,
    ) -> Result<(), SocialError> {
        match self.find_by_email(ctx, email).await? {
            Some(existing) if Some(existing.user_id) != owner => {
                Err(SocialError::validation("email", "is already taken"))
            }
            _ => Ok(()),
        }
    }
}

fn validate_email(email: &str) -> Result<(), SocialError> {
    if !EmailAddress::is_valid(email) {
        return Err(SocialError::validation("email", "is invalid"));
    }

    Ok(())
}
