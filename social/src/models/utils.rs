use charybdis::types::{Timestamp, Uuid};
use chrono::{DateTime, Utc};

use crate::errors::SocialError;

/// Current time at the store's timestamp resolution (milliseconds), so an entity built from it
/// compares equal to the same entity read back.
pub fn now() -> Timestamp {
    let now = Utc::now();

    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub fn validate_id(field: &str, id: Uuid) -> Result<(), SocialError> {
    if id.is_nil() {
        return Err(SocialError::validation(field, "is required"));
    }

    Ok(())
}

pub fn validate_text(field: &str, value: &str) -> Result<(), SocialError> {
    if value.trim().is_empty() {
        return Err(SocialError::validation(field, "is required"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_has_millisecond_precision() {
        let now = now();

        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn rejects_nil_ids_and_blank_text() {
        assert!(validate_id("author_id", Uuid::nil()).is_err());
        assert!(validate_id("author_id", Uuid::new_v4()).is_ok());
        assert!(validate_text("content", "  \n").is_err());
        assert!(validate_text("content", "hi").is_ok());
    }
}
