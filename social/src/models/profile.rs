use charybdis::macros::charybdis_model;
use charybdis::types::{Text, Timestamp, Uuid};
use serde::{Deserialize, Serialize};

use crate::db::{Query, Scope, Table};

#[charybdis_model(
    table_name = profiles,
    partition_keys = [user_id],
    clustering_keys = [],
    global_secondary_indexes = [email]
)]
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub email: Text,
    pub first_name: Text,
    pub last_name: Text,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Profile {
    pub fn by_user(user_id: Uuid) -> Query<Self> {
        Query::primary_key(&Self {
            user_id,
            ..Default::default()
        })
    }

    /// Served by the secondary index on `email`.
    pub fn by_email(email: &str) -> Query<Self> {
        Query::new(
            find_profile_query!("email = ?"),
            (email.to_string(),),
            Scope::Index(email.to_string()),
        )
    }
}

impl Table for Profile {
    type Partition = Uuid;
    type Clustering = ();

    const SECONDARY_INDEX: Option<&'static str> = Some("email");

    fn partition(&self) -> Uuid {
        self.user_id
    }

    fn clustering(&self) {}

    fn index_value(&self) -> Option<&str> {
        Some(&self.email)
    }
}

/// Fields a profile update may change. `None` keeps the stored value.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    pub email: Option<Text>,
    pub first_name: Option<Text>,
    pub last_name: Option<Text>,
}
