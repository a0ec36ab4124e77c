use charybdis::macros::charybdis_model;
use charybdis::types::{Timestamp, Uuid};
use serde::{Deserialize, Serialize};

use crate::db::{Operation, Query, Table};
use crate::errors::Inconsistency;
use crate::models::traits::Denormalized;

/// Directed follow edge as seen by the follower. `subscriptions` answers "who do I follow",
/// `followers` answers "who follows me"; the edge exists only when both rows do.
#[charybdis_model(
    table_name = subscriptions,
    partition_keys = [follower_id],
    clustering_keys = [following_id],
    global_secondary_indexes = []
)]
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: Timestamp,
}

impl Subscription {
    pub const COUNT_BY_FOLLOWER_QUERY: &'static str = "SELECT COUNT(*) FROM subscriptions WHERE follower_id = ?";

    pub fn edge(follower_id: Uuid, following_id: Uuid) -> Query<Self> {
        Query::primary_key(&Self {
            follower_id,
            following_id,
            ..Default::default()
        })
    }

    /// Users `follower_id` follows, by their id.
    pub fn by_follower(follower_id: Uuid) -> Query<Self> {
        Query::partition(&Self {
            follower_id,
            ..Default::default()
        })
    }
}

impl Table for Subscription {
    type Partition = Uuid;
    type Clustering = Uuid;

    fn partition(&self) -> Uuid {
        self.follower_id
    }

    fn clustering(&self) -> Uuid {
        self.following_id
    }
}

impl Denormalized for Subscription {
    const KIND: &'static str = "subscription";

    type View = Follower;

    fn view(&self) -> Follower {
        Follower::from(self)
    }

    fn log_key(&self) -> String {
        format!("follower_id={} following_id={}", self.follower_id, self.following_id)
    }

    fn partial_failure(_operation: Operation) -> Inconsistency {
        Inconsistency::OneSidedEdge
    }
}

/// The same edge as seen by the followed user.
#[charybdis_model(
    table_name = followers,
    partition_keys = [following_id],
    clustering_keys = [follower_id],
    global_secondary_indexes = []
)]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Follower {
    pub following_id: Uuid,
    pub follower_id: Uuid,
    pub created_at: Timestamp,
}

impl Follower {
    pub const COUNT_BY_FOLLOWING_QUERY: &'static str = "SELECT COUNT(*) FROM followers WHERE following_id = ?";

    /// Users following `following_id`, by their id.
    pub fn by_following(following_id: Uuid) -> Query<Self> {
        Query::partition(&Self {
            following_id,
            ..Default::default()
        })
    }
}

impl Table for Follower {
    type Partition = Uuid;
    type Clustering = Uuid;

    fn partition(&self) -> Uuid {
        self.following_id
    }

    fn clustering(&self) -> Uuid {
        self.follower_id
    }
}

impl From<&Subscription> for Follower {
    fn from(edge: &Subscription) -> Self {
        Self {
            following_id: edge.following_id,
            follower_id: edge.follower_id,
            created_at: edge.created_at,
        }
    }
}

impl From<Follower> for Subscription {
    fn from(row: Follower) -> Self {
        Self {
            follower_id: row.follower_id,
            following_id: row.following_id,
            created_at: row.created_at,
        }
    }
}
