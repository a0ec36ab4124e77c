use std::ops::Bound;

use charybdis::macros::charybdis_model;
use charybdis::types::{Text, Timestamp, Uuid};
use serde::{Deserialize, Serialize};

use crate::db::{Query, Scope, Table};
use crate::models::traits::Denormalized;

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum TargetType {
    #[default]
    Post,
    Comment,
}

/// One author's reaction to a post or comment. At most one per author and target; reacting again
/// replaces the previous kind.
#[charybdis_model(
    table_name = reactions,
    partition_keys = [target_id, target_type],
    clustering_keys = [author_id],
    global_secondary_indexes = []
)]
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub target_id: Uuid,

    /// [`TargetType`] as text.
    pub target_type: Text,

    pub author_id: Uuid,

    #[serde(rename = "kind")]
    pub reaction_kind: Text,

    pub created_at: Timestamp,
}

impl Reaction {
    pub fn by_author(target_id: Uuid, target_type: TargetType, author_id: Uuid) -> Query<Self> {
        Query::primary_key(&Self {
            target_id,
            target_type: target_type.to_string(),
            author_id,
            ..Default::default()
        })
    }
}

impl Table for Reaction {
    type Partition = (Uuid, Text);
    type Clustering = Uuid;

    fn partition(&self) -> Self::Partition {
        (self.target_id, self.target_type.clone())
    }

    fn clustering(&self) -> Uuid {
        self.author_id
    }
}

impl Denormalized for Reaction {
    const KIND: &'static str = "reaction";

    type View = ReactionByTarget;

    fn view(&self) -> ReactionByTarget {
        ReactionByTarget::from(self)
    }

    fn log_key(&self) -> String {
        format!(
            "target={}:{} author_id={} kind={}",
            self.target_type, self.target_id, self.author_id, self.reaction_kind
        )
    }
}

/// Reactions of a target grouped by kind, then by author.
#[charybdis_model(
    table_name = reactions_by_target,
    partition_keys = [target_id, target_type],
    clustering_keys = [reaction_kind, author_id],
    global_secondary_indexes = []
)]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReactionByTarget {
    pub target_id: Uuid,
    pub target_type: Text,
    pub reaction_kind: Text,
    pub author_id: Uuid,
    pub created_at: Timestamp,
}

impl ReactionByTarget {
    pub const COUNT_BY_KIND_QUERY: &'static str = "SELECT COUNT(*) FROM reactions_by_target \
        WHERE target_id = ? AND target_type = ? AND reaction_kind = ?";

    pub fn by_target(target_id: Uuid, target_type: TargetType) -> Query<Self> {
        Query::partition(&Self {
            target_id,
            target_type: target_type.to_string(),
            ..Default::default()
        })
    }

    /// The `reaction_kind` slice of the target's partition.
    pub fn by_kind(target_id: Uuid, target_type: TargetType, kind: &str) -> Query<Self> {
        let target_type = target_type.to_string();
        let first = (kind.to_string(), Uuid::nil());
        let last = (kind.to_string(), Uuid::max());

        Query::new(
            find_reaction_by_target_query!("target_id = ? AND target_type = ? AND reaction_kind = ?"),
            (target_id, target_type.clone(), kind.to_string()),
            Scope::Partition {
                partition: (target_id, target_type),
                slice: (Bound::Included(first), Bound::Included(last)),
            },
        )
    }
}

impl Table for ReactionByTarget {
    type Partition = (Uuid, Text);
    type Clustering = (Text, Uuid);

    fn partition(&self) -> Self::Partition {
        (self.target_id, self.target_type.clone())
    }

    fn clustering(&self) -> Self::Clustering {
        (self.reaction_kind.clone(), self.author_id)
    }
}

impl From<&Reaction> for ReactionByTarget {
    fn from(reaction: &Reaction) -> Self {
        Self {
            target_id: reaction.target_id,
            target_type: reaction.target_type.clone(),
            reaction_kind: reaction.reaction_kind.clone(),
            author_id: reaction.author_id,
            created_at: reaction.created_at,
        }
    }
}

impl From<ReactionByTarget> for Reaction {
    fn from(row: ReactionByTarget) -> Self {
        Self {
            target_id: row.target_id,
            target_type: row.target_type,
            author_id: row.author_id,
            reaction_kind: row.reaction_kind,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn target_type_round_trips_through_text() {
        assert_eq!(TargetType::Comment.to_string(), "Comment");
        assert_eq!(TargetType::from_str("Post").unwrap(), TargetType::Post);
        assert!(TargetType::from_str("Photo").is_err());
    }

    #[test]
    fn kind_query_restricts_a_clustering_prefix() {
        let query = ReactionByTarget::by_kind(Uuid::new_v4(), TargetType::Post, "like");

        assert!(query.cql().starts_with("SELECT "));
        assert!(query
            .cql()
            .ends_with("FROM reactions_by_target WHERE target_id = ? AND target_type = ? AND reaction_kind = ?"));
    }

    #[test]
    fn serializes_kind() {
        let json = serde_json::to_value(Reaction::default()).unwrap();

        assert!(json.get("kind").is_some());
        assert!(json.get("targetType").is_some());
    }
}
