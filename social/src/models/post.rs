use std::cmp::Reverse;

use charybdis::macros::charybdis_model;
use charybdis::types::{Text, Timestamp, Uuid};
use macros::{Authored, Id};
use serde::{Deserialize, Serialize};

use crate::db::{Query, Table};
use crate::models::traits::Denormalized;

#[charybdis_model(
    table_name = posts,
    partition_keys = [id],
    clustering_keys = [],
    global_secondary_indexes = []
)]
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Id, Authored)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,

    #[authored(author)]
    pub author_id: Uuid,

    pub content: Text,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Post {
    pub fn by_id(id: Uuid) -> Query<Self> {
        Query::primary_key(&Self {
            id,
            ..Default::default()
        })
    }
}

impl Table for Post {
    type Partition = Uuid;
    type Clustering = ();

    fn partition(&self) -> Uuid {
        self.id
    }

    fn clustering(&self) {}
}

impl Denormalized for Post {
    const KIND: &'static str = "post";

    type View = PostByAuthor;

    fn view(&self) -> PostByAuthor {
        PostByAuthor::from(self)
    }

    fn log_key(&self) -> String {
        format!("id={} author_id={} created_at={}", self.id, self.author_id, self.created_at)
    }
}

/// Posts of one author, newest first.
#[charybdis_model(
    table_name = posts_by_author,
    partition_keys = [author_id],
    clustering_keys = [created_at, id],
    global_secondary_indexes = [],
    table_options = r#"CLUSTERING ORDER BY (created_at DESC, id ASC)"#
)]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PostByAuthor {
    pub author_id: Uuid,
    pub created_at: Timestamp,
    pub id: Uuid,
    pub content: Text,
    pub updated_at: Timestamp,
}

impl PostByAuthor {
    pub fn by_author(author_id: Uuid) -> Query<Self> {
        Query::partition(&Self {
            author_id,
            ..Default::default()
        })
    }
}

impl Table for PostByAuthor {
    type Partition = Uuid;
    type Clustering = (Reverse<Timestamp>, Uuid);

    fn partition(&self) -> Uuid {
        self.author_id
    }

    fn clustering(&self) -> Self::Clustering {
        (Reverse(self.created_at), self.id)
    }
}

impl From<&Post> for PostByAuthor {
    fn from(post: &Post) -> Self {
        Self {
            author_id: post.author_id,
            created_at: post.created_at,
            id: post.id,
            content: post.content.clone(),
            updated_at: post.updated_at,
        }
    }
}

impl From<PostByAuthor> for Post {
    fn from(row: PostByAuthor) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row of a user's feed, newest first. The feed is filled by the fan-out of followed authors'
/// posts, which lives outside this crate.
#[charybdis_model(
    table_name = user_feed,
    partition_keys = [user_id],
    clustering_keys = [created_at, post_id],
    global_secondary_indexes = [],
    table_options = r#"CLUSTERING ORDER BY (created_at DESC, post_id ASC)"#
)]
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub user_id: Uuid,
    pub created_at: Timestamp,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: Text,
}

impl FeedEntry {
    pub fn by_user(user_id: Uuid) -> Query<Self> {
        Query::partition(&Self {
            user_id,
            ..Default::default()
        })
    }
}

impl Table for FeedEntry {
    type Partition = Uuid;
    type Clustering = (Reverse<Timestamp>, Uuid);

    fn partition(&self) -> Uuid {
        self.user_id
    }

    fn clustering(&self) -> Self::Clustering {
        (Reverse(self.created_at), self.post_id)
    }
}
