use std::cmp::Reverse;

use charybdis::macros::charybdis_model;
use charybdis::types::{Text, Timestamp, Uuid};
use macros::{Authored, Id};
use serde::{Deserialize, Serialize};

use crate::db::{Query, Table};
use crate::models::traits::Denormalized;

#[charybdis_model(
    table_name = comments,
    partition_keys = [id],
    clustering_keys = [],
    global_secondary_indexes = []
)]
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Id, Authored)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,

    #[authored(author)]
    pub author_id: Uuid,

    pub content: Text,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Comment {
    pub fn by_id(id: Uuid) -> Query<Self> {
        Query::primary_key(&Self {
            id,
            ..Default::default()
        })
    }
}

impl Table for Comment {
    type Partition = Uuid;
    type Clustering = ();

    fn partition(&self) -> Uuid {
        self.id
    }

    fn clustering(&self) {}
}

impl Denormalized for Comment {
    const KIND: &'static str = "comment";

    type View = CommentByPost;

    fn view(&self) -> CommentByPost {
        CommentByPost::from(self)
    }

    fn log_key(&self) -> String {
        format!("id={} post_id={} created_at={}", self.id, self.post_id, self.created_at)
    }
}

#[charybdis_model(
    table_name = comments_by_post,
    partition_keys = [post_id],
    clustering_keys = [created_at, id],
    global_secondary_indexes = [],
    table_options = r#"CLUSTERING ORDER BY (created_at DESC, id ASC)"#
)]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommentByPost {
    pub post_id: Uuid,
    pub created_at: Timestamp,
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: Text,
    pub updated_at: Timestamp,
}

impl CommentByPost {
    pub const COUNT_BY_POST_QUERY: &'static str = "SELECT COUNT(*) FROM comments_by_post WHERE post_id = ?";

    pub fn by_post(post_id: Uuid) -> Query<Self> {
        Query::partition(&Self {
            post_id,
            ..Default::default()
        })
    }
}

impl Table for CommentByPost {
    type Partition = Uuid;
    type Clustering = (Reverse<Timestamp>, Uuid);

    fn partition(&self) -> Uuid {
        self.post_id
    }

    fn clustering(&self) -> Self::Clustering {
        (Reverse(self.created_at), self.id)
    }
}

impl From<&Comment> for CommentByPost {
    fn from(comment: &Comment) -> Self {
        Self {
            post_id: comment.post_id,
            created_at: comment.created_at,
            id: comment.id,
            author_id: comment.author_id,
            content: comment.content.clone(),
            updated_at: comment.updated_at,
        }
    }
}

impl From<CommentByPost> for Comment {
    fn from(row: CommentByPost) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
