mod comment;
mod post;
mod profile;
mod reaction;
mod subscription;
pub mod traits;
pub mod utils;

pub use comment::{Comment, CommentByPost};
pub use post::{FeedEntry, Post, PostByAuthor};
pub use profile::{Profile, ProfileChanges};
pub use reaction::{Reaction, ReactionByTarget, TargetType};
pub use subscription::{Follower, Subscription};
