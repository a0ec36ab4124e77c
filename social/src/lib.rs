pub mod app;
pub mod constants;
pub mod context;
pub mod db;
pub mod errors;
pub mod models;
pub mod repositories;

pub use context::RequestContext;
pub use errors::{DbError, Inconsistency, SocialError};
