use std::fmt;
use std::time::Duration;

use futures::stream::BoxStream;

use crate::db::query::Query;
use crate::db::table::Table;
use crate::errors::DbError;

pub type ModelStream<M> = BoxStream<'static, Result<M, DbError>>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    Select,
    Count,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Insert => write!(f, "insert"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Select => write!(f, "select"),
            Operation::Count => write!(f, "count"),
        }
    }
}

/// Narrow statement API the repositories depend on.
///
/// Each call executes exactly one statement. `timeout` is what is left of the request deadline;
/// implementations forward it to the driver when they can. No implementation retries.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// `INSERT` of every column of `model`. Replaces the row with the same primary key.
    async fn insert<M: Table>(&self, model: &M, timeout: Option<Duration>) -> Result<(), DbError>;

    /// `DELETE` by `model`'s primary key.
    async fn delete<M: Table>(&self, model: &M, timeout: Option<Duration>) -> Result<(), DbError>;

    /// Rows addressed by `query`, in clustering order.
    async fn select<M: Table>(&self, query: &Query<M>, timeout: Option<Duration>) -> Result<ModelStream<M>, DbError>;

    /// `SELECT COUNT(*)` over the rows addressed by `query`.
    async fn count<M: Table>(&self, query: &Query<M>, timeout: Option<Duration>) -> Result<i64, DbError>;
}
