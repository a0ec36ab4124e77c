use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use scylla::client::caching_session::CachingSession;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::unprepared::Statement;

use crate::app::ScyllaConfig;
use crate::constants::STATEMENT_CACHE_SIZE;
use crate::db::query::Query;
use crate::db::store::{ModelStream, Store};
use crate::db::table::Table;
use crate::errors::DbError;

/// Resources live for the whole application runtime and are built once from config.
#[allow(async_fn_in_trait)]
pub trait Resource<'a>: Sized {
    type Cfg;

    async fn init_resource(config: Self::Cfg) -> Result<Self, DbError>;
}

impl<'a> Resource<'a> for CachingSession {
    type Cfg = &'a ScyllaConfig;

    async fn init_resource(config: Self::Cfg) -> Result<Self, DbError> {
        let db_session: Session = SessionBuilder::new()
            .known_nodes(&config.hosts)
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .use_keyspace(config.keyspace.as_str(), false)
            .build()
            .await
            .map_err(|e| {
                log::error!("Unable to connect to scylla hosts: {:?}. \nError: {}", config.hosts, e);

                DbError::driver(e)
            })?;

        Ok(CachingSession::from(db_session, STATEMENT_CACHE_SIZE))
    }
}

impl Store for CachingSession {
    async fn insert<M: Table>(&self, model: &M, timeout: Option<Duration>) -> Result<(), DbError> {
        self.execute_unpaged(statement(M::INSERT_QUERY, timeout), model)
            .await
            .map_err(DbError::driver)?;

        Ok(())
    }

    async fn delete<M: Table>(&self, model: &M, timeout: Option<Duration>) -> Result<(), DbError> {
        self.execute_unpaged(statement(M::DELETE_QUERY, timeout), model.primary_key_values())
            .await
            .map_err(DbError::driver)?;

        Ok(())
    }

    async fn select<M: Table>(&self, query: &Query<M>, timeout: Option<Duration>) -> Result<ModelStream<M>, DbError> {
        let mut cql = statement(query.cql(), timeout);
        let limit = query.row_limit().filter(|limit| *limit > 0);

        if let Some(limit) = limit {
            cql.set_page_size(limit);
        }

        let rows = self
            .execute_iter(cql, query.values())
            .await
            .map_err(DbError::driver)?
            .rows_stream::<M>()
            .map_err(DbError::driver)?
            .map_err(DbError::driver);

        match limit {
            Some(limit) => Ok(rows.take(limit as usize).boxed()),
            None => Ok(rows.boxed()),
        }
    }

    async fn count<M: Table>(&self, query: &Query<M>, timeout: Option<Duration>) -> Result<i64, DbError> {
        let result = self
            .execute_unpaged(statement(query.cql(), timeout), query.values())
            .await
            .map_err(DbError::driver)?
            .into_rows_result()
            .map_err(DbError::driver)?;

        let (count,) = result.first_row::<(i64,)>().map_err(DbError::driver)?;

        Ok(count)
    }
}

fn statement(cql: &'static str, timeout: Option<Duration>) -> Statement {
    let mut statement = Statement::new(cql);
    statement.set_request_timeout(timeout);

    statement
}
