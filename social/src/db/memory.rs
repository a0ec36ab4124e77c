use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use futures::{stream, StreamExt};

use crate::db::query::{Query, Scope};
use crate::db::store::{ModelStream, Operation, Store};
use crate::db::table::Table;
use crate::errors::DbError;

type Partitions<M> = BTreeMap<<M as Table>::Partition, BTreeMap<<M as Table>::Clustering, M>>;

/// Rows of one table: partitions, each ordered by clustering key.
struct TableRows<M: Table> {
    partitions: Partitions<M>,
}

impl<M: Table> Default for TableRows<M> {
    fn default() -> Self {
        Self {
            partitions: BTreeMap::new(),
        }
    }
}

/// A [`TableRows`] of any model, so every table fits one map.
trait AnyRows: Send + Sync {
    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M: Table> AnyRows for TableRows<M> {
    fn len(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// In-process [`Store`] with wide-column semantics: writes are upserts addressed by the full
/// primary key, reads address a clustering slice of one partition (or one indexed value) and come
/// back in clustering order.
///
/// `fail_next` and `delay_next` arm one-shot faults for a table/operation pair, which is how the
/// partial write states of the repositories are reproduced in tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<&'static str, Box<dyn AnyRows>>,
    faults: DashMap<(&'static str, Operation), usize>,
    delays: DashMap<(&'static str, Operation), Duration>,
    journal: Mutex<Vec<(Operation, &'static str)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `operation` against `table` fail. Calls stack.
    pub fn fail_next(&self, table: &'static str, operation: Operation) {
        *self.faults.entry((table, operation)).or_insert(0) += 1;
    }

    /// Holds the next `operation` against `table` for `delay` before it touches any row.
    pub fn delay_next(&self, table: &'static str, operation: Operation, delay: Duration) {
        self.delays.insert((table, operation), delay);
    }

    /// Every statement attempted so far, failed ones included.
    pub fn journal(&self) -> Vec<(Operation, &'static str)> {
        self.journal.lock().map(|journal| journal.clone()).unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |rows| rows.len())
    }

    async fn begin(&self, table: &'static str, operation: Operation) -> Result<(), DbError> {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push((operation, table));
        }

        if let Some((_, delay)) = self.delays.remove(&(table, operation)) {
            tokio::time::sleep(delay).await;
        }

        let injected = match self.faults.get_mut(&(table, operation)) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };

        if injected {
            return Err(DbError::Driver(
                format!("injected {} failure on {}", operation, table).into(),
            ));
        }

        Ok(())
    }

    fn write<M: Table, T>(&self, apply: impl FnOnce(&mut Partitions<M>) -> T) -> Result<T, DbError> {
        let mut entry = self
            .tables
            .entry(M::DB_MODEL_NAME)
            .or_insert_with(|| Box::new(TableRows::<M>::default()));

        let rows = entry
            .as_any_mut()
            .downcast_mut::<TableRows<M>>()
            .ok_or_else(|| mismatch::<M>())?;

        Ok(apply(&mut rows.partitions))
    }

    fn read<M: Table>(&self, query: &Query<M>) -> Result<Vec<M>, DbError> {
        let Some(entry) = self.tables.get(M::DB_MODEL_NAME) else {
            if let Scope::Index(_) = query.scope() {
                check_index::<M>()?;
            }

            return Ok(Vec::new());
        };

        let rows = &entry
            .as_any()
            .downcast_ref::<TableRows<M>>()
            .ok_or_else(|| mismatch::<M>())?
            .partitions;

        let matched: Vec<M> = match query.scope() {
            Scope::Partition { partition, slice } => match rows.get(partition) {
                Some(partition) => partition.range(slice.clone()).map(|(_, row)| row.clone()).collect(),
                None => Vec::new(),
            },
            Scope::Index(value) => {
                check_index::<M>()?;

                rows.values()
                    .flat_map(|partition| partition.values())
                    .filter(|row| row.index_value() == Some(value.as_str()))
                    .cloned()
                    .collect()
            }
        };

        Ok(matched)
    }
}

impl Store for MemoryStore {
    async fn insert<M: Table>(&self, model: &M, _timeout: Option<Duration>) -> Result<(), DbError> {
        self.begin(M::DB_MODEL_NAME, Operation::Insert).await?;

        self.write::<M, _>(|rows| {
            rows.entry(model.partition())
                .or_default()
                .insert(model.clustering(), model.clone());
        })
    }

    async fn delete<M: Table>(&self, model: &M, _timeout: Option<Duration>) -> Result<(), DbError> {
        self.begin(M::DB_MODEL_NAME, Operation::Delete).await?;

        self.write::<M, _>(|rows| {
            let partition = model.partition();

            if let Some(clustered) = rows.get_mut(&partition) {
                clustered.remove(&model.clustering());

                if clustered.is_empty() {
                    rows.remove(&partition);
                }
            }
        })
    }

    async fn select<M: Table>(&self, query: &Query<M>, _timeout: Option<Duration>) -> Result<ModelStream<M>, DbError> {
        self.begin(M::DB_MODEL_NAME, Operation::Select).await?;

        let mut rows = self.read(query)?;

        if let Some(limit) = query.row_limit().filter(|limit| *limit > 0) {
            rows.truncate(limit as usize);
        }

        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn count<M: Table>(&self, query: &Query<M>, _timeout: Option<Duration>) -> Result<i64, DbError> {
        self.begin(M::DB_MODEL_NAME, Operation::Count).await?;

        Ok(self.read(query)?.len() as i64)
    }
}

fn invalid(message: String) -> DbError {
    DbError::Driver(format!("Invalid query: {}", message).into())
}

fn mismatch<M: Table>() -> DbError {
    DbError::MalformedRow(format!("{} holds rows of another model", M::DB_MODEL_NAME))
}

/// Without an index the store would need ALLOW FILTERING.
fn check_index<M: Table>() -> Result<(), DbError> {
    match M::SECONDARY_INDEX {
        Some(_) => Ok(()),
        None => Err(invalid(format!(
            "restrictions on {} would require ALLOW FILTERING",
            M::DB_MODEL_NAME
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use charybdis::types::Uuid;
    use futures::TryStreamExt;

    use super::*;
    use crate::models::utils::now;
    use crate::models::{CommentByPost, Post, Profile};

    fn comment_at(post_id: Uuid, created_at_ms: i64) -> CommentByPost {
        let created_at = now() + chrono::Duration::milliseconds(created_at_ms);

        CommentByPost {
            post_id,
            created_at,
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: format!("at {}", created_at_ms),
            updated_at: created_at,
        }
    }

    fn profile(email: &str) -> Profile {
        Profile {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn partition_reads_follow_clustering_order() {
        let store = MemoryStore::new();
        let post_id = Uuid::new_v4();
        let oldest = comment_at(post_id, 0);
        let newest = comment_at(post_id, 20);
        let middle = comment_at(post_id, 10);

        for row in [&oldest, &newest, &middle] {
            store.insert(row, None).await.unwrap();
        }
        store.insert(&comment_at(Uuid::new_v4(), 30), None).await.unwrap();

        let query = CommentByPost::by_post(post_id).limit(2);
        let rows: Vec<CommentByPost> = store.select(&query, None).await.unwrap().try_collect().await.unwrap();

        assert_eq!(rows, vec![newest, middle]);
        assert_eq!(store.count(&CommentByPost::by_post(post_id), None).await.unwrap(), 3);
        assert_eq!(store.row_count("comments_by_post"), 4);
    }

    #[tokio::test]
    async fn delete_addresses_one_row() {
        let store = MemoryStore::new();
        let post_id = Uuid::new_v4();
        let kept = comment_at(post_id, 0);
        let removed = comment_at(post_id, 5);
        store.insert(&kept, None).await.unwrap();
        store.insert(&removed, None).await.unwrap();

        store.delete(&removed, None).await.unwrap();
        store.delete(&removed, None).await.unwrap();

        let rows: Vec<CommentByPost> = store
            .select(&CommentByPost::by_post(post_id), None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows, vec![kept]);
    }

    #[tokio::test]
    async fn index_scope_reads_across_partitions() {
        let store = MemoryStore::new();
        let ada = profile("ada@example.com");
        store.insert(&ada, None).await.unwrap();
        store.insert(&profile("bob@example.com"), None).await.unwrap();

        let rows: Vec<Profile> = store
            .select(&Profile::by_email("ada@example.com"), None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(rows, vec![ada]);
    }

    #[tokio::test]
    async fn unindexed_restriction_is_rejected() {
        let store = MemoryStore::new();
        let query = Query::<Post>::new(
            "SELECT * FROM posts WHERE content = ?",
            ("hello".to_string(),),
            Scope::Index("hello".to_string()),
        );

        let res = store.count(&query, None).await;

        match res {
            Err(DbError::Driver(e)) => assert!(e.to_string().contains("ALLOW FILTERING")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn faults_fire_once_and_are_journaled() {
        let store = MemoryStore::new();
        let row = profile("ada@example.com");
        store.fail_next("profiles", Operation::Insert);

        assert!(store.insert(&row, None).await.is_err());
        assert_eq!(store.row_count("profiles"), 0);

        store.insert(&row, None).await.unwrap();

        assert_eq!(store.row_count("profiles"), 1);
        assert_eq!(
            store.journal(),
            vec![(Operation::Insert, "profiles"), (Operation::Insert, "profiles")]
        );
    }

    #[tokio::test]
    async fn delays_hold_one_statement() {
        let store = MemoryStore::new();
        let row = profile("ada@example.com");
        store.delay_next("profiles", Operation::Insert, Duration::from_millis(30));

        let started = Instant::now();
        store.insert(&row, None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));

        let started = Instant::now();
        store.delete(&row, None).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(30));
    }
}
