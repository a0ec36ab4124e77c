use std::ops::Bound;

use charybdis::types::Text;
use scylla::serialize::row::SerializeRow;

use crate::db::table::Table;

pub type Slice<C> = (Bound<C>, Bound<C>);

/// Rows a read addresses, as the in-process store evaluates it.
pub enum Scope<M: Table> {
    /// Clustering slice of one partition.
    Partition {
        partition: M::Partition,
        slice: Slice<M::Clustering>,
    },
    /// Every row whose secondary index column equals the value.
    Index(Text),
}

/// A read against `M`: CQL text, its bound values and the rows it addresses.
pub struct Query<M: Table> {
    cql: &'static str,
    values: Box<dyn SerializeRow + Send + Sync>,
    scope: Scope<M>,
    limit: Option<i32>,
}

impl<M: Table> Query<M> {
    pub fn new(cql: &'static str, values: impl SerializeRow + Send + Sync + 'static, scope: Scope<M>) -> Self {
        Self {
            cql,
            values: Box::new(values),
            scope,
            limit: None,
        }
    }

    /// The row with `model`'s primary key.
    pub fn primary_key(model: &M) -> Self {
        let clustering = model.clustering();

        Self::new(
            M::FIND_BY_PRIMARY_KEY_QUERY,
            model.primary_key_values(),
            Scope::Partition {
                partition: model.partition(),
                slice: (Bound::Included(clustering.clone()), Bound::Included(clustering)),
            },
        )
    }

    /// Every row of `model`'s partition, in clustering order.
    pub fn partition(model: &M) -> Self {
        Self::new(
            M::FIND_BY_PARTITION_KEY_QUERY,
            model.partition_key_values(),
            Scope::Partition {
                partition: model.partition(),
                slice: (Bound::Unbounded, Bound::Unbounded),
            },
        )
    }

    /// Same rows as `self`, read with `cql` (e.g. a `COUNT` over the same restriction).
    pub fn with_cql(mut self, cql: &'static str) -> Self {
        self.cql = cql;
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cql(&self) -> &'static str {
        self.cql
    }

    pub fn values(&self) -> &(dyn SerializeRow + Send + Sync) {
        self.values.as_ref()
    }

    pub fn scope(&self) -> &Scope<M> {
        &self.scope
    }

    pub fn row_limit(&self) -> Option<i32> {
        self.limit
    }
}
