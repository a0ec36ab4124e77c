use charybdis::model::Model;

/// A charybdis model the repositories read and write.
///
/// `Partition` and `Clustering` mirror the model's primary key in storage order, so that
/// clustering order (including `DESC` columns, expressed with [`std::cmp::Reverse`]) is the `Ord`
/// of `Clustering`. The in-process store relies on this to return rows the way the database does.
pub trait Table: Model + Clone + Send + Sync + 'static {
    type Partition: Ord + Clone + Send + Sync + 'static;
    type Clustering: Ord + Clone + Send + Sync + 'static;

    /// Column carrying a secondary index, if any.
    const SECONDARY_INDEX: Option<&'static str> = None;

    fn partition(&self) -> Self::Partition;

    fn clustering(&self) -> Self::Clustering;

    fn index_value(&self) -> Option<&str> {
        None
    }
}
