use charybdis::types::Uuid;

use crate::db::{Operation, Table};
use crate::errors::Inconsistency;

pub trait Id {
    fn id(&self) -> Uuid;
}

pub trait Authored {
    fn author_id(&self) -> Uuid;
}

/// Entity stored in its primary table and copied, whole, into one view table.
pub trait Denormalized: Table {
    /// Entity name used in logs and error messages.
    const KIND: &'static str;

    type View: Table;

    fn view(&self) -> Self::View;

    /// Identity printed in inconsistency reports, enough for a repair job to locate every copy.
    fn log_key(&self) -> String;

    /// State left behind when `operation` fails after the primary step succeeded.
    fn partial_failure(operation: Operation) -> Inconsistency {
        match operation {
            Operation::Delete => Inconsistency::DanglingView,
            _ => Inconsistency::MissingView,
        }
    }
}
