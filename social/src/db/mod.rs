mod executor;
mod memory;
mod query;
mod session;
mod store;
mod table;

pub use executor::Executor;
pub use memory::MemoryStore;
pub use query::{Query, Scope, Slice};
pub use session::Resource;
pub use store::{ModelStream, Operation, Store};
pub use table::Table;
