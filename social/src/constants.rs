/// Rows returned by list operations when the caller gives no (or a non-positive) limit.
pub const DEFAULT_PAGE_SIZE: i32 = 20;

pub const MAX_PAGE_SIZE: i32 = 500;

/// Upper bound for each following scan of the mutual-followings computation.
pub const MUTUAL_SCAN_LIMIT: i32 = 10_000;

pub const STATEMENT_CACHE_SIZE: usize = 1000;

pub const CONNECTION_TIMEOUT_SECS: u64 = 3;
