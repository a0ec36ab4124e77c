use std::error::Error;
use std::fmt;

/// State a multi-table write leaves behind when it stops after the primary step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inconsistency {
    /// Primary written or updated, view row absent or stale.
    MissingView,
    /// Primary deleted, view row still present.
    DanglingView,
    /// Only one of `subscriptions`/`followers` holds the edge.
    OneSidedEdge,
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::MissingView => write!(f, "missing-view"),
            Inconsistency::DanglingView => write!(f, "dangling-view"),
            Inconsistency::OneSidedEdge => write!(f, "one-sided-edge"),
        }
    }
}

/// Failure of the store or of decoding what it returned. Never user-actionable.
#[derive(Debug)]
pub enum DbError {
    Driver(Box<dyn Error + Send + Sync>),
    MalformedRow(String),
    Timeout(&'static str),
    Cancelled(&'static str),
    PartialWrite {
        state: Inconsistency,
        failed_table: &'static str,
        source: Box<DbError>,
    },
}

impl DbError {
    pub fn driver<E: Error + Send + Sync + 'static>(e: E) -> Self {
        DbError::Driver(Box::new(e))
    }

    /// Inconsistent state left behind, if the failing statement was not the first one.
    pub fn inconsistency(&self) -> Option<Inconsistency> {
        match self {
            DbError::PartialWrite { state, .. } => Some(*state),
            _ => None,
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Driver(e) => write!(f, "Driver Error: {}", e),
            DbError::MalformedRow(e) => write!(f, "Malformed Row: {}", e),
            DbError::Timeout(table) => write!(f, "Deadline exceeded before statement on {}", table),
            DbError::Cancelled(table) => write!(f, "Request cancelled before statement on {}", table),
            DbError::PartialWrite {
                state,
                failed_table,
                source,
            } => write!(f, "Partial write ({}) at {}: {}", state, failed_table, source),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DbError::Driver(e) => Some(e.as_ref()),
            DbError::MalformedRow(_) => None,
            DbError::Timeout(_) => None,
            DbError::Cancelled(_) => None,
            DbError::PartialWrite { source, .. } => Some(source.as_ref()),
        }
    }
}

#[derive(Debug)]
pub enum SocialError {
    // caller errors
    ValidationError((String, String)),
    NotFound(String),
    Forbidden(String),
    // store errors
    DatabaseError(DbError),
}

impl SocialError {
    pub fn validation(field: &str, message: &str) -> Self {
        SocialError::ValidationError((field.to_string(), message.to_string()))
    }

    /// Message safe to show to the end user. Store failures stay opaque.
    pub fn public_message(&self) -> String {
        match self {
            SocialError::ValidationError((field, message)) => format!("{} {}", field, message),
            SocialError::NotFound(e) => e.clone(),
            SocialError::Forbidden(e) => e.clone(),
            SocialError::DatabaseError(_) => "Something went wrong".to_string(),
        }
    }

    /// HTTP status equivalent used by the handler layer.
    pub fn status(&self) -> u16 {
        match self {
            SocialError::ValidationError(_) => 400,
            SocialError::Forbidden(_) => 403,
            SocialError::NotFound(_) => 404,
            SocialError::DatabaseError(_) => 500,
        }
    }
}

impl fmt::Display for SocialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocialError::ValidationError((field, message)) => {
                write!(f, "Validation Error: {}: {}", field, message)
            }
            SocialError::NotFound(e) => write!(f, "Not Found: {}", e),
            SocialError::Forbidden(e) => write!(f, "Forbidden: {}", e),
            SocialError::DatabaseError(e) => write!(f, "Database Error: \n{}", e),
        }
    }
}

impl Error for SocialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SocialError::ValidationError(_) => None,
            SocialError::NotFound(_) => None,
            SocialError::Forbidden(_) => None,
            SocialError::DatabaseError(e) => Some(e),
        }
    }
}

impl From<DbError> for SocialError {
    fn from(e: DbError) -> Self {
        SocialError::DatabaseError(e)
    }
}
