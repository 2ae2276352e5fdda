use thiserror::Error;

/// Coarse outcome classes a transport layer can map onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A unique constraint rejected the write.
    Duplicate,
    /// A foreign key pointed at a parent row that does not exist.
    MissingParentKey,
    /// An update or delete matched no row.
    TargetNotFound,
    /// Required columns were not supplied.
    Invalid,
    /// The operation was cancelled before it reached the database.
    Cancelled,
    /// Anything else.
    Other,
}

#[derive(Debug, Error)]
pub enum MapError {
    /// Required (not-nullable) columns are still missing
    #[error("Required Fields aren't Nullable ({})", .missing.join(", "))]
    Validation {
        entity: &'static str,
        missing: Vec<&'static str>,
    },

    /// Referenced parent key or target row does not exist
    #[error("Not found: {entity}: {reason}")]
    NotFound { entity: String, kind: ErrorKind, reason: String },

    /// Unique constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A JSON column could not be decoded into its field
    #[error("Decode error: {entity}.{column}: {source}")]
    Decode {
        entity: &'static str,
        column: String,
        #[source]
        source: serde_json::Error,
    },

    /// Error mapping data between inputs, values and fields
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A statement could not be generated
    #[error("Statement error: {0}")]
    Statement(String),

    /// The statement's cancellation token fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// JSON encoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(rusqlite::Error),
}

impl MapError {
    pub fn not_found(entity: impl Into<String>, kind: ErrorKind, reason: impl Into<String>) -> Self {
        MapError::NotFound {
            entity: entity.into(),
            kind,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MapError::Validation { .. } => ErrorKind::Invalid,
            MapError::NotFound { kind, .. } => *kind,
            MapError::Conflict(_) => ErrorKind::Duplicate,
            MapError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Other,
        }
    }
}

/// Classifies a backend error message by its vendor code prefix.
///
/// MySQL style (`Error 1062`, `Error 1452`) and SQLite constraint messages
/// are both recognized. Unknown messages are [`ErrorKind::Other`].
pub fn classify_message(message: &str) -> ErrorKind {
    const UPDATE_NOT_FOUND: &str = "Error Update Custom: Not Found Id";

    if message.starts_with("Error 1062") || message.starts_with("UNIQUE constraint failed") {
        ErrorKind::Duplicate
    } else if message.starts_with("Error 1452")
        || message.starts_with("FOREIGN KEY constraint failed")
    {
        ErrorKind::MissingParentKey
    } else if message.starts_with(UPDATE_NOT_FOUND) {
        ErrorKind::TargetNotFound
    } else {
        ErrorKind::Other
    }
}

#[cfg(feature = "rusqlite")]
impl From<rusqlite::Error> for MapError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        let rusqlite::Error::SqliteFailure(failure, message) = &err else {
            return MapError::Rusqlite(err);
        };
        let detail = message.clone().unwrap_or_else(|| failure.to_string());
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                MapError::Conflict(detail)
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                MapError::not_found("parent", ErrorKind::MissingParentKey, detail)
            }
            _ => match classify_message(&detail) {
                ErrorKind::Duplicate => MapError::Conflict(detail),
                ErrorKind::MissingParentKey => {
                    MapError::not_found("parent", ErrorKind::MissingParentKey, detail)
                }
                _ => MapError::Rusqlite(err),
            },
        }
    }
}

/// Result type for mapping operations
pub type Result<T> = std::result::Result<T, MapError>;
