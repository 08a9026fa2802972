use std::time::Duration;
use thiserror::Error as ThisError;

/// Coarse classification of [`StmtMgrError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input rejected before any message reaches the worker.
    Validation,
    /// Connection document could not be read, parsed or resolved.
    Config,
    /// The database could not be opened or reached.
    Connectivity,
    /// A statement name is already registered.
    Conflict,
    /// The database refused to prepare the statement.
    Compile,
    /// The statement is not registered.
    NotFound,
    /// The manager is closed or its worker is unavailable.
    Lifecycle,
}

#[derive(Debug, ThisError)]
pub enum StmtMgrError {
    #[error("statement name is required and may not be empty")]
    EmptyName,

    #[error("statement query is required and may not be empty")]
    EmptyQuery,

    #[error("configuration read error: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("configuration missing database user")]
    MissingUser,

    #[error("configuration missing database server [IP or URL]")]
    MissingServer,

    #[error("configuration missing database name")]
    MissingDatabase,

    #[error("unsupported database driver: {0}")]
    UnsupportedDriver(String),

    #[error("invalid connection url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("connection url has no host to attach the {0} to")]
    UrlCredentials(&'static str),

    #[error("database open error: {0}")]
    Open(#[source] sqlx::Error),

    #[error("database connection error: {0}")]
    Unreachable(#[source] sqlx::Error),

    #[error("no database connection attached to the store")]
    NotConnected,

    #[error("a statement with the name {0} already exists in the registry")]
    DuplicateStatement(String),

    #[error("a statement with the name {0} does not exist in the store")]
    StatementNotFound(String),

    #[error("error preparing statement {name}: {source}")]
    PrepareFailed {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("statement manager is closed")]
    Closed,

    #[error("statement manager was already closed")]
    AlreadyClosed,

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl StmtMgrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StmtMgrError::EmptyName | StmtMgrError::EmptyQuery => ErrorKind::Validation,

            StmtMgrError::ConfigRead(_)
            | StmtMgrError::ConfigParse(_)
            | StmtMgrError::MissingUser
            | StmtMgrError::MissingServer
            | StmtMgrError::MissingDatabase
            | StmtMgrError::UnsupportedDriver(_)
            | StmtMgrError::InvalidUrl(_)
            | StmtMgrError::UrlCredentials(_) => ErrorKind::Config,

            StmtMgrError::Open(_) | StmtMgrError::Unreachable(_) | StmtMgrError::NotConnected => {
                ErrorKind::Connectivity
            }

            StmtMgrError::DuplicateStatement(_) => ErrorKind::Conflict,
            StmtMgrError::PrepareFailed { .. } => ErrorKind::Compile,
            StmtMgrError::StatementNotFound(_) => ErrorKind::NotFound,

            StmtMgrError::Closed
            | StmtMgrError::AlreadyClosed
            | StmtMgrError::Timeout { .. }
            | StmtMgrError::RactorError(_) => ErrorKind::Lifecycle,
        }
    }

    /// Validation errors are raised by the caller side and never touch the worker.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(StmtMgrError::EmptyName.kind(), ErrorKind::Validation);
        assert_eq!(StmtMgrError::MissingServer.kind(), ErrorKind::Config);
        assert_eq!(
            StmtMgrError::Unreachable(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::Connectivity
        );
        assert_eq!(
            StmtMgrError::DuplicateStatement("ins".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            StmtMgrError::PrepareFailed {
                name: "ins".into(),
                source: sqlx::Error::PoolClosed,
            }
            .kind(),
            ErrorKind::Compile
        );
        assert_eq!(StmtMgrError::AlreadyClosed.kind(), ErrorKind::Lifecycle);
    }

    #[test]
    fn duplicate_message_names_the_statement() {
        let err = StmtMgrError::DuplicateStatement("truncate".into());
        assert_eq!(
            err.to_string(),
            "a statement with the name truncate already exists in the registry"
        );
    }
}
