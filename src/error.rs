//! Error types for the safety checker.

use crate::message::{MessageKey, Vars};
use crate::version::ServerVersion;

/// Why `Checker::check` refused an operation.
///
/// Every variant is fatal to the migration run; the host runtime aborts when
/// it receives one.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// The operation is unsafe to run on a live database.
    #[error("{0}")]
    Unsafe(Box<UnsafeOperation>),

    /// Schema introspection failed.
    #[error("introspection failed: {0}")]
    Introspect(#[from] IntrospectError),

    /// The runtime passed arguments the rule cannot interpret.
    #[error("invalid arguments for {operation}: {reason}")]
    InvalidArguments { operation: String, reason: String },

    /// The server is older than anything the checker can reason about.
    #[error("PostgreSQL {0} is not supported, at least 9.6 is required")]
    UnsupportedVersion(ServerVersion),

    /// Unrecognized operation while strict mode is enabled.
    #[error("unrecognized operation: {0}")]
    UnknownOperation(String),
}

impl CheckError {
    pub fn invalid(operation: &str, reason: impl Into<String>) -> Self {
        CheckError::InvalidArguments {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Message key of an unsafe verdict.
    pub fn key(&self) -> Option<MessageKey> {
        match self {
            CheckError::Unsafe(op) => Some(op.key),
            _ => None,
        }
    }

    pub fn as_unsafe(&self) -> Option<&UnsafeOperation> {
        match self {
            CheckError::Unsafe(op) => Some(op),
            _ => None,
        }
    }
}

/// An unsafe verdict together with its rendered diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsafeOperation {
    pub key: MessageKey,
    pub vars: Vars,
    pub message: String,
}

impl std::fmt::Display for UnsafeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntrospectError {
    #[error("query failed: {0}")]
    Query(String),
}

#[cfg(feature = "postgres")]
impl From<postgres::Error> for IntrospectError {
    fn from(err: postgres::Error) -> Self {
        IntrospectError::Query(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            CheckError::invalid("add_index", "missing table").to_string(),
            "invalid arguments for add_index: missing table"
        );
        assert_eq!(
            CheckError::UnsupportedVersion(ServerVersion::new(9, 5, 0)).to_string(),
            "PostgreSQL 9.5.0 is not supported, at least 9.6 is required"
        );
        assert_eq!(
            CheckError::from(IntrospectError::Query("connection reset".into())).to_string(),
            "introspection failed: query failed: connection reset"
        );
    }

    #[test]
    fn unsafe_displays_rendered_message() {
        let err = CheckError::Unsafe(Box::new(UnsafeOperation {
            key: MessageKey::RenameTable,
            vars: Vars::new(),
            message: "Renaming a table is dangerous".to_string(),
        }));

        assert_eq!(err.to_string(), "Renaming a table is dangerous");
        assert_eq!(err.key(), Some(MessageKey::RenameTable));
        assert!(CheckError::UnknownOperation("x".into()).key().is_none());
    }
}
