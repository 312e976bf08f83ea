//! Read-only view of the live schema.

mod memory;

#[cfg(feature = "postgres")]
mod postgres;

pub use memory::InMemorySchema;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresIntrospector;

use std::fmt;

use crate::column_type::ColumnType;
use crate::error::IntrospectError;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            limit: None,
            precision: None,
            scale: None,
            nullable: true,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMethod {
    #[default]
    BTree,
    Hash,
    Gist,
    Gin,
    Brin,
    SpGist,
    Other,
}

impl IndexMethod {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "btree" => IndexMethod::BTree,
            "hash" => IndexMethod::Hash,
            "gist" => IndexMethod::Gist,
            "gin" => IndexMethod::Gin,
            "brin" => IndexMethod::Brin,
            "spgist" => IndexMethod::SpGist,
            _ => IndexMethod::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub method: IndexMethod,
}

impl IndexDescriptor {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            method: IndexMethod::BTree,
        }
    }

    pub fn using(mut self, method: IndexMethod) -> Self {
        self.method = method;
        self
    }

    pub fn covers(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDescriptor {
    pub name: String,
    /// As reported by `pg_get_constraintdef`, e.g. `CHECK ((name IS NOT NULL))`.
    pub definition: String,
    pub validated: bool,
}

impl ConstraintDescriptor {
    pub fn new(name: impl Into<String>, definition: impl Into<String>, validated: bool) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            validated,
        }
    }
}

/// Table-level lock modes as named in `pg_locks.mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    AccessShare,
    RowShare,
    RowExclusive,
    ShareUpdateExclusive,
    Share,
    ShareRowExclusive,
    Exclusive,
    AccessExclusive,
}

impl LockMode {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "AccessShareLock" => LockMode::AccessShare,
            "RowShareLock" => LockMode::RowShare,
            "RowExclusiveLock" => LockMode::RowExclusive,
            "ShareUpdateExclusiveLock" => LockMode::ShareUpdateExclusive,
            "ShareLock" => LockMode::Share,
            "ShareRowExclusiveLock" => LockMode::ShareRowExclusive,
            "ExclusiveLock" => LockMode::Exclusive,
            "AccessExclusiveLock" => LockMode::AccessExclusive,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LockMode::AccessShare => "AccessShareLock",
            LockMode::RowShare => "RowShareLock",
            LockMode::RowExclusive => "RowExclusiveLock",
            LockMode::ShareUpdateExclusive => "ShareUpdateExclusiveLock",
            LockMode::Share => "ShareLock",
            LockMode::ShareRowExclusive => "ShareRowExclusiveLock",
            LockMode::Exclusive => "ExclusiveLock",
            LockMode::AccessExclusive => "AccessExclusiveLock",
        }
    }

    /// Modes that conflict with the row writes a validation scan must wait
    /// behind.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            LockMode::Share
                | LockMode::ShareRowExclusive
                | LockMode::Exclusive
                | LockMode::AccessExclusive
        )
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relation lock held by the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLock {
    pub relation: String,
    pub mode: LockMode,
}

impl SessionLock {
    pub fn new(relation: impl Into<String>, mode: LockMode) -> Self {
        Self {
            relation: relation.into(),
            mode,
        }
    }
}

/// Queries the checker issues against the database. All of them are
/// read-only.
pub trait Introspector {
    /// `SHOW server_version_num`.
    fn server_version_num(&mut self) -> Result<u32, IntrospectError>;

    /// `SHOW timezone`.
    fn time_zone(&mut self) -> Result<String, IntrospectError>;

    fn columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>, IntrospectError>;

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexDescriptor>, IntrospectError>;

    fn check_constraints(
        &mut self,
        table: &str,
    ) -> Result<Vec<ConstraintDescriptor>, IntrospectError>;

    /// Relation locks held by this backend.
    fn session_locks(&mut self) -> Result<Vec<SessionLock>, IntrospectError>;
}

impl<I: Introspector + ?Sized> Introspector for &mut I {
    fn server_version_num(&mut self) -> Result<u32, IntrospectError> {
        (**self).server_version_num()
    }

    fn time_zone(&mut self) -> Result<String, IntrospectError> {
        (**self).time_zone()
    }

    fn columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>, IntrospectError> {
        (**self).columns(table)
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexDescriptor>, IntrospectError> {
        (**self).indexes(table)
    }

    fn check_constraints(
        &mut self,
        table: &str,
    ) -> Result<Vec<ConstraintDescriptor>, IntrospectError> {
        (**self).check_constraints(table)
    }

    fn session_locks(&mut self) -> Result<Vec<SessionLock>, IntrospectError> {
        (**self).session_locks()
    }
}
