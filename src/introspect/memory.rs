use std::collections::HashMap;

use crate::error::IntrospectError;
use crate::introspect::{
    ColumnDescriptor, ConstraintDescriptor, IndexDescriptor, Introspector, SessionLock,
};
use crate::version::ServerVersion;

/// A fixed schema held in memory, for dry runs and tests.
///
/// Unknown tables report no columns, indexes or constraints.
#[derive(Debug, Clone)]
pub struct InMemorySchema {
    version: ServerVersion,
    time_zone: String,
    columns: HashMap<String, Vec<ColumnDescriptor>>,
    indexes: HashMap<String, Vec<IndexDescriptor>>,
    constraints: HashMap<String, Vec<ConstraintDescriptor>>,
    locks: Vec<SessionLock>,
    queries: usize,
}

impl Default for InMemorySchema {
    fn default() -> Self {
        Self::new(ServerVersion::new(16, 0, 0))
    }
}

impl InMemorySchema {
    pub fn new(version: ServerVersion) -> Self {
        Self {
            version,
            time_zone: "UTC".to_string(),
            columns: HashMap::new(),
            indexes: HashMap::new(),
            constraints: HashMap::new(),
            locks: Vec::new(),
            queries: 0,
        }
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn column(mut self, table: &str, column: ColumnDescriptor) -> Self {
        self.columns.entry(table.to_string()).or_default().push(column);
        self
    }

    pub fn index(mut self, table: &str, index: IndexDescriptor) -> Self {
        self.indexes.entry(table.to_string()).or_default().push(index);
        self
    }

    pub fn constraint(mut self, table: &str, constraint: ConstraintDescriptor) -> Self {
        self.constraints
            .entry(table.to_string())
            .or_default()
            .push(constraint);
        self
    }

    pub fn lock(mut self, lock: SessionLock) -> Self {
        self.locks.push(lock);
        self
    }

    /// Number of queries answered so far.
    pub fn queries(&self) -> usize {
        self.queries
    }
}

impl Introspector for InMemorySchema {
    fn server_version_num(&mut self) -> Result<u32, IntrospectError> {
        self.queries += 1;
        let v = self.version;
        Ok(v.major * 10000 + v.minor * 100 + v.patch)
    }

    fn time_zone(&mut self) -> Result<String, IntrospectError> {
        self.queries += 1;
        Ok(self.time_zone.clone())
    }

    fn columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>, IntrospectError> {
        self.queries += 1;
        Ok(self.columns.get(table).cloned().unwrap_or_default())
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexDescriptor>, IntrospectError> {
        self.queries += 1;
        Ok(self.indexes.get(table).cloned().unwrap_or_default())
    }

    fn check_constraints(
        &mut self,
        table: &str,
    ) -> Result<Vec<ConstraintDescriptor>, IntrospectError> {
        self.queries += 1;
        Ok(self.constraints.get(table).cloned().unwrap_or_default())
    }

    fn session_locks(&mut self) -> Result<Vec<SessionLock>, IntrospectError> {
        self.queries += 1;
        Ok(self.locks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_type::ColumnType;
    use crate::introspect::LockMode;

    #[test]
    fn packs_version_like_the_server() {
        let mut schema = InMemorySchema::new(ServerVersion::new(10, 5, 0));
        let packed = schema.server_version_num().unwrap();
        assert_eq!(packed, 100500);
        assert_eq!(ServerVersion::from_packed(packed), ServerVersion::new(10, 5, 0));
    }

    #[test]
    fn answers_per_table() {
        let mut schema = InMemorySchema::default()
            .column("users", ColumnDescriptor::new("email", ColumnType::String).limit(255))
            .index("users", IndexDescriptor::new("idx_users_email", ["email"]));

        assert_eq!(schema.columns("users").unwrap().len(), 1);
        assert_eq!(schema.indexes("users").unwrap()[0].name, "idx_users_email");
        assert!(schema.columns("posts").unwrap().is_empty());
        assert!(schema.check_constraints("users").unwrap().is_empty());
        assert_eq!(schema.queries(), 4);
    }

    #[test]
    fn reports_locks_and_time_zone() {
        let mut schema = InMemorySchema::default()
            .with_time_zone("America/New_York")
            .lock(SessionLock::new("users", LockMode::AccessExclusive));

        assert_eq!(schema.time_zone().unwrap(), "America/New_York");
        assert_eq!(schema.session_locks().unwrap()[0].mode, LockMode::AccessExclusive);
    }
}
