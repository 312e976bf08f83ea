//! The decision engine: one `check` call per schema operation, before the
//! runtime executes it.

mod change_column;
mod rules;
mod safe;

pub use rules::{Verdict, Violation};
pub use safe::{SafeGuard, SafeOverride};

use std::collections::BTreeSet;

use tracing::{debug, trace, warn};

use crate::config::{self, Config};
use crate::error::{CheckError, UnsafeOperation};
use crate::introspect::Introspector;
use crate::message::{MessageKey, Messages, Vars};
use crate::operation::{Operation, OperationKind};
use crate::version::{ServerVersion, MINIMUM_SUPPORTED};
use rules::RuleContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Up,
    Down,
}

/// The migration an operation belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInfo {
    pub name: String,
    pub version: Option<u64>,
    pub direction: Direction,
    /// Class the remediation migrations derive from.
    pub base: String,
}

impl MigrationInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            direction: Direction::Up,
            base: "Migration".to_string(),
        }
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

type CustomCheck = Box<dyn Fn(&Operation, ServerVersion) -> Option<String>>;

pub struct Checker<I: Introspector> {
    introspector: I,
    config: Config,
    messages: Messages,
    version: Option<ServerVersion>,
    foreign_key_tables: BTreeSet<String>,
    custom_checks: Vec<CustomCheck>,
}

impl<I: Introspector> Checker<I> {
    pub fn new(introspector: I, config: Config) -> Self {
        let messages = config.messages();
        Self {
            introspector,
            config,
            messages,
            version: None,
            foreign_key_tables: BTreeSet::new(),
            custom_checks: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn introspector(&self) -> &I {
        &self.introspector
    }

    pub fn introspector_mut(&mut self) -> &mut I {
        &mut self.introspector
    }

    pub fn into_introspector(self) -> I {
        self.introspector
    }

    /// Tables that received a foreign key in the current migration.
    pub fn foreign_key_tables(&self) -> &BTreeSet<String> {
        &self.foreign_key_tables
    }

    /// Forget per-migration state. Call between migrations.
    pub fn reset(&mut self) {
        self.foreign_key_tables.clear();
    }

    /// Register an extra rule. Returning a message rejects the operation
    /// with the `custom` key.
    pub fn add_check<F>(&mut self, check: F)
    where
        F: Fn(&Operation, ServerVersion) -> Option<String> + 'static,
    {
        self.custom_checks.push(Box::new(check));
    }

    /// Decide whether `op` may run. `Err` means the migration must stop.
    pub fn check(
        &mut self,
        op: &Operation,
        migration: &MigrationInfo,
        safe: &SafeOverride,
    ) -> Result<(), CheckError> {
        if let Some(reason) = self.skip_reason(migration, safe) {
            debug!(operation = %op.kind, migration = %migration.name, reason, "skipping check");
            return Ok(());
        }

        let version = self.server_version()?;
        if version < MINIMUM_SUPPORTED {
            return Err(CheckError::UnsupportedVersion(version));
        }

        if self.config.strict_unknown {
            if let OperationKind::Other(name) = &op.kind {
                return Err(CheckError::UnknownOperation(name.clone()));
            }
        }

        trace!(operation = %op.kind, migration = %migration.name, "checking operation");

        let mut ctx = RuleContext {
            introspector: &mut self.introspector,
            version,
            foreign_key_tables: &mut self.foreign_key_tables,
            index_best_practices: self.config.index_best_practices,
        };
        let mut verdict = rules::evaluate(op, &mut ctx)?;

        if verdict.is_safe() {
            if let Some(message) = self.custom_checks.iter().find_map(|check| check(op, version)) {
                let vars = Vars::new().with("message", message);
                verdict = Verdict::Unsafe(Violation::new(MessageKey::Custom, vars));
            }
        }

        if self.foreign_key_tables.len() > 1 {
            let tables = self
                .foreign_key_tables
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            verdict = Verdict::Unsafe(Violation::new(
                MessageKey::MultipleForeignKeys,
                Vars::new().with("tables", tables),
            ));
        }

        match verdict {
            Verdict::Safe => Ok(()),
            Verdict::Unsafe(violation) => Err(self.reject(op, migration, violation)),
        }
    }

    fn skip_reason(&self, migration: &MigrationInfo, safe: &SafeOverride) -> Option<&'static str> {
        if safe.is_active() {
            Some("safety assured")
        } else if config::safety_assured_by_env() {
            Some("safety assured by environment")
        } else if migration.direction == Direction::Down && !self.config.check_down {
            Some("migrating down")
        } else if migration
            .version
            .is_some_and(|version| version <= self.config.start_after)
        {
            Some("migration predates start_after")
        } else {
            None
        }
    }

    /// The configured target version, or the server's own, asked once.
    pub fn server_version(&mut self) -> Result<ServerVersion, CheckError> {
        if let Some(version) = self.config.target_version {
            return Ok(version);
        }
        if let Some(version) = self.version {
            return Ok(version);
        }

        let version = ServerVersion::from_packed(self.introspector.server_version_num()?);
        debug!(%version, "resolved server version");
        self.version = Some(version);
        Ok(version)
    }

    fn reject(&self, op: &Operation, migration: &MigrationInfo, violation: Violation) -> CheckError {
        let Violation { key, mut vars } = violation;
        vars.set("migration_name", migration.name.as_str());
        vars.set("migration_base", migration.base.as_str());
        if !vars.contains("header") {
            vars.set("header", key.header());
        }

        warn!(%key, operation = %op.kind, migration = %migration.name, "unsafe operation");

        let message = self.messages.render(key, &vars);
        CheckError::Unsafe(Box::new(UnsafeOperation { key, vars, message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::InMemorySchema;
    use crate::value::{Options, Value};
    use std::collections::HashMap;

    fn checker(version: ServerVersion) -> Checker<InMemorySchema> {
        Checker::new(InMemorySchema::new(version), Config::default())
    }

    fn migration() -> MigrationInfo {
        MigrationInfo::new("AddStuff").version(20240101000000)
    }

    #[test]
    fn override_skips_checks() {
        let mut checker = checker(ServerVersion::new(12, 0, 0));
        let safe = SafeOverride::new();
        let op = Operation::rename_table("users", "accounts");

        assert!(checker.check(&op, &migration(), &safe).is_err());
        safe.scope(|| assert!(checker.check(&op, &migration(), &safe).is_ok()));
        assert!(checker.check(&op, &migration(), &safe).is_err());
    }

    #[test]
    fn down_migrations_only_when_configured() {
        let op = Operation::rename_table("users", "accounts");
        let down = migration().direction(Direction::Down);

        let mut checker = checker(ServerVersion::new(12, 0, 0));
        assert!(checker.check(&op, &down, &SafeOverride::new()).is_ok());

        let config = Config {
            check_down: true,
            ..Config::default()
        };
        let mut checker = Checker::new(InMemorySchema::default(), config);
        assert!(checker.check(&op, &down, &SafeOverride::new()).is_err());
    }

    #[test]
    fn start_after_skips_old_migrations() {
        let config = Config {
            start_after: 20240101000000,
            ..Config::default()
        };
        let mut checker = Checker::new(InMemorySchema::default(), config);
        let op = Operation::rename_table("users", "accounts");
        let safe = SafeOverride::new();

        assert!(checker.check(&op, &migration(), &safe).is_ok());
        let newer = MigrationInfo::new("RenameUsers").version(20240101000001);
        assert!(checker.check(&op, &newer, &safe).is_err());
        assert!(checker.check(&op, &MigrationInfo::new("Unversioned"), &safe).is_err());
    }

    #[test]
    fn skipped_checks_do_not_query() {
        let mut checker = checker(ServerVersion::new(12, 0, 0));
        let safe = SafeOverride::new();
        let _guard = safe.assume_safe();
        checker
            .check(&Operation::remove_column("users", "email"), &migration(), &safe)
            .unwrap();
        assert_eq!(checker.introspector().queries(), 0);
    }

    #[test]
    fn version_is_memoized() {
        let mut checker = checker(ServerVersion::new(12, 0, 0));
        let safe = SafeOverride::new();
        let op = Operation::named("add_timestamps").arg("users");

        checker.check(&op, &migration(), &safe).unwrap();
        checker.check(&op, &migration(), &safe).unwrap();
        assert_eq!(checker.introspector().queries(), 1);
    }

    #[test]
    fn target_version_wins() {
        let config = Config {
            target_version: Some(ServerVersion::new(10, 5, 0)),
            ..Config::default()
        };
        let mut checker = Checker::new(InMemorySchema::new(ServerVersion::new(16, 0, 0)), config);
        let op = Operation::add_column("users", "credits", "integer").option("default", 0);

        let err = checker.check(&op, &migration(), &SafeOverride::new()).unwrap_err();
        assert_eq!(err.key(), Some(MessageKey::AddColumnDefault));
        assert_eq!(checker.introspector().queries(), 0);
    }

    #[test]
    fn rejects_ancient_servers() {
        let mut checker = checker(ServerVersion::new(9, 5, 0));
        let err = checker
            .check(&Operation::named("add_timestamps"), &migration(), &SafeOverride::new())
            .unwrap_err();
        assert!(matches!(err, CheckError::UnsupportedVersion(_)));
    }

    #[test]
    fn strict_unknown() {
        let op = Operation::named("add_timestamps").arg("users");

        let mut lenient = checker(ServerVersion::new(12, 0, 0));
        assert!(lenient.check(&op, &migration(), &SafeOverride::new()).is_ok());

        let config = Config {
            strict_unknown: true,
            ..Config::default()
        };
        let mut strict = Checker::new(InMemorySchema::default(), config);
        let err = strict.check(&op, &migration(), &SafeOverride::new()).unwrap_err();
        assert!(matches!(err, CheckError::UnknownOperation(name) if name == "add_timestamps"));
    }

    #[test]
    fn custom_checks_run_after_rules() {
        let mut checker = checker(ServerVersion::new(12, 0, 0));
        checker.add_check(|op, _| {
            (op.name() == "add_column" && op.str_arg(1).ok() == Some("password"))
                .then(|| "Store a digest, not the password".to_string())
        });
        let safe = SafeOverride::new();

        let err = checker
            .check(&Operation::add_column("users", "password", "string"), &migration(), &safe)
            .unwrap_err();
        assert_eq!(err.key(), Some(MessageKey::Custom));
        assert!(err.to_string().ends_with("Store a digest, not the password"));

        assert!(checker
            .check(&Operation::add_column("users", "email", "string"), &migration(), &safe)
            .is_ok());
    }

    #[test]
    fn second_foreign_key_table_fails() {
        let mut checker = checker(ServerVersion::new(12, 0, 0));
        let safe = SafeOverride::new();
        let first = Operation::add_foreign_key("posts", "users").option("validate", false);
        let second = Operation::add_foreign_key("posts", "blogs").option("validate", false);

        checker.check(&first, &migration(), &safe).unwrap();
        checker.check(&first, &migration(), &safe).unwrap();
        let err = checker.check(&second, &migration(), &safe).unwrap_err();
        assert_eq!(err.key(), Some(MessageKey::MultipleForeignKeys));
        assert_eq!(err.as_unsafe().unwrap().vars.get("tables"), Some("blogs, users"));

        checker.reset();
        assert!(checker.foreign_key_tables().is_empty());
        checker.check(&second, &migration(), &safe).unwrap();
    }

    #[test]
    fn rendered_message_carries_migration() {
        let mut checker = checker(ServerVersion::new(10, 5, 0));
        let migration = MigrationInfo::new("AddCreditsToUsers").base("ApplicationMigration");
        let op = Operation::add_column("users", "credits", "integer").option("default", 0);

        let err = checker.check(&op, &migration, &SafeOverride::new()).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("=== Dangerous operation detected ===\n\n"));
        assert!(message.contains("class AddCreditsToUsers < ApplicationMigration"));
        assert!(message.contains("UPDATE \"users\" SET \"credits\" = 0"));
    }

    #[test]
    fn message_overrides_apply() {
        let mut overrides = HashMap::new();
        overrides.insert(MessageKey::AddIndex, "use %{command}".to_string());
        let config = Config {
            messages: overrides,
            ..Config::default()
        };
        let mut checker = Checker::new(InMemorySchema::default(), config);

        let err = checker
            .check(&Operation::add_index("users", "email"), &migration(), &SafeOverride::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "=== Dangerous operation detected ===\n\nuse add_index(\"users\", \"email\", algorithm: concurrently)"
        );
    }

    #[test]
    fn introspection_failures_propagate() {
        use crate::error::IntrospectError;
        use crate::introspect::{
            ColumnDescriptor, ConstraintDescriptor, IndexDescriptor, SessionLock,
        };

        struct Disconnected;

        fn gone<T>() -> Result<T, IntrospectError> {
            Err(IntrospectError::Query("connection reset".into()))
        }

        impl Introspector for Disconnected {
            fn server_version_num(&mut self) -> Result<u32, IntrospectError> {
                gone()
            }
            fn time_zone(&mut self) -> Result<String, IntrospectError> {
                gone()
            }
            fn columns(&mut self, _: &str) -> Result<Vec<ColumnDescriptor>, IntrospectError> {
                gone()
            }
            fn indexes(&mut self, _: &str) -> Result<Vec<IndexDescriptor>, IntrospectError> {
                gone()
            }
            fn check_constraints(
                &mut self,
                _: &str,
            ) -> Result<Vec<ConstraintDescriptor>, IntrospectError> {
                gone()
            }
            fn session_locks(&mut self) -> Result<Vec<SessionLock>, IntrospectError> {
                gone()
            }
        }

        let op = Operation::add_reference("posts", "user").option(
            "index",
            Options::new().with("algorithm", Value::symbol("concurrently")),
        );

        let mut checker = Checker::new(Disconnected, Config::default());
        let err = checker.check(&op, &migration(), &SafeOverride::new()).unwrap_err();
        assert!(matches!(err, CheckError::Introspect(_)));

        let config = Config {
            target_version: Some(ServerVersion::new(12, 0, 0)),
            ..Config::default()
        };
        let mut checker = Checker::new(Disconnected, config);
        let err = checker
            .check(&Operation::remove_column("users", "email"), &migration(), &SafeOverride::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "introspection failed: query failed: connection reset");
    }
}
