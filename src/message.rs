//! Diagnostic templates.
//!
//! Templates use `%{name}` placeholders. Unknown placeholders are left in
//! place so a broken override is visible instead of silently blank.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Identifies which diagnostic applies to an unsafe verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    CreateTable,
    ShortPrimaryKeyType,
    RenameTable,
    AddColumnDefault,
    AddColumnJson,
    RenameColumn,
    ChangeColumn,
    ChangeColumnWithNotNull,
    ChangeColumnNull,
    RemoveColumn,
    AddReference,
    HashIndex,
    AddIndex,
    AddIndexColumns,
    RemoveIndex,
    AddForeignKey,
    ValidateForeignKey,
    AddCheckConstraint,
    ValidateCheckConstraint,
    Execute,
    MultipleForeignKeys,
    Custom,
}

impl MessageKey {
    pub const ALL: [MessageKey; 22] = [
        MessageKey::CreateTable,
        MessageKey::ShortPrimaryKeyType,
        MessageKey::RenameTable,
        MessageKey::AddColumnDefault,
        MessageKey::AddColumnJson,
        MessageKey::RenameColumn,
        MessageKey::ChangeColumn,
        MessageKey::ChangeColumnWithNotNull,
        MessageKey::ChangeColumnNull,
        MessageKey::RemoveColumn,
        MessageKey::AddReference,
        MessageKey::HashIndex,
        MessageKey::AddIndex,
        MessageKey::AddIndexColumns,
        MessageKey::RemoveIndex,
        MessageKey::AddForeignKey,
        MessageKey::ValidateForeignKey,
        MessageKey::AddCheckConstraint,
        MessageKey::ValidateCheckConstraint,
        MessageKey::Execute,
        MessageKey::MultipleForeignKeys,
        MessageKey::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::CreateTable => "create_table",
            MessageKey::ShortPrimaryKeyType => "short_primary_key_type",
            MessageKey::RenameTable => "rename_table",
            MessageKey::AddColumnDefault => "add_column_default",
            MessageKey::AddColumnJson => "add_column_json",
            MessageKey::RenameColumn => "rename_column",
            MessageKey::ChangeColumn => "change_column",
            MessageKey::ChangeColumnWithNotNull => "change_column_with_not_null",
            MessageKey::ChangeColumnNull => "change_column_null",
            MessageKey::RemoveColumn => "remove_column",
            MessageKey::AddReference => "add_reference",
            MessageKey::HashIndex => "hash_index",
            MessageKey::AddIndex => "add_index",
            MessageKey::AddIndexColumns => "add_index_columns",
            MessageKey::RemoveIndex => "remove_index",
            MessageKey::AddForeignKey => "add_foreign_key",
            MessageKey::ValidateForeignKey => "validate_foreign_key",
            MessageKey::AddCheckConstraint => "add_check_constraint",
            MessageKey::ValidateCheckConstraint => "validate_check_constraint",
            MessageKey::Execute => "execute",
            MessageKey::MultipleForeignKeys => "multiple_foreign_keys",
            MessageKey::Custom => "custom",
        }
    }

    /// Banner shown above the diagnostic.
    pub fn header(self) -> &'static str {
        match self {
            MessageKey::Execute => "Possibly dangerous operation",
            MessageKey::AddIndexColumns => "Best practice",
            _ => "Dangerous operation detected",
        }
    }

    fn default_template(self) -> &'static str {
        match self {
            MessageKey::CreateTable => {
                "The force option will destroy existing data.
If this is intended, drop the existing table in its own migration."
            }
            MessageKey::ShortPrimaryKeyType => {
                "Primary keys of type %{type} can run out of values.
Use bigint or uuid instead:

    create_table(\"%{table}\", id: bigint)"
            }
            MessageKey::RenameTable => {
                "Renaming a table that's in use will cause errors in your application.
A safer approach is to:

1. Create a new table
2. Write to both tables
3. Backfill data from the old table to the new table
4. Move reads from the old table to the new table
5. Stop writing to the old table
6. Drop the old table"
            }
            MessageKey::AddColumnDefault => {
                "Adding a column with a %{default_kind} default blocks %{rewrite_blocks} while the entire table is rewritten.
Instead, add the column without a default value, then change the default.

class %{migration_name} < %{migration_base}
  def up
    %{add_command}
    %{change_command}
  end
end

Then backfill the existing rows in batches, outside of a transaction.

    %{backfill_sql}%{append}"
            }
            MessageKey::AddColumnJson => {
                "There's no equality operator for the json column type, which can cause errors for
existing SELECT DISTINCT queries in your application. Use jsonb instead.

class %{migration_name} < %{migration_base}
  def change
    %{command}
  end
end"
            }
            MessageKey::RenameColumn => {
                "Renaming a column that's in use will cause errors in your application.
A safer approach is to:

1. Create a new column
2. Write to both columns
3. Backfill data from the old column to the new column
4. Move reads from the old column to the new column
5. Stop writing to the old column
6. Drop the old column

Alternatively, expose the old name through a view while readers move over."
            }
            MessageKey::ChangeColumn => {
                "Changing the type of an existing column blocks reads and writes
while the entire table is rewritten. A safer approach is to:

1. Create a new column
2. Write to both columns
3. Backfill data from the old column to the new column
4. Move reads from the old column to the new column
5. Stop writing to the old column
6. Drop the old column"
            }
            MessageKey::ChangeColumnWithNotNull => {
                "Changing the type is safe, but setting NOT NULL is not. Instead, use:

    %{command}
    %{null_command}"
            }
            MessageKey::ChangeColumnNull => {
                "Setting NOT NULL on an existing column blocks reads and writes while every row is checked.
Instead, add a check constraint and validate it in a separate migration.

class %{migration_name} < %{migration_base}
  def change
    %{add_constraint_code}
  end
end

class Validate%{migration_name} < %{migration_base}
  def change
    %{validate_constraint_code}
  end
end"
            }
            MessageKey::RemoveColumn => {
                "Active processes may still read %{columns}, which will cause errors.
Stop reading the column%{column_suffix} in your application first, deploy,
then remove it in a migration wrapped in a safety-assured scope.

    %{command}%{index_commands}"
            }
            MessageKey::AddReference => {
                "%{headline} Instead, use:

class %{migration_name} < %{migration_base}
  disable_ddl_transaction!

  def change
    %{command}
  end
end%{append}"
            }
            MessageKey::HashIndex => {
                "Hash indexes are not WAL-logged before PostgreSQL 10 and are lost on crash.
Use a btree index instead:

    %{command}"
            }
            MessageKey::AddIndex => {
                "Adding an index non-concurrently blocks writes. Instead, use:

class %{migration_name} < %{migration_base}
  disable_ddl_transaction!

  def change
    %{command}
  end
end"
            }
            MessageKey::AddIndexColumns => {
                "Adding a non-unique index with more than three columns rarely improves performance.
Instead, start an index with columns that narrow down the results the most."
            }
            MessageKey::RemoveIndex => {
                "Removing an index non-concurrently blocks writes. Instead, use:

class %{migration_name} < %{migration_base}
  disable_ddl_transaction!

  def change
    %{command}
  end
end"
            }
            MessageKey::AddForeignKey => {
                "Adding a foreign key blocks writes on both tables. Instead,
add the foreign key without validating existing rows,
then validate them in a separate migration.

class %{migration_name} < %{migration_base}
  def change
    %{add_foreign_key_code}
  end
end

class Validate%{migration_name} < %{migration_base}
  def change
    %{validate_foreign_key_code}
  end
end"
            }
            MessageKey::ValidateForeignKey => {
                "Validating a foreign key while holding heavy locks on %{locked_relations} blocks reads and writes.
Validate the foreign key on %{table} in its own migration."
            }
            MessageKey::AddCheckConstraint => {
                "Adding a check constraint blocks reads and writes while every row is checked.
Instead, add the check constraint without validating existing rows,
then validate them in a separate migration.

class %{migration_name} < %{migration_base}
  def change
    %{add_check_constraint_code}
  end
end

class Validate%{migration_name} < %{migration_base}
  def change
    %{validate_check_constraint_code}
  end
end"
            }
            MessageKey::ValidateCheckConstraint => {
                "Validating a check constraint while holding heavy locks on %{locked_relations} blocks reads and writes.
Validate the check constraint on %{table} in its own migration."
            }
            MessageKey::Execute => {
                "The checker cannot tell whether raw SQL is safe.
Make sure it is, then wrap it in a safety-assured scope."
            }
            MessageKey::MultipleForeignKeys => {
                "Adding multiple foreign keys in a single migration blocks writes on all involved tables
(%{tables}) until the migration is complete. Add one foreign key per migration."
            }
            MessageKey::Custom => "%{message}",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named variables consumed by a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars(BTreeMap<String, String>);

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Template text per message key, built-ins overlaid with overrides.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    overrides: HashMap<MessageKey, String>,
}

impl Messages {
    pub fn new(overrides: HashMap<MessageKey, String>) -> Self {
        Self { overrides }
    }

    pub fn template(&self, key: MessageKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_template())
    }

    /// Full diagnostic: banner followed by the interpolated template.
    pub fn render(&self, key: MessageKey, vars: &Vars) -> String {
        let header = vars.get("header").unwrap_or_else(|| key.header());
        format!(
            "=== {} ===\n\n{}",
            header,
            interpolate(self.template(key), vars)
        )
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"%\{(\w+)\}").expect("placeholder pattern is valid"))
}

pub fn interpolate(template: &str, vars: &Vars) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
