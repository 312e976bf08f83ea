mod column;
mod constraint;
mod index;
mod sql;
mod table;

pub use table::{Declaration, TableBody};

use std::fmt;

use crate::error::CheckError;
use crate::render;
use crate::value::{Options, Value};

/// Every schema operation the checker has a rule for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateTable,
    CreateJoinTable,
    RenameTable,
    AddColumn,
    RenameColumn,
    ChangeColumn,
    ChangeColumnNull,
    RemoveColumn,
    RemoveColumns,
    RemoveTimestamps,
    RemoveReference,
    RemoveBelongsTo,
    AddReference,
    AddBelongsTo,
    AddIndex,
    RemoveIndex,
    AddForeignKey,
    ValidateForeignKey,
    AddCheckConstraint,
    ValidateCheckConstraint,
    Execute,
    /// Anything else the runtime issues.
    Other(String),
}

impl OperationKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "create_table" => OperationKind::CreateTable,
            "create_join_table" => OperationKind::CreateJoinTable,
            "rename_table" => OperationKind::RenameTable,
            "add_column" => OperationKind::AddColumn,
            "rename_column" => OperationKind::RenameColumn,
            "change_column" => OperationKind::ChangeColumn,
            "change_column_null" => OperationKind::ChangeColumnNull,
            "remove_column" => OperationKind::RemoveColumn,
            "remove_columns" => OperationKind::RemoveColumns,
            "remove_timestamps" => OperationKind::RemoveTimestamps,
            "remove_reference" => OperationKind::RemoveReference,
            "remove_belongs_to" => OperationKind::RemoveBelongsTo,
            "add_reference" => OperationKind::AddReference,
            "add_belongs_to" => OperationKind::AddBelongsTo,
            "add_index" => OperationKind::AddIndex,
            "remove_index" => OperationKind::RemoveIndex,
            "add_foreign_key" => OperationKind::AddForeignKey,
            "validate_foreign_key" => OperationKind::ValidateForeignKey,
            "add_check_constraint" => OperationKind::AddCheckConstraint,
            "validate_check_constraint" => OperationKind::ValidateCheckConstraint,
            "execute" => OperationKind::Execute,
            other => OperationKind::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OperationKind::CreateTable => "create_table",
            OperationKind::CreateJoinTable => "create_join_table",
            OperationKind::RenameTable => "rename_table",
            OperationKind::AddColumn => "add_column",
            OperationKind::RenameColumn => "rename_column",
            OperationKind::ChangeColumn => "change_column",
            OperationKind::ChangeColumnNull => "change_column_null",
            OperationKind::RemoveColumn => "remove_column",
            OperationKind::RemoveColumns => "remove_columns",
            OperationKind::RemoveTimestamps => "remove_timestamps",
            OperationKind::RemoveReference => "remove_reference",
            OperationKind::RemoveBelongsTo => "remove_belongs_to",
            OperationKind::AddReference => "add_reference",
            OperationKind::AddBelongsTo => "add_belongs_to",
            OperationKind::AddIndex => "add_index",
            OperationKind::RemoveIndex => "remove_index",
            OperationKind::AddForeignKey => "add_foreign_key",
            OperationKind::ValidateForeignKey => "validate_foreign_key",
            OperationKind::AddCheckConstraint => "add_check_constraint",
            OperationKind::ValidateCheckConstraint => "validate_check_constraint",
            OperationKind::Execute => "execute",
            OperationKind::Other(name) => name,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A schema operation as issued by the migration runtime: a kind, positional
/// arguments, named options and, for table creation, the declarations of the
/// table body.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub args: Vec<Value>,
    pub options: Options,
    pub body: Option<TableBody>,
}

impl Operation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
            options: Options::new(),
            body: None,
        }
    }

    /// Build from the runtime's command name.
    pub fn named(name: &str) -> Self {
        Self::new(OperationKind::from_name(name))
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn with_body(mut self, body: TableBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Positional argument `idx` as a name, or an argument error.
    pub fn str_arg(&self, idx: usize) -> Result<&str, CheckError> {
        self.args
            .get(idx)
            .and_then(Value::as_str)
            .ok_or_else(|| CheckError::invalid(self.name(), format!("argument {} must be a name", idx + 1)))
    }

    pub fn arg_at(&self, idx: usize) -> Option<&Value> {
        self.args.get(idx)
    }

    /// The operation written back as a command.
    pub fn describe(&self) -> String {
        render::command(self.name(), &self.args, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        let names = [
            "create_table",
            "create_join_table",
            "rename_table",
            "add_column",
            "rename_column",
            "change_column",
            "change_column_null",
            "remove_column",
            "remove_columns",
            "remove_timestamps",
            "remove_reference",
            "remove_belongs_to",
            "add_reference",
            "add_belongs_to",
            "add_index",
            "remove_index",
            "add_foreign_key",
            "validate_foreign_key",
            "add_check_constraint",
            "validate_check_constraint",
            "execute",
        ];
        for name in names {
            let kind = OperationKind::from_name(name);
            assert!(!matches!(kind, OperationKind::Other(_)), "{name}");
            assert_eq!(kind.name(), name);
        }
    }

    #[test]
    fn unknown_names_become_other() {
        let kind = OperationKind::from_name("change_table_comment");
        assert_eq!(kind, OperationKind::Other("change_table_comment".into()));
        assert_eq!(kind.to_string(), "change_table_comment");
    }

    #[test]
    fn named_builder() {
        let op = Operation::named("add_index")
            .arg("users")
            .arg("email")
            .option("unique", true);

        assert_eq!(op.kind, OperationKind::AddIndex);
        assert_eq!(op.str_arg(0).unwrap(), "users");
        assert_eq!(op.describe(), "add_index(\"users\", \"email\", unique: true)");
    }

    #[test]
    fn missing_argument_is_an_error() {
        let op = Operation::named("rename_table").arg("users");
        let err = op.str_arg(1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid arguments for rename_table: argument 2 must be a name"
        );
    }
}
