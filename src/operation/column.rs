use crate::operation::{Operation, OperationKind};
use crate::value::Value;

impl Operation {
    /// `add_column(table, column, type)`; pass `default`, `null` and the
    /// like through [`Operation::option`].
    pub fn add_column(
        table: impl Into<String>,
        column: impl Into<String>,
        column_type: impl Into<String>,
    ) -> Self {
        Operation::new(OperationKind::AddColumn)
            .arg(Value::Str(table.into()))
            .arg(Value::Str(column.into()))
            .arg(Value::Symbol(column_type.into()))
    }

    pub fn rename_column(
        table: impl Into<String>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Operation::new(OperationKind::RenameColumn)
            .arg(Value::Str(table.into()))
            .arg(Value::Str(old_name.into()))
            .arg(Value::Str(new_name.into()))
    }

    /// `change_column(table, column, type)`; `limit`, `precision`, `scale`
    /// and `null` go in the options.
    pub fn change_column(
        table: impl Into<String>,
        column: impl Into<String>,
        column_type: impl Into<String>,
    ) -> Self {
        Operation::new(OperationKind::ChangeColumn)
            .arg(Value::Str(table.into()))
            .arg(Value::Str(column.into()))
            .arg(Value::Symbol(column_type.into()))
    }

    /// `change_column_null(table, column, null[, default])`.
    pub fn change_column_null(
        table: impl Into<String>,
        column: impl Into<String>,
        null: bool,
        default: Option<Value>,
    ) -> Self {
        let op = Operation::new(OperationKind::ChangeColumnNull)
            .arg(Value::Str(table.into()))
            .arg(Value::Str(column.into()))
            .arg(Value::Bool(null));
        match default {
            Some(default) => op.arg(default),
            None => op,
        }
    }

    pub fn remove_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Operation::new(OperationKind::RemoveColumn)
            .arg(Value::Str(table.into()))
            .arg(Value::Str(column.into()))
    }

    pub fn remove_columns<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        columns.into_iter().fold(
            Operation::new(OperationKind::RemoveColumns).arg(Value::Str(table.into())),
            |op, column| op.arg(Value::Str(column.into())),
        )
    }

    pub fn remove_timestamps(table: impl Into<String>) -> Self {
        Operation::new(OperationKind::RemoveTimestamps).arg(Value::Str(table.into()))
    }

    /// Column names an operation of the remove family takes away.
    pub(crate) fn removed_columns(&self) -> Vec<String> {
        match self.kind {
            OperationKind::RemoveTimestamps => {
                vec!["created_at".to_string(), "updated_at".to_string()]
            }
            OperationKind::RemoveColumn => self
                .arg_at(1)
                .and_then(Value::as_str)
                .map(|c| vec![c.to_string()])
                .unwrap_or_default(),
            OperationKind::RemoveColumns => self.args.iter().skip(1).flat_map(Value::names).collect(),
            OperationKind::RemoveReference | OperationKind::RemoveBelongsTo => {
                let Some(reference) = self.arg_at(1).and_then(Value::as_str) else {
                    return Vec::new();
                };
                let mut columns = Vec::new();
                if self.options.is_truthy("polymorphic") {
                    columns.push(format!("{reference}_type"));
                }
                columns.push(format!("{reference}_id"));
                columns
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_column_describe() {
        let op = Operation::add_column("users", "credits", "integer").option("default", 0);
        assert_eq!(
            op.describe(),
            "add_column(\"users\", \"credits\", integer, default: 0)"
        );
    }

    #[test]
    fn change_column_null_with_default() {
        let op = Operation::change_column_null("users", "name", false, Some(Value::str("")));
        assert_eq!(op.args.len(), 4);
        assert_eq!(op.arg_at(2), Some(&Value::Bool(false)));
    }

    #[test]
    fn removed_columns_per_kind() {
        assert_eq!(
            Operation::remove_column("users", "email").removed_columns(),
            vec!["email"]
        );
        assert_eq!(
            Operation::remove_columns("users", ["a", "b"]).removed_columns(),
            vec!["a", "b"]
        );
        assert_eq!(
            Operation::remove_timestamps("users").removed_columns(),
            vec!["created_at", "updated_at"]
        );
        assert_eq!(
            Operation::remove_reference("comments", "commentable")
                .option("polymorphic", true)
                .removed_columns(),
            vec!["commentable_type", "commentable_id"]
        );
    }
}
