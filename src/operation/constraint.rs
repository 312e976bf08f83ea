use crate::operation::{Operation, OperationKind};
use crate::value::Value;

impl Operation {
    pub fn add_reference(table: impl Into<String>, reference: impl Into<String>) -> Self {
        Operation::new(OperationKind::AddReference)
            .arg(Value::Str(table.into()))
            .arg(Value::Str(reference.into()))
    }

    pub fn remove_reference(table: impl Into<String>, reference: impl Into<String>) -> Self {
        Operation::new(OperationKind::RemoveReference)
            .arg(Value::Str(table.into()))
            .arg(Value::Str(reference.into()))
    }

    pub fn add_foreign_key(from_table: impl Into<String>, to_table: impl Into<String>) -> Self {
        Operation::new(OperationKind::AddForeignKey)
            .arg(Value::Str(from_table.into()))
            .arg(Value::Str(to_table.into()))
    }

    pub fn validate_foreign_key(from_table: impl Into<String>, to_table: impl Into<String>) -> Self {
        Operation::new(OperationKind::ValidateForeignKey)
            .arg(Value::Str(from_table.into()))
            .arg(Value::Str(to_table.into()))
    }

    pub fn add_check_constraint(table: impl Into<String>, expression: impl Into<String>) -> Self {
        Operation::new(OperationKind::AddCheckConstraint)
            .arg(Value::Str(table.into()))
            .arg(Value::Str(expression.into()))
    }

    /// `validate_check_constraint(table, name: ...)`.
    pub fn validate_check_constraint(table: impl Into<String>, name: impl Into<String>) -> Self {
        Operation::new(OperationKind::ValidateCheckConstraint)
            .arg(Value::Str(table.into()))
            .option("name", Value::Str(name.into()))
    }

    /// Validation is deferred only when explicitly switched off.
    pub(crate) fn defers_validation(&self) -> bool {
        self.options.get("validate").and_then(Value::as_bool) == Some(false)
    }
}
