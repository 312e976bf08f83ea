use crate::operation::{Operation, OperationKind};
use crate::value::Value;

impl Operation {
    /// Raw SQL. The checker cannot see inside it.
    pub fn execute(sql: impl Into<String>) -> Self {
        Operation::new(OperationKind::Execute).arg(Value::Str(sql.into()))
    }

    /// Several statements run as one operation.
    pub fn execute_all<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sql: Vec<String> = statements.into_iter().map(Into::into).collect();
        Self::execute(sql.join(";\n"))
    }
}
