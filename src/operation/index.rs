use crate::operation::{Operation, OperationKind};
use crate::value::{Options, Value};

impl Operation {
    /// `add_index(table, columns)` where `columns` is a name or a list.
    pub fn add_index(table: impl Into<String>, columns: impl Into<Value>) -> Self {
        Operation::new(OperationKind::AddIndex)
            .arg(Value::Str(table.into()))
            .arg(columns.into())
    }

    /// `remove_index(table, column: ...)`; name the index with the `name`
    /// option instead when the columns are unknown.
    pub fn remove_index(table: impl Into<String>, columns: impl Into<Value>) -> Self {
        Operation::new(OperationKind::RemoveIndex)
            .arg(Value::Str(table.into()))
            .option("column", columns)
    }

    /// Whether the operation asked for a non-blocking build or drop.
    pub(crate) fn is_concurrent(&self) -> bool {
        self.options
            .get("algorithm")
            .is_some_and(|v| v.is("concurrently"))
    }

    /// `remove_index` takes either a column as second positional argument or
    /// an options map; fold both shapes into options.
    pub(crate) fn remove_index_options(&self) -> Options {
        let mut options = Options::new();
        match self.arg_at(1) {
            Some(Value::Map(map)) => {
                for (k, v) in map.iter() {
                    options.insert(k, v.clone());
                }
            }
            Some(value) if !value.is_null() => options.insert("column", value.clone()),
            _ => {}
        }
        for (k, v) in self.options.iter() {
            options.insert(k, v.clone());
        }
        options
    }
}
