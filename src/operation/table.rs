use crate::column_type::ColumnType;
use crate::operation::{Operation, OperationKind};
use crate::value::{Options, Value};

/// One declaration inside a table-creation body.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Column {
        name: String,
        column_type: ColumnType,
        options: Options,
    },
    References {
        name: String,
        options: Options,
    },
    Index {
        columns: Vec<String>,
        options: Options,
    },
    ForeignKey {
        to_table: String,
        options: Options,
    },
    CheckConstraint {
        expression: String,
        options: Options,
    },
    Timestamps {
        options: Options,
    },
}

/// Declarations of a table body in the order they were written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableBody {
    declarations: Vec<Declaration>,
}

impl TableBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.column_with(name, column_type, Options::new())
    }

    pub fn column_with(
        mut self,
        name: impl Into<String>,
        column_type: ColumnType,
        options: Options,
    ) -> Self {
        self.declarations.push(Declaration::Column {
            name: name.into(),
            column_type,
            options,
        });
        self
    }

    pub fn references(mut self, name: impl Into<String>, options: Options) -> Self {
        self.declarations.push(Declaration::References {
            name: name.into(),
            options,
        });
        self
    }

    pub fn index(mut self, columns: impl Into<Value>, options: Options) -> Self {
        self.declarations.push(Declaration::Index {
            columns: columns.into().names(),
            options,
        });
        self
    }

    pub fn foreign_key(mut self, to_table: impl Into<String>, options: Options) -> Self {
        self.declarations.push(Declaration::ForeignKey {
            to_table: to_table.into(),
            options,
        });
        self
    }

    pub fn check_constraint(mut self, expression: impl Into<String>, options: Options) -> Self {
        self.declarations.push(Declaration::CheckConstraint {
            expression: expression.into(),
            options,
        });
        self
    }

    pub fn timestamps(mut self) -> Self {
        self.declarations.push(Declaration::Timestamps {
            options: Options::new(),
        });
        self
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl Operation {
    pub fn create_table(name: impl Into<String>, body: TableBody) -> Self {
        Operation::new(OperationKind::CreateTable)
            .arg(Value::Str(name.into()))
            .with_body(body)
    }

    pub fn create_join_table(first: impl Into<String>, second: impl Into<String>) -> Self {
        Operation::new(OperationKind::CreateJoinTable)
            .arg(Value::Str(first.into()))
            .arg(Value::Str(second.into()))
    }

    pub fn rename_table(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Operation::new(OperationKind::RenameTable)
            .arg(Value::Str(old_name.into()))
            .arg(Value::Str(new_name.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_keeps_declaration_order() {
        let body = TableBody::new()
            .column("title", ColumnType::String)
            .references("user", Options::new().with("foreign_key", true))
            .index("title", Options::new())
            .timestamps();

        assert_eq!(body.len(), 4);
        assert!(matches!(body.declarations()[0], Declaration::Column { .. }));
        assert!(matches!(body.declarations()[3], Declaration::Timestamps { .. }));
    }

    #[test]
    fn index_accepts_column_lists() {
        let body = TableBody::new().index(vec!["a", "b"], Options::new());
        match &body.declarations()[0] {
            Declaration::Index { columns, .. } => assert_eq!(columns, &["a", "b"]),
            other => panic!("Expected Index, got {other:?}"),
        }
    }

    #[test]
    fn create_table_carries_body() {
        let op = Operation::create_table("posts", TableBody::new().column("title", ColumnType::Text))
            .option("id", Value::symbol("bigint"));

        assert_eq!(op.kind, OperationKind::CreateTable);
        assert_eq!(op.body.as_ref().map(TableBody::len), Some(1));
        assert_eq!(op.describe(), "create_table(\"posts\", id: bigint)");
    }

    #[test]
    fn rename_table_arguments() {
        let op = Operation::rename_table("users", "accounts");
        assert_eq!(op.str_arg(0).unwrap(), "users");
        assert_eq!(op.str_arg(1).unwrap(), "accounts");
    }
}
