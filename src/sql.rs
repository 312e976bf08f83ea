//! PostgreSQL statements embedded in remediation text.

use sea_query::{Alias, Expr, PostgresQueryBuilder, Query, SimpleExpr};

use crate::render::PLACEHOLDER;
use crate::value::Value;

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `UPDATE table SET column = default` for backfilling existing rows.
pub fn backfill_sql(table: &str, column: &str, default: &Value) -> String {
    Query::update()
        .table(Alias::new(table))
        .value(Alias::new(column), value_expr(default))
        .to_string(PostgresQueryBuilder)
}

/// Like [`backfill_sql`], restricted to rows where `column` is NULL.
pub fn backfill_nulls_sql(table: &str, column: &str, default: &Value) -> String {
    Query::update()
        .table(Alias::new(table))
        .value(Alias::new(column), value_expr(default))
        .and_where(Expr::col(Alias::new(column)).is_null())
        .to_string(PostgresQueryBuilder)
}

pub fn add_not_null_check_sql(table: &str, constraint: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({} IS NOT NULL) NOT VALID",
        quote_identifier(table),
        quote_identifier(constraint),
        quote_identifier(column)
    )
}

pub fn validate_constraint_sql(table: &str, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} VALIDATE CONSTRAINT {}",
        quote_identifier(table),
        quote_identifier(constraint)
    )
}

pub fn drop_constraint_sql(table: &str, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        quote_identifier(table),
        quote_identifier(constraint)
    )
}

/// The definitions `pg_get_constraintdef` reports for a `column IS NOT NULL`
/// check, with and without identifier quoting.
pub fn not_null_check_definitions(column: &str) -> [String; 2] {
    [
        format!("CHECK (({} IS NOT NULL))", column),
        format!("CHECK (({} IS NOT NULL))", quote_identifier(column)),
    ]
}

fn value_expr(value: &Value) -> SimpleExpr {
    match value {
        Value::Null => Expr::cust("NULL"),
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::Str(s) | Value::Symbol(s) | Value::Timestamp(s) => s.as_str().into(),
        Value::Expr(sql) => Expr::cust(sql),
        Value::List(_) | Value::Map(_) | Value::Opaque(_) => Expr::cust(PLACEHOLDER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("user\"name"), "\"user\"\"name\"");
    }

    #[test]
    fn backfill_literal() {
        assert_eq!(
            backfill_sql("users", "credits", &Value::Int(0)),
            "UPDATE \"users\" SET \"credits\" = 0"
        );
        assert_eq!(
            backfill_sql("users", "status", &Value::str("active")),
            "UPDATE \"users\" SET \"status\" = 'active'"
        );
    }

    #[test]
    fn backfill_expression() {
        assert_eq!(
            backfill_sql("users", "token", &Value::expr("gen_random_uuid()")),
            "UPDATE \"users\" SET \"token\" = gen_random_uuid()"
        );
    }

    #[test]
    fn backfill_only_nulls() {
        assert_eq!(
            backfill_nulls_sql("users", "name", &Value::str("anonymous")),
            "UPDATE \"users\" SET \"name\" = 'anonymous' WHERE \"name\" IS NULL"
        );
    }

    #[test]
    fn constraint_statements() {
        assert_eq!(
            add_not_null_check_sql("users", "users_name_null", "name"),
            "ALTER TABLE \"users\" ADD CONSTRAINT \"users_name_null\" CHECK (\"name\" IS NOT NULL) NOT VALID"
        );
        assert_eq!(
            validate_constraint_sql("users", "users_name_null"),
            "ALTER TABLE \"users\" VALIDATE CONSTRAINT \"users_name_null\""
        );
        assert_eq!(
            drop_constraint_sql("users", "users_name_null"),
            "ALTER TABLE \"users\" DROP CONSTRAINT \"users_name_null\""
        );
    }

    #[test]
    fn not_null_definitions_cover_quoting() {
        let defs = not_null_check_definitions("name");
        assert_eq!(defs[0], "CHECK ((name IS NOT NULL))");
        assert_eq!(defs[1], "CHECK ((\"name\" IS NOT NULL))");
    }
}
