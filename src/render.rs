//! Renders operations back into command text for remediation messages.
//!
//! Values the renderer cannot write as a literal become
//! [`PLACEHOLDER`], which the developer has to fill in by hand.

use sha2::{Digest, Sha256};

use crate::value::{Options, Value};

pub const PLACEHOLDER: &str = "<paste value here>";

const CHECK_CONSTRAINT_PREFIX: &str = "chk_rails_";

/// `name(arg, arg, key: value, ...)`.
pub fn command(name: &str, args: &[Value], options: &Options) -> String {
    let mut parts: Vec<String> = args.iter().map(literal).collect();
    parts.extend(options.iter().map(|(k, v)| format!("{}: {}", k, literal(v))));
    format!("{}({})", name, parts.join(", "))
}

pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{:?}", f),
        Value::Str(s) => quote(s),
        Value::Symbol(s) => s.clone(),
        Value::Timestamp(ts) => format!("timestamp({})", quote(ts)),
        Value::Expr(sql) => format!("sql({})", quote(sql)),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Map(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", k, literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Opaque(_) => PLACEHOLDER.to_string(),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Name a check constraint gets when none is given, so a remediation that
/// adds it with an explicit name matches what the original call would have
/// created.
pub fn check_constraint_name(table: &str, expression: &str) -> String {
    let identifier = format!("{}_{}_chk", table, expression);
    let digest = Sha256::digest(identifier.as_bytes());
    let hex = format!("{:x}", digest);
    format!("{}{}", CHECK_CONSTRAINT_PREFIX, &hex[..10])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_primitives() {
        assert_eq!(literal(&Value::Null), "null");
        assert_eq!(literal(&Value::Bool(false)), "false");
        assert_eq!(literal(&Value::Int(-3)), "-3");
        assert_eq!(literal(&Value::Float(1.5)), "1.5");
        assert_eq!(literal(&Value::Float(2.0)), "2.0");
        assert_eq!(literal(&Value::symbol("jsonb")), "jsonb");
        assert_eq!(literal(&Value::str("say \"hi\"")), "\"say \\\"hi\\\"\"");
        assert_eq!(literal(&Value::expr("now()")), "sql(\"now()\")");
    }

    #[test]
    fn renders_nested_maps_inline() {
        let options = Options::new()
            .with("index", Options::new().with("algorithm", Value::symbol("concurrently")))
            .with("null", false);

        assert_eq!(
            command("add_reference", &[Value::str("posts"), Value::str("user")], &options),
            "add_reference(\"posts\", \"user\", index: {algorithm: concurrently}, null: false)"
        );
    }

    #[test]
    fn opaque_values_become_placeholders() {
        let options = Options::new().with("default", Value::Opaque("#<Proc>".into()));
        assert_eq!(
            command("add_column", &[Value::str("users"), Value::str("token")], &options),
            "add_column(\"users\", \"token\", default: <paste value here>)"
        );
    }

    #[test]
    fn check_constraint_name_is_deterministic() {
        let first = check_constraint_name("users", "price > 0");
        let second = check_constraint_name("users", "price > 0");

        assert_eq!(first, second);
        assert!(first.starts_with("chk_rails_"));
        assert_eq!(first.len(), "chk_rails_".len() + 10);
        assert_ne!(first, check_constraint_name("orders", "price > 0"));
    }

    #[test]
    fn check_constraint_name_hashes_identifier() {
        assert_eq!(
            check_constraint_name("users", "price > 0"),
            "chk_rails_121c6b6f3f"
        );
    }
}
