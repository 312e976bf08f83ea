//! Scanners over the declarations of a table-creation body.
//!
//! The outer table does not exist yet when these run, so they only gather
//! facts; the checker decides what the facts mean.

use std::collections::BTreeSet;

use crate::operation::{Declaration, TableBody};
use crate::value::{Options, Value};

pub trait Collector {
    fn visit(&mut self, declaration: &Declaration);
}

impl TableBody {
    /// Hand every declaration to `collector`, once each.
    pub fn walk<C: Collector + ?Sized>(&self, collector: &mut C) {
        for declaration in self.declarations() {
            collector.visit(declaration);
        }
    }

    pub fn collect<C: Collector + Default>(&self) -> C {
        let mut collector = C::default();
        self.walk(&mut collector);
        collector
    }
}

/// Tables referenced by inline foreign keys.
#[derive(Debug, Default)]
pub struct ForeignKeyCollector {
    pub tables: BTreeSet<String>,
}

impl Collector for ForeignKeyCollector {
    fn visit(&mut self, declaration: &Declaration) {
        match declaration {
            Declaration::References { name, options } => {
                if let Some(fk) = options.get("foreign_key").filter(|v| v.is_truthy()) {
                    let table = to_table(fk).unwrap_or_else(|| pluralize(name));
                    self.tables.insert(table);
                }
            }
            Declaration::ForeignKey { to_table, .. } => {
                self.tables.insert(to_table.clone());
            }
            Declaration::Column { options, .. } => {
                let table = options
                    .get("foreign_key")
                    .and_then(to_table)
                    .or_else(|| options.get("references").and_then(Value::as_str).map(str::to_string));
                if let Some(table) = table {
                    self.tables.insert(table);
                }
            }
            Declaration::Index { .. }
            | Declaration::CheckConstraint { .. }
            | Declaration::Timestamps { .. } => {}
        }
    }
}

/// Whether any index in the body uses the hash method.
#[derive(Debug, Default)]
pub struct HashIndexCollector {
    pub found: bool,
}

impl Collector for HashIndexCollector {
    fn visit(&mut self, declaration: &Declaration) {
        let hash = match declaration {
            Declaration::Index { options, .. } => uses_hash(options),
            Declaration::References { options, .. } | Declaration::Column { options, .. } => options
                .get("index")
                .and_then(Value::as_map)
                .is_some_and(uses_hash),
            _ => false,
        };
        self.found |= hash;
    }
}

pub(crate) fn uses_hash(options: &Options) -> bool {
    options.get("using").is_some_and(|v| v.is("hash"))
}

fn to_table(fk: &Value) -> Option<String> {
    fk.as_map()?
        .get("to_table")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// English plural for the common shapes of table names.
pub(crate) fn pluralize(word: &str) -> String {
    let consonant_y = word.ends_with('y')
        && !word.ends_with("ay")
        && !word.ends_with("ey")
        && !word.ends_with("oy")
        && !word.ends_with("uy");

    if consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}
