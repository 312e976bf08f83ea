use std::collections::BTreeSet;

use crate::checker::change_column::{is_rewrite_free, RequestedType};
use crate::collector::{pluralize, uses_hash, ForeignKeyCollector, HashIndexCollector};
use crate::column_type::ColumnType;
use crate::error::CheckError;
use crate::introspect::Introspector;
use crate::message::{MessageKey, Vars};
use crate::operation::{Declaration, Operation, OperationKind, TableBody};
use crate::render;
use crate::sql;
use crate::value::{Options, Value};
use crate::version::{Capability, ServerVersion};

/// Outcome of a single rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Safe,
    Unsafe(Violation),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub key: MessageKey,
    pub vars: Vars,
}

impl Violation {
    pub fn new(key: MessageKey, vars: Vars) -> Self {
        Self { key, vars }
    }
}

/// What a rule may look at besides the operation itself.
pub(crate) struct RuleContext<'a> {
    pub introspector: &'a mut dyn Introspector,
    pub version: ServerVersion,
    pub foreign_key_tables: &'a mut BTreeSet<String>,
    pub index_best_practices: bool,
}

fn unsafe_op(key: MessageKey, vars: Vars) -> Result<Verdict, CheckError> {
    Ok(Verdict::Unsafe(Violation::new(key, vars)))
}

fn concurrently() -> Value {
    Value::symbol("concurrently")
}

pub(crate) fn evaluate(op: &Operation, ctx: &mut RuleContext<'_>) -> Result<Verdict, CheckError> {
    match &op.kind {
        OperationKind::CreateTable | OperationKind::CreateJoinTable => create_table(op, ctx),
        OperationKind::RenameTable => {
            let vars = Vars::new()
                .with("table", op.str_arg(0)?)
                .with("new_table", op.str_arg(1)?);
            unsafe_op(MessageKey::RenameTable, vars)
        }
        OperationKind::AddColumn => add_column(op, ctx.version),
        OperationKind::RenameColumn => {
            let vars = Vars::new()
                .with("table", op.str_arg(0)?)
                .with("column", op.str_arg(1)?)
                .with("new_column", op.str_arg(2)?);
            unsafe_op(MessageKey::RenameColumn, vars)
        }
        OperationKind::ChangeColumn => change_column(op, ctx),
        OperationKind::ChangeColumnNull => change_column_null(op, ctx),
        OperationKind::RemoveColumn
        | OperationKind::RemoveColumns
        | OperationKind::RemoveTimestamps
        | OperationKind::RemoveReference
        | OperationKind::RemoveBelongsTo => remove_column(op, ctx),
        OperationKind::AddReference | OperationKind::AddBelongsTo => add_reference(op, ctx),
        OperationKind::AddIndex => add_index(op, ctx),
        OperationKind::RemoveIndex => remove_index(op),
        OperationKind::AddForeignKey => add_foreign_key(op, ctx),
        OperationKind::ValidateForeignKey => {
            validate_without_locks(op, ctx, MessageKey::ValidateForeignKey)
        }
        OperationKind::AddCheckConstraint => add_check_constraint(op),
        OperationKind::ValidateCheckConstraint => {
            validate_without_locks(op, ctx, MessageKey::ValidateCheckConstraint)
        }
        OperationKind::Execute => unsafe_op(MessageKey::Execute, Vars::new()),
        OperationKind::Other(_) => Ok(Verdict::Safe),
    }
}

fn create_table(op: &Operation, ctx: &mut RuleContext<'_>) -> Result<Verdict, CheckError> {
    let table = match op.kind {
        OperationKind::CreateJoinTable => match op.options.get("table_name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => join_table_name(op.str_arg(0)?, op.str_arg(1)?),
        },
        _ => op.str_arg(0)?.to_string(),
    };

    if let Some(body) = &op.body {
        ctx.foreign_key_tables
            .extend(body.collect::<ForeignKeyCollector>().tables);
    }

    if op.options.is_truthy("force") {
        return unsafe_op(MessageKey::CreateTable, Vars::new().with("table", table));
    }

    if let Some(key_type) = op.options.get("id").and_then(Value::as_str) {
        if !parse_type(key_type).is_wide_key() {
            let vars = Vars::new().with("type", key_type).with("table", table);
            return unsafe_op(MessageKey::ShortPrimaryKeyType, vars);
        }
    }

    let hash_index = op
        .body
        .as_ref()
        .is_some_and(|body| body.collect::<HashIndexCollector>().found);
    if hash_index && !ctx.version.supports(Capability::HashIndexWal) {
        let commands = op.body.as_ref().map(btree_index_commands).unwrap_or_default();
        let vars = Vars::new().with("table", table).with("command", commands);
        return unsafe_op(MessageKey::HashIndex, vars);
    }

    Ok(Verdict::Safe)
}

fn btree() -> Value {
    Value::symbol("btree")
}

/// Body declarations that build a hash index, rewritten to use btree.
fn btree_index_commands(body: &TableBody) -> String {
    let commands: Vec<String> = body
        .declarations()
        .iter()
        .filter_map(|declaration| match declaration {
            Declaration::Index { columns, options } if uses_hash(options) => Some(render::command(
                "t.index",
                &[Value::from(columns.clone())],
                &options.merged("using", btree()),
            )),
            Declaration::References { name, options } => {
                let index = options.get("index").and_then(Value::as_map).filter(|m| uses_hash(m))?;
                let options = options.merged("index", index.merged("using", btree()));
                Some(render::command("t.references", &[Value::str(name)], &options))
            }
            Declaration::Column {
                name,
                column_type,
                options,
            } => {
                let index = options.get("index").and_then(Value::as_map).filter(|m| uses_hash(m))?;
                let options = options.merged("index", index.merged("using", btree()));
                let args = [Value::str(name), Value::symbol(column_type.as_str())];
                Some(render::command("t.column", &args, &options))
            }
            _ => None,
        })
        .collect();
    commands.join("\n    ")
}

fn join_table_name(first: &str, second: &str) -> String {
    let (a, b) = if first <= second {
        (first, second)
    } else {
        (second, first)
    };
    format!("{}_{}", a, b)
}

fn add_column(op: &Operation, version: ServerVersion) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;
    let column = op.str_arg(1)?;
    let column_type = op.str_arg(2)?;

    if let Some(default) = op.options.get("default").filter(|v| !v.is_null()) {
        let volatile = default.is_volatile();
        if volatile || !version.supports(Capability::FastColumnDefault) {
            let mut options = op.options.without("default");
            let mut append = String::new();
            if options.get("null").and_then(Value::as_bool) == Some(false) {
                options.remove("null");
                append = "\n\nThen add the NOT NULL constraint in a separate migration.".to_string();
            }

            let change_args = [Value::str(table), Value::str(column), default.clone()];
            let vars = Vars::new()
                .with("table", table)
                .with("column", column)
                .with("add_command", render::command(op.name(), &op.args, &options))
                .with(
                    "change_command",
                    render::command("change_column_default", &change_args, &Options::new()),
                )
                .with("backfill_sql", sql::backfill_sql(table, column, default))
                .with("append", append)
                .with("volatile", volatile.to_string())
                .with("default_kind", if volatile { "volatile" } else { "non-null" })
                .with(
                    "rewrite_blocks",
                    if volatile { "reads and writes" } else { "writes" },
                );
            return unsafe_op(MessageKey::AddColumnDefault, vars);
        }
    }

    if parse_type(column_type) == ColumnType::Json {
        let mut args = op.args.clone();
        args[2] = Value::symbol("jsonb");
        let vars = Vars::new()
            .with("table", table)
            .with("column", column)
            .with("command", render::command(op.name(), &args, &op.options));
        return unsafe_op(MessageKey::AddColumnJson, vars);
    }

    Ok(Verdict::Safe)
}

fn parse_type(name: &str) -> ColumnType {
    name.parse().unwrap_or_else(|never| match never {})
}

fn option_u32(options: &Options, key: &str) -> Option<u32> {
    options
        .get(key)
        .and_then(Value::as_int)
        .and_then(|n| u32::try_from(n).ok())
}

fn change_column(op: &Operation, ctx: &mut RuleContext<'_>) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;
    let column = op.str_arg(1)?;
    let type_name = op.str_arg(2)?;

    let requested = RequestedType {
        column_type: parse_type(type_name),
        limit: option_u32(&op.options, "limit"),
        precision: option_u32(&op.options, "precision"),
        scale: option_u32(&op.options, "scale"),
    };

    let columns = ctx.introspector.columns(table)?;
    let existing = columns.iter().find(|c| c.name == column);

    let vars = Vars::new()
        .with("table", table)
        .with("column", column)
        .with("type", requested.column_type.to_string());

    let Some(existing) = existing else {
        return unsafe_op(MessageKey::ChangeColumn, vars);
    };

    if !is_rewrite_free(existing, &requested, ctx.version, &mut *ctx.introspector)? {
        return unsafe_op(MessageKey::ChangeColumn, vars);
    }

    let sets_not_null = op.options.get("null").and_then(Value::as_bool) == Some(false);
    if sets_not_null && existing.nullable {
        let without_null = op.options.without("null");
        let null_args = [Value::str(table), Value::str(column), Value::Bool(false)];
        let vars = vars
            .with("command", render::command(op.name(), &op.args, &without_null))
            .with(
                "null_command",
                render::command("change_column_null", &null_args, &Options::new()),
            );
        return unsafe_op(MessageKey::ChangeColumnWithNotNull, vars);
    }

    Ok(Verdict::Safe)
}

fn change_column_null(op: &Operation, ctx: &mut RuleContext<'_>) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;
    let column = op.str_arg(1)?;
    let null = op
        .arg_at(2)
        .and_then(Value::as_bool)
        .ok_or_else(|| CheckError::invalid(op.name(), "argument 2 must be a boolean"))?;

    if null {
        return Ok(Verdict::Safe);
    }

    let promotion = ctx.version.supports(Capability::NotNullConstraintPromotion);
    if promotion {
        let definitions = sql::not_null_check_definitions(column);
        let constrained = ctx
            .introspector
            .check_constraints(table)?
            .iter()
            .any(|c| c.validated && definitions.contains(&c.definition));
        if constrained {
            return Ok(Verdict::Safe);
        }
    }

    let constraint = format!("{}_{}_null", table, column);
    let execute = |statement: String| render::command("execute", &[Value::Str(statement)], &Options::new());

    let backfill_code = match op.arg_at(3).filter(|v| !v.is_null()) {
        Some(default) => execute(sql::backfill_nulls_sql(table, column, default)),
        None => String::new(),
    };

    let mut validate_steps = Vec::new();
    if !backfill_code.is_empty() {
        validate_steps.push(backfill_code.clone());
    }
    validate_steps.push(execute(sql::validate_constraint_sql(table, &constraint)));
    if promotion {
        let set_not_null = [Value::str(table), Value::str(column), Value::Bool(false)];
        validate_steps.push(render::command("change_column_null", &set_not_null, &Options::new()));
        validate_steps.push(execute(sql::drop_constraint_sql(table, &constraint)));
    }

    let vars = Vars::new()
        .with("table", table)
        .with("column", column)
        .with("constraint_name", constraint.as_str())
        .with(
            "add_constraint_code",
            execute(sql::add_not_null_check_sql(table, &constraint, column)),
        )
        .with("validate_constraint_code", validate_steps.join("\n    "))
        .with("backfill_code", backfill_code)
        .with("promotion", promotion.to_string());
    unsafe_op(MessageKey::ChangeColumnNull, vars)
}

fn remove_column(op: &Operation, ctx: &mut RuleContext<'_>) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;
    let columns = op.removed_columns();
    if columns.is_empty() {
        return Err(CheckError::invalid(op.name(), "no columns to remove"));
    }

    let index_commands: Vec<String> = ctx
        .introspector
        .indexes(table)?
        .iter()
        .filter(|index| columns.iter().any(|c| index.covers(c)))
        .map(|index| {
            let options = Options::new()
                .with("name", index.name.as_str())
                .with("algorithm", concurrently());
            render::command("remove_index", &[Value::str(table)], &options)
        })
        .collect();

    let index_commands = if index_commands.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nRemove the indexes on {} concurrently first:\n\n    {}",
            if columns.len() > 1 { "them" } else { "it" },
            index_commands.join("\n    ")
        )
    };

    let vars = Vars::new()
        .with("table", table)
        .with(
            "columns",
            columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", "),
        )
        .with("column_suffix", if columns.len() > 1 { "s" } else { "" })
        .with("command", op.describe())
        .with("index_commands", index_commands);
    unsafe_op(MessageKey::RemoveColumn, vars)
}

fn add_reference(op: &Operation, ctx: &mut RuleContext<'_>) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;
    let reference = op.str_arg(1)?;

    let index = op.options.get("index").cloned().unwrap_or(Value::Bool(true));
    let index_options = index.as_map();

    if let Some(hashed) = index_options.filter(|m| uses_hash(m)) {
        if !ctx.version.supports(Capability::HashIndexWal) {
            let index = hashed
                .merged("using", btree())
                .merged("algorithm", concurrently());
            let options = op.options.merged("index", index);
            let vars = Vars::new()
                .with("table", table)
                .with("command", render::command(op.name(), &op.args, &options));
            return unsafe_op(MessageKey::HashIndex, vars);
        }
    }

    let concurrent = index_options
        .and_then(|m| m.get("algorithm"))
        .is_some_and(|v| v.is("concurrently"));
    let blocking_index = index.is_truthy() && !concurrent;

    let foreign_key = op.options.get("foreign_key").filter(|v| v.is_truthy());
    if let Some(fk) = foreign_key {
        let to_table = fk
            .as_map()
            .and_then(|m| m.get("to_table"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| pluralize(reference));
        ctx.foreign_key_tables.insert(to_table);
    }
    let validated_fk = foreign_key.is_some_and(|fk| {
        fk.as_map()
            .and_then(|m| m.get("validate"))
            .and_then(Value::as_bool)
            != Some(false)
    });

    if !blocking_index && !validated_fk {
        return Ok(Verdict::Safe);
    }

    let mut options = op.options.clone();
    if index.is_truthy() {
        let index = match index_options {
            Some(map) => map.merged("algorithm", concurrently()),
            None => Options::new().with("algorithm", concurrently()),
        };
        options.insert("index", index);
    }

    let (headline, append) = if validated_fk {
        options.remove("foreign_key");
        (
            "Adding a foreign key blocks writes on both tables.",
            "\n\nThen add the foreign key in separate migrations, without validating existing rows first.",
        )
    } else {
        ("Adding an index non-concurrently blocks writes.", "")
    };

    let vars = Vars::new()
        .with("table", table)
        .with("headline", headline)
        .with("command", render::command(op.name(), &op.args, &options))
        .with("append", append);
    unsafe_op(MessageKey::AddReference, vars)
}

fn add_index(op: &Operation, ctx: &RuleContext<'_>) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;
    let columns = op
        .arg_at(1)
        .map(Value::names)
        .filter(|names| !names.is_empty())
        .ok_or_else(|| CheckError::invalid(op.name(), "argument 1 must name the columns"))?;

    if uses_hash(&op.options) && !ctx.version.supports(Capability::HashIndexWal) {
        let options = op
            .options
            .merged("using", btree())
            .merged("algorithm", concurrently());
        let vars = Vars::new()
            .with("table", table)
            .with("command", render::command(op.name(), &op.args, &options));
        return unsafe_op(MessageKey::HashIndex, vars);
    }

    if ctx.index_best_practices && columns.len() > 3 && !op.options.is_truthy("unique") {
        let vars = Vars::new()
            .with("table", table)
            .with("columns", columns.join(", "));
        return unsafe_op(MessageKey::AddIndexColumns, vars);
    }

    if !op.is_concurrent() {
        let options = op.options.merged("algorithm", concurrently());
        let vars = Vars::new()
            .with("table", table)
            .with("command", render::command(op.name(), &op.args, &options));
        return unsafe_op(MessageKey::AddIndex, vars);
    }

    Ok(Verdict::Safe)
}

fn remove_index(op: &Operation) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;
    let options = op.remove_index_options();

    let concurrent = options
        .get("algorithm")
        .is_some_and(|v| v.is("concurrently"));
    if concurrent {
        return Ok(Verdict::Safe);
    }

    let options = options.merged("algorithm", concurrently());
    let vars = Vars::new()
        .with("table", table)
        .with("command", render::command(op.name(), &[Value::str(table)], &options));
    unsafe_op(MessageKey::RemoveIndex, vars)
}

fn add_foreign_key(op: &Operation, ctx: &mut RuleContext<'_>) -> Result<Verdict, CheckError> {
    let from_table = op.str_arg(0)?;
    let to_table = op.str_arg(1)?;
    ctx.foreign_key_tables.insert(to_table.to_string());

    if op.defers_validation() {
        return Ok(Verdict::Safe);
    }

    let validate_args = [Value::str(from_table), Value::str(to_table)];
    let vars = Vars::new()
        .with("table", from_table)
        .with(
            "add_foreign_key_code",
            render::command(op.name(), &op.args, &op.options.merged("validate", false)),
        )
        .with(
            "validate_foreign_key_code",
            render::command("validate_foreign_key", &validate_args, &Options::new()),
        );
    unsafe_op(MessageKey::AddForeignKey, vars)
}

fn add_check_constraint(op: &Operation) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;
    let expression = op.str_arg(1)?;

    if op.defers_validation() {
        return Ok(Verdict::Safe);
    }

    let name = match op.options.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => render::check_constraint_name(table, expression),
    };
    let options = op
        .options
        .merged("name", name.as_str())
        .merged("validate", false);
    let validate_options = Options::new().with("name", name.as_str());

    let vars = Vars::new()
        .with("table", table)
        .with(
            "add_check_constraint_code",
            render::command(op.name(), &op.args, &options),
        )
        .with(
            "validate_check_constraint_code",
            render::command(
                "validate_check_constraint",
                &[Value::str(table)],
                &validate_options,
            ),
        );
    unsafe_op(MessageKey::AddCheckConstraint, vars)
}

fn validate_without_locks(
    op: &Operation,
    ctx: &mut RuleContext<'_>,
    key: MessageKey,
) -> Result<Verdict, CheckError> {
    let table = op.str_arg(0)?;

    let locked: Vec<String> = ctx
        .introspector
        .session_locks()?
        .iter()
        .filter(|lock| lock.mode.is_blocking())
        .map(|lock| format!("{} ({})", lock.relation, lock.mode))
        .collect();

    if locked.is_empty() {
        return Ok(Verdict::Safe);
    }

    let vars = Vars::new()
        .with("table", table)
        .with("locked_relations", locked.join(", "));
    unsafe_op(key, vars)
}
