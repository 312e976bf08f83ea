use postgres::{Client, GenericClient};

use crate::column_type::ColumnType;
use crate::error::IntrospectError;
use crate::introspect::{
    ColumnDescriptor, ConstraintDescriptor, IndexDescriptor, IndexMethod, Introspector, LockMode,
    SessionLock,
};

const COLUMNS_SQL: &str = "SELECT column_name::text, data_type::text,
        character_maximum_length::int4, numeric_precision::int4, numeric_scale::int4,
        is_nullable::text = 'YES', datetime_precision::int4
    FROM information_schema.columns
    WHERE table_schema = current_schema() AND table_name = $1
    ORDER BY ordinal_position";

const INDEXES_SQL: &str = "SELECT i.relname::text, am.amname::text,
        ARRAY(
            SELECT a.attname::text
            FROM unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            ORDER BY k.ord
        )
    FROM pg_index ix
    JOIN pg_class t ON t.oid = ix.indrelid
    JOIN pg_class i ON i.oid = ix.indexrelid
    JOIN pg_am am ON am.oid = i.relam
    WHERE t.relname = $1 AND t.relnamespace = current_schema()::regnamespace
    ORDER BY i.relname";

const CHECK_CONSTRAINTS_SQL: &str = "SELECT c.conname::text, pg_get_constraintdef(c.oid), c.convalidated
    FROM pg_constraint c
    JOIN pg_class t ON t.oid = c.conrelid
    WHERE c.contype = 'c' AND t.relname = $1
        AND t.relnamespace = current_schema()::regnamespace
    ORDER BY c.conname";

const SESSION_LOCKS_SQL: &str = "SELECT c.relname::text, l.mode
    FROM pg_locks l
    JOIN pg_class c ON c.oid = l.relation
    WHERE l.pid = pg_backend_pid() AND l.locktype = 'relation' AND l.granted";

/// Introspection over a synchronous `postgres` client or an open
/// transaction, so locks the migration already holds are visible.
pub struct PostgresIntrospector<'a, C: GenericClient = Client> {
    client: &'a mut C,
}

impl<'a, C: GenericClient> PostgresIntrospector<'a, C> {
    pub fn new(client: &'a mut C) -> Self {
        Self { client }
    }

    fn show(&mut self, setting: &str) -> Result<String, IntrospectError> {
        let row = self.client.query_one(format!("SHOW {}", setting).as_str(), &[])?;
        Ok(row.get(0))
    }
}

impl<C: GenericClient> Introspector for PostgresIntrospector<'_, C> {
    fn server_version_num(&mut self) -> Result<u32, IntrospectError> {
        let raw = self.show("server_version_num")?;
        raw.trim()
            .parse()
            .map_err(|_| IntrospectError::Query(format!("unexpected server_version_num: {}", raw)))
    }

    fn time_zone(&mut self) -> Result<String, IntrospectError> {
        self.show("timezone")
    }

    fn columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>, IntrospectError> {
        let rows = self.client.query(COLUMNS_SQL, &[&table])?;

        Ok(rows
            .iter()
            .map(|row| {
                let data_type: String = row.get(1);
                let column_type: ColumnType =
                    data_type.parse().unwrap_or_else(|never| match never {});
                let to_u32 = |v: Option<i32>| v.and_then(|n| u32::try_from(n).ok());
                // integer columns report a binary precision too; only numeric has a declared one
                let (precision, scale) = if column_type == ColumnType::Decimal {
                    (to_u32(row.get(3)), to_u32(row.get(4)))
                } else if column_type.is_temporal() {
                    (to_u32(row.get(6)), None)
                } else {
                    (None, None)
                };

                ColumnDescriptor {
                    name: row.get(0),
                    column_type,
                    limit: to_u32(row.get(2)),
                    precision,
                    scale,
                    nullable: row.get(5),
                }
            })
            .collect())
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<IndexDescriptor>, IntrospectError> {
        let rows = self.client.query(INDEXES_SQL, &[&table])?;

        Ok(rows
            .iter()
            .map(|row| {
                let method: String = row.get(1);
                IndexDescriptor {
                    name: row.get(0),
                    columns: row.get(2),
                    method: IndexMethod::from_name(&method),
                }
            })
            .collect())
    }

    fn check_constraints(
        &mut self,
        table: &str,
    ) -> Result<Vec<ConstraintDescriptor>, IntrospectError> {
        let rows = self.client.query(CHECK_CONSTRAINTS_SQL, &[&table])?;

        Ok(rows
            .iter()
            .map(|row| ConstraintDescriptor {
                name: row.get(0),
                definition: row.get(1),
                validated: row.get(2),
            })
            .collect())
    }

    fn session_locks(&mut self) -> Result<Vec<SessionLock>, IntrospectError> {
        let rows = self.client.query(SESSION_LOCKS_SQL, &[])?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let mode: String = row.get(1);
                LockMode::from_name(&mode).map(|mode| SessionLock::new(row.get::<_, String>(0), mode))
            })
            .collect())
    }
}
