use std::fmt;
use std::str::FromStr;

/// Base type of a column, independent of limit or precision.
///
/// Parses both the names migrations use (`string`, `datetime`) and the names
/// PostgreSQL reports from `format_type` (`character varying`,
/// `timestamp without time zone`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Serial,
    BigSerial,
    Integer,
    BigInt,
    SmallInt,
    String,
    Text,
    Boolean,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Uuid,
    Json,
    JsonB,
    Binary,
    Real,
    DoublePrecision,
    Decimal,
    Other(std::string::String),
}

impl ColumnType {
    /// Types carrying fractional-seconds precision.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ColumnType::Timestamp | ColumnType::TimestampTz | ColumnType::Time
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Serial => "serial",
            ColumnType::BigSerial => "bigserial",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::SmallInt => "smallint",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestamptz",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Uuid => "uuid",
            ColumnType::Json => "json",
            ColumnType::JsonB => "jsonb",
            ColumnType::Binary => "binary",
            ColumnType::Real => "real",
            ColumnType::DoublePrecision => "double precision",
            ColumnType::Decimal => "decimal",
            ColumnType::Other(name) => name,
        }
    }

    /// Primary key types that will not run out of values.
    pub fn is_wide_key(&self) -> bool {
        matches!(
            self,
            ColumnType::BigSerial | ColumnType::BigInt | ColumnType::Uuid
        )
    }
}

impl FromStr for ColumnType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "character varying(255)" and "numeric(10,2)" carry modifiers
        let base = s.split('(').next().unwrap_or(s).trim().to_ascii_lowercase();
        Ok(match base.as_str() {
            "serial" | "serial4" => ColumnType::Serial,
            "bigserial" | "serial8" => ColumnType::BigSerial,
            "integer" | "int" | "int4" => ColumnType::Integer,
            "bigint" | "int8" => ColumnType::BigInt,
            "smallint" | "int2" => ColumnType::SmallInt,
            "string" | "varchar" | "character varying" => ColumnType::String,
            "text" => ColumnType::Text,
            "boolean" | "bool" => ColumnType::Boolean,
            "datetime" | "timestamp" | "timestamp without time zone" => ColumnType::Timestamp,
            "timestamptz" | "timestamp with time zone" => ColumnType::TimestampTz,
            "date" => ColumnType::Date,
            "time" | "time without time zone" => ColumnType::Time,
            "uuid" => ColumnType::Uuid,
            "json" => ColumnType::Json,
            "jsonb" => ColumnType::JsonB,
            "binary" | "bytea" => ColumnType::Binary,
            "real" | "float4" => ColumnType::Real,
            "float" | "double precision" | "float8" => ColumnType::DoublePrecision,
            "decimal" | "numeric" => ColumnType::Decimal,
            _ => ColumnType::Other(base),
        })
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
