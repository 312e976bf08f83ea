use crate::column_type::ColumnType;
use crate::error::CheckError;
use crate::introspect::{ColumnDescriptor, Introspector};
use crate::version::{Capability, ServerVersion};

/// Fractional-seconds precision PostgreSQL uses when none is declared.
const DEFAULT_TIME_PRECISION: u32 = 6;

/// Type, limit, precision and scale a `change_column` asks for.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RequestedType {
    pub column_type: ColumnType,
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

/// Whether changing `existing` to `requested` avoids a table rewrite.
///
/// The session time zone is only queried for the timestamp case.
pub(crate) fn is_rewrite_free(
    existing: &ColumnDescriptor,
    requested: &RequestedType,
    version: ServerVersion,
    introspector: &mut dyn Introspector,
) -> Result<bool, CheckError> {
    use ColumnType::*;

    let safe = match (&existing.column_type, &requested.column_type) {
        (String, String) => match requested.limit {
            None => true,
            Some(limit) => existing.limit.is_some_and(|current| limit >= current),
        },
        (Text, String) => requested.limit.is_none(),
        (String | Text, Text) => true,
        (Decimal, Decimal) => {
            let unconstrained = requested.precision.is_none() && requested.scale.is_none();
            let widened = match (requested.precision, existing.precision) {
                (Some(new), Some(current)) => new >= current && requested.scale == existing.scale,
                _ => false,
            };
            unconstrained || widened
        }
        (Timestamp, TimestampTz) => {
            version.supports(Capability::TimestampTzRewriteFree)
                && is_utc(&introspector.time_zone()?)
        }
        _ => {
            existing.column_type == requested.column_type
                && existing.limit == requested.limit
                && effective_precision(&existing.column_type, existing.precision)
                    == effective_precision(&requested.column_type, requested.precision)
                && existing.scale == requested.scale
        }
    };

    Ok(safe)
}

fn effective_precision(column_type: &ColumnType, precision: Option<u32>) -> Option<u32> {
    if column_type.is_temporal() {
        precision.or(Some(DEFAULT_TIME_PRECISION))
    } else {
        precision
    }
}

fn is_utc(time_zone: &str) -> bool {
    ["UTC", "Etc/UTC"]
        .iter()
        .any(|utc| time_zone.eq_ignore_ascii_case(utc))
}
