pub mod checker;
pub mod collector;
pub mod column_type;
pub mod config;
pub mod error;
pub mod introspect;
pub mod message;
pub mod operation;
pub mod render;
pub mod sql;
pub mod value;
pub mod version;

pub mod prelude {
    pub use crate::checker::{
        Checker, Direction, MigrationInfo, SafeGuard, SafeOverride, Verdict, Violation,
    };
    pub use crate::collector::{Collector, ForeignKeyCollector, HashIndexCollector};
    pub use crate::column_type::ColumnType;
    pub use crate::config::Config;
    pub use crate::error::{CheckError, IntrospectError, UnsafeOperation};
    pub use crate::introspect::{
        ColumnDescriptor, ConstraintDescriptor, InMemorySchema, IndexDescriptor, IndexMethod,
        Introspector, LockMode, SessionLock,
    };
    pub use crate::message::{MessageKey, Messages, Vars};
    pub use crate::operation::{Declaration, Operation, OperationKind, TableBody};
    pub use crate::value::{Options, Value};
    pub use crate::version::{Capability, ServerVersion};

    #[cfg(feature = "postgres")]
    pub use crate::introspect::PostgresIntrospector;
}
