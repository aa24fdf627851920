//! Statement generation for pdv-sync.
//!
//! Turns a captured [`RowChange`] into a parameterized statement for the
//! remote dialect, and emits the `CREATE TABLE` statements used to
//! bootstrap a new remote target.
//!
//! Everything here is pure: no I/O, and the same input always yields a
//! byte-identical [`Statement`]. Statements always use positional `?`
//! placeholders; the remote connector rewrites them for dialects that
//! number their parameters.

pub mod builder;
pub mod ddl;
pub mod error;

pub use builder::{build_statement, RowChange, Statement};
pub use ddl::{
    create_statements, ColumnDef, ColumnType, MySqlDdl, PostgreSqlDdl, TableDef, ToDdl,
    REMOTE_TABLES,
};
pub use error::BuildError;
