//! DML generation for captured changes.

use sync_core::{ColumnValue, Dialect, QueueEntry, RowSnapshot, SyncOperation};

use crate::error::BuildError;

const ID_COLUMN: &str = "id";

/// One captured change, decoded and ready to build.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub table: String,
    pub operation: SyncOperation,
    /// Authoritative key for the `WHERE id = ?` clause
    pub record_id: i64,
    pub payload: RowSnapshot,
}

impl RowChange {
    /// Decode a queue entry's payload.
    pub fn from_entry(entry: &QueueEntry) -> Result<Self, BuildError> {
        Ok(Self {
            table: entry.table.clone(),
            operation: entry.operation,
            record_id: entry.record_id,
            payload: entry.snapshot()?,
        })
    }
}

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<ColumnValue>,
}

/// Build the remote statement replaying `change` under `dialect`.
///
/// - Insert becomes an upsert keyed on `id`.
/// - Update sets every non-id payload column.
/// - Delete is a soft delete (`active = 0`) and is identical for both dialects.
pub fn build_statement(dialect: Dialect, change: &RowChange) -> Result<Statement, BuildError> {
    validate_identifier(&change.table)?;

    match change.operation {
        SyncOperation::Insert => build_upsert(dialect, change),
        SyncOperation::Update => build_update(change),
        SyncOperation::Delete => Ok(build_soft_delete(change)),
    }
}

fn build_upsert(dialect: Dialect, change: &RowChange) -> Result<Statement, BuildError> {
    validate_columns(change)?;
    check_payload_id(change)?;

    let mut columns = vec![ID_COLUMN];
    let mut params = vec![ColumnValue::Integer(change.record_id)];
    for (column, value) in change.payload.iter().filter(|(c, _)| *c != ID_COLUMN) {
        columns.push(column.as_str());
        params.push(value.clone());
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        change.table,
        columns.join(", "),
        placeholders
    );

    let updated = &columns[1..];
    match dialect {
        Dialect::MySql if updated.is_empty() => {
            sql.push_str(" ON DUPLICATE KEY UPDATE id = id");
        }
        Dialect::MySql => {
            let assignments: Vec<String> =
                updated.iter().map(|c| format!("{c} = VALUES({c})")).collect();
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&assignments.join(", "));
        }
        Dialect::PostgreSql if updated.is_empty() => {
            sql.push_str(" ON CONFLICT (id) DO NOTHING");
        }
        Dialect::PostgreSql => {
            let assignments: Vec<String> =
                updated.iter().map(|c| format!("{c} = EXCLUDED.{c}")).collect();
            sql.push_str(" ON CONFLICT (id) DO UPDATE SET ");
            sql.push_str(&assignments.join(", "));
        }
    }

    Ok(Statement { sql, params })
}

fn build_update(change: &RowChange) -> Result<Statement, BuildError> {
    validate_columns(change)?;
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for (column, value) in change.payload.iter().filter(|(c, _)| *c != ID_COLUMN) {
        assignments.push(format!("{column} = ?"));
        params.push(value.clone());
    }

    if assignments.is_empty() {
        return Err(BuildError::EmptyUpdate {
            table: change.table.clone(),
            record_id: change.record_id,
        });
    }

    params.push(ColumnValue::Integer(change.record_id));
    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE id = ?",
            change.table,
            assignments.join(", ")
        ),
        params,
    })
}

fn build_soft_delete(change: &RowChange) -> Statement {
    Statement {
        sql: format!("UPDATE {} SET active = 0 WHERE id = ?", change.table),
        params: vec![ColumnValue::Integer(change.record_id)],
    }
}

/// A payload `id` must be absent, NULL, or equal to the record id.
fn check_payload_id(change: &RowChange) -> Result<(), BuildError> {
    match change.payload.get(ID_COLUMN) {
        None | Some(ColumnValue::Null) => Ok(()),
        Some(value) if value.as_i64() == Some(change.record_id) => Ok(()),
        Some(value) => Err(BuildError::IdMismatch {
            record_id: change.record_id,
            payload_id: value.to_string(),
        }),
    }
}

/// Only statements that name payload columns need them to be valid.
fn validate_columns(change: &RowChange) -> Result<(), BuildError> {
    change
        .payload
        .keys()
        .try_for_each(|column| validate_identifier(column))
}

fn validate_identifier(name: &str) -> Result<(), BuildError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(BuildError::InvalidIdentifier(name.to_string()))
    }
}
