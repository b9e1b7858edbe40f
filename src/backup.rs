//! Whole-store export and wipe-and-reload restore.
//!
//! A backup document maps each table name to an array of rows. Document-table
//! rows are the stored JSON with their `id` merged back in; `app_settings`
//! rows are `{"key": .., "value": ..}`.

use crate::auth::User;
use crate::database::Table;
use crate::error::StoreError;
use crate::models::{
    Appointment, AssistedClass, CaseCategory, CaseFile, Course, DeceFollowUpForm, FollowUp,
    Institution, PefEvaluation, PefModule, PregnancyCase, PreventiveActivity,
    PsychosocialInterview, Record, Representative, SexualViolenceCaseDetails,
    SexualViolenceVictim, Student, Teacher,
};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackupDocument {
    tables: BTreeMap<Table, Vec<Value>>,
}

impl BackupDocument {
    /// Parses and validates a backup. Nothing about the store is touched, so
    /// a rejected document leaves it exactly as it was.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| StoreError::MalformedBackup(format!("Not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let Value::Object(map) = value else {
            return Err(StoreError::MalformedBackup(
                "Top level must be an object of table name to rows".to_string(),
            ));
        };

        let mut tables = BTreeMap::new();
        for (name, rows) in map {
            let table = Table::from_name(&name)
                .ok_or_else(|| StoreError::MalformedBackup(format!("Unknown table '{}'", name)))?;
            let Value::Array(rows) = rows else {
                return Err(StoreError::MalformedBackup(format!(
                    "Rows for '{}' must be an array",
                    name
                )));
            };
            for (index, row) in rows.iter().enumerate() {
                validate_row(table, row).map_err(|reason| {
                    StoreError::MalformedBackup(format!("{}[{}]: {}", name, index, reason))
                })?;
            }
            tables.insert(table, rows);
        }

        if tables.is_empty() {
            return Err(StoreError::MalformedBackup(
                "Document contains no known tables".to_string(),
            ));
        }

        Ok(Self { tables })
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .tables
            .iter()
            .map(|(table, rows)| (table.name().to_string(), Value::Array(rows.clone())))
            .collect();
        Value::Object(map)
    }

    pub fn to_json_pretty(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    /// Rows for `table`; empty when the document does not mention it.
    pub fn rows(&self, table: Table) -> &[Value] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, table: Table) -> bool {
        self.tables.contains_key(&table)
    }

    pub fn tables(&self) -> impl Iterator<Item = Table> + '_ {
        self.tables.keys().copied()
    }
}

/// The row must deserialize into `T` and pass the same validation a write
/// through [`crate::db`] would.
fn check<T: Record>(row: &Value) -> Result<(), String> {
    let record = serde_json::from_value::<T>(row.clone()).map_err(|e| e.to_string())?;
    record.validate().map_err(|e| e.to_string())
}

fn validate_row(table: Table, row: &Value) -> Result<(), String> {
    let Some(object) = row.as_object() else {
        return Err("row is not an object".to_string());
    };

    if !table.is_document_table() {
        if !object.get("key").is_some_and(Value::is_string) {
            return Err("setting row needs a string 'key'".to_string());
        }
        if !object.contains_key("value") {
            return Err("setting row needs a 'value'".to_string());
        }
        return Ok(());
    }

    if !object.get("id").is_some_and(|id| id.as_i64().is_some()) {
        return Err("row needs an integer 'id'".to_string());
    }

    match table {
        Table::CaseCategories => check::<CaseCategory>(row),
        Table::Institution => check::<Institution>(row),
        Table::Users => check::<User>(row),
        Table::Courses => check::<Course>(row),
        Table::Teachers => check::<Teacher>(row),
        Table::Representatives => check::<Representative>(row),
        Table::Students => check::<Student>(row),
        Table::CaseFiles => check::<CaseFile>(row),
        Table::FollowUps => check::<FollowUp>(row),
        Table::SexualViolenceCases => check::<SexualViolenceCaseDetails>(row),
        Table::SexualViolenceVictims => check::<SexualViolenceVictim>(row),
        Table::DeceFollowUpForms => check::<DeceFollowUpForm>(row),
        Table::PsychosocialInterviews => check::<PsychosocialInterview>(row),
        Table::PregnancyCases => check::<PregnancyCase>(row),
        Table::AssistedClasses => check::<AssistedClass>(row),
        Table::Appointments => check::<Appointment>(row),
        Table::PreventiveActivities => check::<PreventiveActivity>(row),
        Table::PefModules => check::<PefModule>(row),
        Table::PefEvaluations => check::<PefEvaluation>(row),
        Table::AppSettings => Ok(()),
    }
}

/// Reads every table inside one transaction so the snapshot is consistent.
#[instrument(skip_all)]
pub async fn export(pool: &SqlitePool) -> Result<BackupDocument, StoreError> {
    let mut tx = pool.begin().await?;
    let mut tables = BTreeMap::new();

    for table in Table::ALL {
        let rows = if table.is_document_table() {
            let sql = format!("SELECT id, data FROM {} ORDER BY id", table.name());
            let rows = sqlx::query_as::<_, (i64, String)>(&sql)
                .fetch_all(&mut *tx)
                .await?;
            rows.into_iter()
                .map(|(id, data)| -> Result<Value, StoreError> {
                    let mut value: Value = serde_json::from_str(&data)?;
                    if let Some(map) = value.as_object_mut() {
                        map.insert("id".to_string(), Value::from(id));
                    }
                    Ok(value)
                })
                .collect::<Result<Vec<_>, StoreError>>()?
        } else {
            let rows = sqlx::query_as::<_, (String, String)>(
                "SELECT key, value FROM app_settings ORDER BY key",
            )
            .fetch_all(&mut *tx)
            .await?;
            rows.into_iter()
                .map(|(key, value)| -> Result<Value, StoreError> {
                    let value: Value = serde_json::from_str(&value)?;
                    Ok(serde_json::json!({ "key": key, "value": value }))
                })
                .collect::<Result<Vec<_>, StoreError>>()?
        };
        tables.insert(table, rows);
    }

    tx.commit().await?;
    info!(tables = tables.len(), "Exported store");
    Ok(BackupDocument { tables })
}

pub fn backup_file_name(date: NaiveDate) -> String {
    format!("dece-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Exports the store into `dir` and returns the written path.
#[instrument(skip(pool))]
pub async fn write_backup(
    pool: &SqlitePool,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, StoreError> {
    let document = export(pool).await?;
    let path = dir.join(backup_file_name(date));
    tokio::fs::write(&path, document.to_json_pretty()?).await?;

    info!(path = %path.display(), "Wrote backup");
    Ok(path)
}

async fn reload(
    conn: &mut SqliteConnection,
    document: &BackupDocument,
) -> Result<BTreeMap<Table, usize>, StoreError> {
    for table in Table::ALL.iter().rev() {
        sqlx::query(&format!("DELETE FROM {}", table.name()))
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query("DELETE FROM sqlite_sequence")
        .execute(&mut *conn)
        .await?;

    let mut counts = BTreeMap::new();
    for table in Table::ALL {
        let rows = document.rows(table);
        for row in rows {
            insert_raw(&mut *conn, table, row).await?;
        }
        counts.insert(table, rows.len());
    }
    Ok(counts)
}

async fn insert_raw(
    conn: &mut SqliteConnection,
    table: Table,
    row: &Value,
) -> Result<(), StoreError> {
    let mut object = row.as_object().cloned().unwrap_or_default();

    if table.is_document_table() {
        let id = object
            .remove("id")
            .and_then(|id| id.as_i64())
            .ok_or_else(|| StoreError::MalformedBackup(format!("{} row without id", table)))?;
        let sql = format!("INSERT INTO {} (id, data) VALUES (?, ?)", table.name());
        sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(object).to_string())
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::from_write(table.name(), e))?;
    } else {
        let key = object
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::MalformedBackup("setting row without key".to_string()))?
            .to_string();
        let value = object.remove("value").unwrap_or(Value::Null);
        sqlx::query("INSERT INTO app_settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value.to_string())
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::from_write(table.name(), e))?;
    }
    Ok(())
}

/// Replaces the whole store with `document`, keeping every row's id.
///
/// Tables the document does not mention end up empty, but a document with no
/// tables at all is refused before anything is cleared. Any failure rolls the
/// whole restore back and is reported as [`StoreError::RestoreAborted`].
#[instrument(
    skip_all,
    fields(
        tables = document.tables.len(),
        error = tracing::field::Empty,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
    )
)]
pub async fn restore(
    pool: &SqlitePool,
    document: &BackupDocument,
) -> Result<BTreeMap<Table, usize>, StoreError> {
    if document.tables.is_empty() {
        let err = StoreError::MalformedBackup("Document contains no known tables".to_string());
        err.log_and_record("restore");
        return Err(err);
    }

    let mut tx = pool.begin().await?;

    match reload(&mut tx, document).await {
        Ok(counts) => {
            tx.commit()
                .await
                .map_err(|e| StoreError::RestoreAborted(Box::new(e.into())))?;
            let rows: usize = counts.values().sum();
            info!(rows, "Restored store from backup");
            Ok(counts)
        }
        Err(err) => {
            tx.rollback().await?;
            err.log_and_record("restore");
            Err(StoreError::RestoreAborted(Box::new(err)))
        }
    }
}

#[instrument(skip(pool))]
pub async fn restore_from_path(
    pool: &SqlitePool,
    path: &Path,
) -> Result<BTreeMap<Table, usize>, StoreError> {
    let json = tokio::fs::read_to_string(path).await?;
    let document = BackupDocument::from_json(&json)?;
    restore(pool, &document).await
}
