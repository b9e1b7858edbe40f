//! Record access over the store's document tables.
//!
//! Every function runs a single statement against any sqlx executor, so the
//! same call works on the pool or inside a caller's transaction
//! (`&mut *tx`).

use crate::database::Table;
use crate::error::StoreError;
use crate::models::{
    Appointment, CaseFile, CaseStatus, FollowUp, InterviewType, PsychosocialInterview, Record,
    Representative, Student, Teacher,
};
use crate::auth::User;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Executor, Sqlite};
use tracing::{info, instrument};

/// Scalar used to look records up through a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        Key::Bool(value)
    }
}

impl From<NaiveDate> for Key {
    fn from(value: NaiveDate) -> Self {
        Key::Text(value.format("%Y-%m-%d").to_string())
    }
}

type RowQuery<'q> = QueryAs<'q, Sqlite, (i64, String), SqliteArguments<'q>>;

fn bind_key<'q>(query: RowQuery<'q>, key: &Key) -> RowQuery<'q> {
    match key {
        Key::Int(v) => query.bind(*v),
        Key::Text(v) => query.bind(v.clone()),
        Key::Bool(v) => query.bind(*v),
    }
}

static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid regex"));

/// SQL expression for a top-level document field. Field names are spliced
/// into SQL so they must match the index expressions exactly.
fn field_expr(field: &str) -> Result<String, StoreError> {
    if !FIELD_RE.is_match(field) {
        return Err(StoreError::Validation(format!(
            "'{}' is not a valid document field name",
            field
        )));
    }
    Ok(format!("json_extract(data, '$.{}')", field))
}

/// Serializes a record into its stored document, without the `id`.
pub(crate) fn to_document<T: Record>(record: &T) -> Result<String, StoreError> {
    let mut value = serde_json::to_value(record)?;
    match value.as_object_mut() {
        Some(map) => {
            map.remove("id");
        }
        None => {
            return Err(StoreError::Internal(format!(
                "{} record did not serialize to an object",
                T::TABLE
            )));
        }
    }
    Ok(value.to_string())
}

/// Rebuilds a record from its stored document and row id.
pub(crate) fn from_document<T: Record>(id: i64, data: &str) -> Result<T, StoreError> {
    let mut value: Value = serde_json::from_str(data)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("id".to_string(), Value::from(id));
    }
    Ok(serde_json::from_value(value)?)
}

fn from_rows<T: Record>(rows: Vec<(i64, String)>) -> Result<Vec<T>, StoreError> {
    rows.iter()
        .map(|(id, data)| from_document(*id, data))
        .collect()
}

/// Inserts `record` and returns its id. A record that already carries an id
/// is stored under that id.
#[instrument(skip_all)]
pub async fn insert<'e, T, E>(executor: E, record: &T) -> Result<i64, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    record.validate()?;
    let table = T::TABLE.name();
    let data = to_document(record)?;

    let id = match record.id() {
        Some(id) => {
            let sql = format!("INSERT INTO {} (id, data) VALUES (?, ?) RETURNING id", table);
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(id)
                .bind(data)
                .fetch_one(executor)
                .await
        }
        None => {
            let sql = format!("INSERT INTO {} (data) VALUES (?) RETURNING id", table);
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(data)
                .fetch_one(executor)
                .await
        }
    }
    .map_err(|e| StoreError::from_write(table, e))?;

    info!(table, id, "Inserted record");
    Ok(id)
}

/// Inserts or replaces the row under the record's id.
#[instrument(skip_all)]
pub async fn put<'e, T, E>(executor: E, record: &T) -> Result<i64, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    record.validate()?;
    let table = T::TABLE.name();
    let id = record.id().ok_or_else(|| {
        StoreError::Validation(format!("Cannot put a {} record without an id", table))
    })?;
    let data = to_document(record)?;

    let sql = format!(
        "INSERT INTO {} (id, data) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        table
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(data)
        .execute(executor)
        .await
        .map_err(|e| StoreError::from_write(table, e))?;

    info!(table, id, "Stored record");
    Ok(id)
}

/// Replaces an existing record. Fails with `NotFound` when the id is unknown.
#[instrument(skip_all)]
pub async fn update<'e, T, E>(executor: E, record: &T) -> Result<(), StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    record.validate()?;
    let table = T::TABLE.name();
    let id = record.id().ok_or_else(|| {
        StoreError::Validation(format!("Cannot update a {} record without an id", table))
    })?;
    let data = to_document(record)?;

    let sql = format!("UPDATE {} SET data = ? WHERE id = ?", table);
    let result = sqlx::query(&sql)
        .bind(data)
        .bind(id)
        .execute(executor)
        .await
        .map_err(|e| StoreError::from_write(table, e))?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!(
            "No {} record with id {}",
            table, id
        )));
    }

    info!(table, id, "Updated record");
    Ok(())
}

pub async fn get<'e, T, E>(executor: E, id: i64) -> Result<Option<T>, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT id, data FROM {} WHERE id = ?", T::TABLE.name());
    let row = sqlx::query_as::<_, (i64, String)>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(|(id, data)| from_document(id, &data)).transpose()
}

/// Like [`get`], but a missing row is an error.
pub async fn require<'e, T, E>(executor: E, id: i64) -> Result<T, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    get(executor, id).await?.ok_or_else(|| {
        StoreError::NotFound(format!("No {} record with id {}", T::TABLE, id))
    })
}

/// Deletes by id. Returns whether a row was removed.
#[instrument(skip_all)]
pub async fn delete<'e, T, E>(executor: E, id: i64) -> Result<bool, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    let table = T::TABLE.name();
    let sql = format!("DELETE FROM {} WHERE id = ?", table);
    let result = sqlx::query(&sql).bind(id).execute(executor).await?;

    info!(table, id, removed = result.rows_affected(), "Deleted record");
    Ok(result.rows_affected() > 0)
}

/// Deletes every record whose `field` equals `key`.
#[instrument(skip_all)]
pub async fn delete_by<'e, T, E>(executor: E, field: &str, key: Key) -> Result<u64, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    let table = T::TABLE.name();
    let sql = format!("DELETE FROM {} WHERE {} = ?", table, field_expr(field)?);
    let query = sqlx::query(&sql);
    let query = match &key {
        Key::Int(v) => query.bind(*v),
        Key::Text(v) => query.bind(v.clone()),
        Key::Bool(v) => query.bind(*v),
    };
    let result = query.execute(executor).await?;

    info!(table, field, removed = result.rows_affected(), "Deleted records by field");
    Ok(result.rows_affected())
}

pub async fn all<'e, T, E>(executor: E) -> Result<Vec<T>, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT id, data FROM {} ORDER BY id", T::TABLE.name());
    let rows = sqlx::query_as::<_, (i64, String)>(&sql)
        .fetch_all(executor)
        .await?;

    from_rows(rows)
}

/// Every record whose `field` equals `key`, in id order.
pub async fn find_by<'e, T, E>(executor: E, field: &str, key: Key) -> Result<Vec<T>, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT id, data FROM {} WHERE {} = ? ORDER BY id",
        T::TABLE.name(),
        field_expr(field)?
    );
    let rows = bind_key(sqlx::query_as(&sql), &key)
        .fetch_all(executor)
        .await?;

    from_rows(rows)
}

/// First record whose `field` equals `key`.
pub async fn find_one_by<'e, T, E>(executor: E, field: &str, key: Key) -> Result<Option<T>, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT id, data FROM {} WHERE {} = ? ORDER BY id LIMIT 1",
        T::TABLE.name(),
        field_expr(field)?
    );
    let row = bind_key(sqlx::query_as(&sql), &key)
        .fetch_optional(executor)
        .await?;

    row.map(|(id, data)| from_document(id, &data)).transpose()
}

/// Lookup on a compound key of two fields.
pub async fn find_by_pair<'e, T, E>(
    executor: E,
    (first_field, first): (&str, Key),
    (second_field, second): (&str, Key),
) -> Result<Vec<T>, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT id, data FROM {} WHERE {} = ? AND {} = ? ORDER BY id",
        T::TABLE.name(),
        field_expr(first_field)?,
        field_expr(second_field)?
    );
    let query = bind_key(sqlx::query_as(&sql), &first);
    let rows = bind_key(query, &second).fetch_all(executor).await?;

    from_rows(rows)
}

/// Records whose date `field` falls within `from..=to`.
pub async fn range<'e, T, E>(
    executor: E,
    field: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<T>, StoreError>
where
    T: Record,
    E: Executor<'e, Database = Sqlite>,
{
    let expr = field_expr(field)?;
    let sql = format!(
        "SELECT id, data FROM {} WHERE {} BETWEEN ? AND ? ORDER BY {}, id",
        T::TABLE.name(),
        expr,
        expr
    );
    let query = bind_key(sqlx::query_as(&sql), &Key::from(from));
    let rows = bind_key(query, &Key::from(to)).fetch_all(executor).await?;

    from_rows(rows)
}

pub async fn count<'e, E>(executor: E, table: Table) -> Result<i64, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    Ok(sqlx::query_scalar::<_, i64>(&sql)
        .fetch_one(executor)
        .await?)
}

/// Removes every row of `table`. Emptying a table never triggers reseeding.
#[instrument(skip(executor))]
pub async fn clear<'e, E>(executor: E, table: Table) -> Result<u64, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("DELETE FROM {}", table.name());
    let result = sqlx::query(&sql).execute(executor).await?;
    info!(removed = result.rows_affected(), "Cleared table");
    Ok(result.rows_affected())
}

// Lookups the UI relies on.

pub async fn user_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_one_by(executor, "email", Key::from(email)).await
}

pub async fn user_by_cedula<'e, E>(executor: E, cedula: &str) -> Result<Option<User>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_one_by(executor, "cedula", Key::from(cedula)).await
}

pub async fn teacher_by_cedula<'e, E>(executor: E, cedula: &str) -> Result<Option<Teacher>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_one_by(executor, "cedula", Key::from(cedula)).await
}

pub async fn representative_by_cedula<'e, E>(
    executor: E,
    cedula: &str,
) -> Result<Option<Representative>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_one_by(executor, "cedula", Key::from(cedula)).await
}

pub async fn student_by_cedula<'e, E>(executor: E, cedula: &str) -> Result<Option<Student>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_one_by(executor, "cedula", Key::from(cedula)).await
}

pub async fn students_in_course<'e, E>(
    executor: E,
    course: &str,
    parallel: &str,
) -> Result<Vec<Student>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_by_pair(
        executor,
        ("course", Key::from(course)),
        ("parallel", Key::from(parallel)),
    )
    .await
}

pub async fn cases_for_student<'e, E>(executor: E, student_id: i64) -> Result<Vec<CaseFile>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_by(executor, "studentId", Key::from(student_id)).await
}

pub async fn cases_by_category_and_status<'e, E>(
    executor: E,
    category: &str,
    status: CaseStatus,
) -> Result<Vec<CaseFile>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_by_pair(
        executor,
        ("category", Key::from(category)),
        ("status", Key::from(status.as_str())),
    )
    .await
}

pub async fn follow_ups_for_case<'e, E>(executor: E, case_id: i64) -> Result<Vec<FollowUp>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_by(executor, "caseId", Key::from(case_id)).await
}

pub async fn appointments_between<'e, E>(
    executor: E,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Appointment>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    range(executor, "date", from, to).await
}

pub async fn interview_for<'e, E>(
    executor: E,
    case_file_id: i64,
    interview_type: InterviewType,
) -> Result<Option<PsychosocialInterview>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut found = find_by_pair(
        executor,
        ("caseFileId", Key::from(case_file_id)),
        ("interviewType", Key::from(interview_type.as_str())),
    )
    .await?;
    Ok(found.pop())
}
