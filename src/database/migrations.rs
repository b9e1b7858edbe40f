use crate::error::StoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

#[derive(Debug)]
pub struct TableInfo {
    pub sql: String,
}

#[derive(Debug)]
pub struct IndexInfo {
    pub sql: String,
}

#[derive(Debug)]
pub struct ColumnInfo {
    pub name: String,
}

#[derive(Debug, Default)]
pub struct ModifiedTable {
    pub name: String,
    pub removed_columns: Vec<String>,
}

/// Difference between the live store and the declared schema.
#[derive(Default, Debug)]
pub struct SchemaChanges {
    pub current_version: i64,
    pub target_version: i64,
    pub new_tables: Vec<String>,
    pub removed_tables: Vec<String>,
    pub modified_tables: Vec<ModifiedTable>,
    pub new_indices: Vec<String>,
    pub removed_indices: Vec<String>,
    pub modified_indices: Vec<String>,
}

impl SchemaChanges {
    pub fn has_any_changes(&self) -> bool {
        !self.new_tables.is_empty()
            || !self.removed_tables.is_empty()
            || !self.modified_tables.is_empty()
            || !self.new_indices.is_empty()
            || !self.removed_indices.is_empty()
            || !self.modified_indices.is_empty()
            || self.current_version != self.target_version
    }

    pub fn is_destructive(&self) -> bool {
        !self.removed_tables.is_empty()
            || !self.removed_indices.is_empty()
            || self
                .modified_tables
                .iter()
                .any(|t| !t.removed_columns.is_empty())
    }
}

/// Result of bringing a store up to the declared schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// The store had no tables and `user_version = 0` before migrating.
    pub was_created: bool,
    pub schema_changes_made: u32,
}

pub struct DeclarativeMigrator {
    target_schema: String,
    target_version: i64,
    allow_deletions: bool,
    schema_changes_made: u32,
}

impl DeclarativeMigrator {
    pub fn new(target_schema: &str, target_version: i64, allow_deletions: bool) -> Self {
        Self {
            target_schema: target_schema.to_string(),
            target_version,
            allow_deletions,
            schema_changes_made: 0,
        }
    }

    async fn pristine_pool(&self) -> Result<SqlitePool, StoreError> {
        // A single connection, otherwise each pooled connection would get its
        // own empty in-memory database.
        let pristine_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        if !self.target_schema.trim().is_empty() {
            sqlx::raw_sql(&self.target_schema)
                .execute(&pristine_pool)
                .await
                .map_err(|e| StoreError::Internal(format!("Failed to create pristine schema: {}", e)))?;
        }

        Ok(pristine_pool)
    }

    /// Reports what `migrate` would do without touching the store.
    #[instrument(skip_all)]
    pub async fn plan(&self, conn: &mut SqliteConnection) -> Result<SchemaChanges, StoreError> {
        let pristine_pool = self.pristine_pool().await?;
        let changes = self.analyze_changes(conn, &pristine_pool).await;
        pristine_pool.close().await;
        changes
    }

    /// Applies the declared schema on `conn`. The caller owns the surrounding
    /// transaction, so a failure here leaves nothing behind once it rolls back.
    #[instrument(skip_all, fields(target_version = self.target_version))]
    pub async fn migrate(
        &mut self,
        conn: &mut SqliteConnection,
    ) -> Result<MigrationOutcome, StoreError> {
        info!("Starting declarative store migration");

        let current_version = user_version(&mut *conn).await?;
        if current_version > self.target_version {
            return Err(StoreError::SchemaVersionMismatch {
                found: current_version,
                expected: self.target_version,
            });
        }

        let was_created =
            current_version == 0 && get_tables(&mut *conn).await?.is_empty();

        let pristine_pool = self.pristine_pool().await?;
        let result = self.migrate_against(conn, &pristine_pool).await;
        pristine_pool.close().await;
        result?;

        info!(
            was_created,
            schema_changes = self.schema_changes_made,
            "Store migration finished"
        );

        Ok(MigrationOutcome {
            was_created,
            schema_changes_made: self.schema_changes_made,
        })
    }

    async fn migrate_against(
        &mut self,
        conn: &mut SqliteConnection,
        pristine_pool: &SqlitePool,
    ) -> Result<(), StoreError> {
        let changes = self.analyze_changes(&mut *conn, pristine_pool).await?;

        if !changes.has_any_changes() {
            info!("No schema changes needed");
            return Ok(());
        }

        if changes.is_destructive() && !self.allow_deletions {
            return Err(StoreError::Internal(format!(
                "Migration would remove tables {:?}, indices {:?} or columns {:?}; refusing without allow_deletions",
                changes.removed_tables,
                changes.removed_indices,
                changes
                    .modified_tables
                    .iter()
                    .filter(|t| !t.removed_columns.is_empty())
                    .map(|t| (&t.name, &t.removed_columns))
                    .collect::<Vec<_>>()
            )));
        }

        self.apply_changes(conn, pristine_pool, changes).await
    }

    #[instrument(skip_all)]
    async fn apply_changes(
        &mut self,
        conn: &mut SqliteConnection,
        pristine_pool: &SqlitePool,
        changes: SchemaChanges,
    ) -> Result<(), StoreError> {
        let target_tables = get_tables(pristine_pool).await?;

        for table_name in &changes.new_tables {
            if let Some(table_info) = target_tables.get(table_name) {
                self.execute_schema_change(
                    &format!("Create new table {}", table_name),
                    &table_info.sql,
                    &mut *conn,
                )
                .await?;
            }
        }

        for table in &changes.modified_tables {
            if let Some(target_table) = target_tables.get(&table.name) {
                self.migrate_table(conn, &table.name, target_table, pristine_pool)
                    .await?;
            }
        }

        for table_name in &changes.removed_tables {
            let drop_sql = format!("DROP TABLE {}", table_name);
            self.execute_schema_change(&format!("Drop table {}", table_name), &drop_sql, &mut *conn)
                .await?;
        }

        let current_indices = get_indices(&mut *conn).await?;
        let target_indices = get_indices(pristine_pool).await?;
        self.migrate_indices(conn, &current_indices, &target_indices)
            .await?;

        if changes.current_version != self.target_version {
            let pragma_sql = format!("PRAGMA user_version = {}", self.target_version);
            self.execute_schema_change(
                &format!("Set user_version to {}", self.target_version),
                &pragma_sql,
                &mut *conn,
            )
            .await?;
        }

        Ok(())
    }

    #[instrument(skip(self, conn, target_table, pristine_pool))]
    async fn migrate_table(
        &mut self,
        conn: &mut SqliteConnection,
        table_name: &str,
        target_table: &TableInfo,
        pristine_pool: &SqlitePool,
    ) -> Result<(), StoreError> {
        info!("Rebuilding table: {}", table_name);

        let temp_name = format!("{}_migration_new", table_name);
        let temp_sql = target_table.sql.replacen(
            &format!("CREATE TABLE {}", table_name),
            &format!("CREATE TABLE {}", temp_name),
            1,
        );

        self.execute_schema_change(
            &format!("Create temporary table for {}", table_name),
            &temp_sql,
            &mut *conn,
        )
        .await?;

        let current_columns = get_table_columns(&mut *conn, table_name).await?;
        let target_columns = get_table_columns(pristine_pool, table_name).await?;

        let current_col_names: HashSet<_> = current_columns.iter().map(|c| &c.name).collect();
        let target_col_names: HashSet<_> = target_columns.iter().map(|c| &c.name).collect();

        let common_columns: Vec<_> = current_col_names.intersection(&target_col_names).collect();
        if !common_columns.is_empty() {
            let columns_str = common_columns
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let copy_sql = format!(
                "INSERT INTO {} ({}) SELECT {} FROM {}",
                temp_name, columns_str, columns_str, table_name
            );

            self.execute_schema_change(
                &format!("Copy rows to new {}", table_name),
                &copy_sql,
                &mut *conn,
            )
            .await?;
        }

        self.execute_schema_change(
            &format!("Drop old table {}", table_name),
            &format!("DROP TABLE {}", table_name),
            &mut *conn,
        )
        .await?;

        self.execute_schema_change(
            &format!("Rename new table to {}", table_name),
            &format!("ALTER TABLE {} RENAME TO {}", temp_name, table_name),
            &mut *conn,
        )
        .await?;

        Ok(())
    }

    #[instrument(skip_all)]
    async fn migrate_indices(
        &mut self,
        conn: &mut SqliteConnection,
        current_indices: &HashMap<String, IndexInfo>,
        target_indices: &HashMap<String, IndexInfo>,
    ) -> Result<(), StoreError> {
        for index_name in current_indices.keys() {
            if !target_indices.contains_key(index_name) {
                self.execute_schema_change(
                    &format!("Drop obsolete index {}", index_name),
                    &format!("DROP INDEX {}", index_name),
                    &mut *conn,
                )
                .await?;
            }
        }

        for (index_name, target_index) in target_indices {
            match current_indices.get(index_name) {
                Some(current_index)
                    if normalize_sql(&current_index.sql) == normalize_sql(&target_index.sql) => {}
                Some(_) => {
                    self.execute_schema_change(
                        &format!("Drop changed index {}", index_name),
                        &format!("DROP INDEX {}", index_name),
                        &mut *conn,
                    )
                    .await?;
                    self.execute_schema_change(
                        &format!("Recreate index {}", index_name),
                        &target_index.sql,
                        &mut *conn,
                    )
                    .await?;
                }
                None => {
                    self.execute_schema_change(
                        &format!("Create new index {}", index_name),
                        &target_index.sql,
                        &mut *conn,
                    )
                    .await?;
                }
            }
        }

        Ok(())
    }

    async fn execute_schema_change(
        &mut self,
        description: &str,
        sql: &str,
        conn: &mut SqliteConnection,
    ) -> Result<(), StoreError> {
        info!("Store migration: {} with SQL:\n{}", description, sql);
        sqlx::query(sql).execute(conn).await?;
        self.schema_changes_made += 1;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn analyze_changes(
        &self,
        conn: &mut SqliteConnection,
        pristine_pool: &SqlitePool,
    ) -> Result<SchemaChanges, StoreError> {
        let mut changes = SchemaChanges {
            current_version: user_version(&mut *conn).await?,
            target_version: self.target_version,
            ..Default::default()
        };

        let current_tables = get_tables(&mut *conn).await?;
        let target_tables = get_tables(pristine_pool).await?;

        let current_table_names: HashSet<_> = current_tables.keys().collect();
        let target_table_names: HashSet<_> = target_tables.keys().collect();

        changes.new_tables = sorted(target_table_names.difference(&current_table_names));
        changes.removed_tables = sorted(current_table_names.difference(&target_table_names));

        for table_name in sorted(current_table_names.intersection(&target_table_names)) {
            let current_sql = normalize_sql(&current_tables[&table_name].sql);
            let target_sql = normalize_sql(&target_tables[&table_name].sql);
            if current_sql == target_sql {
                continue;
            }

            let current_columns = get_table_columns(&mut *conn, &table_name).await?;
            let target_columns = get_table_columns(pristine_pool, &table_name).await?;
            let target_col_names: HashSet<_> = target_columns.iter().map(|c| &c.name).collect();
            let removed_columns = current_columns
                .iter()
                .filter(|c| !target_col_names.contains(&c.name))
                .map(|c| c.name.clone())
                .collect();

            changes.modified_tables.push(ModifiedTable {
                name: table_name,
                removed_columns,
            });
        }

        let current_indices = get_indices(&mut *conn).await?;
        let target_indices = get_indices(pristine_pool).await?;

        let current_index_names: HashSet<_> = current_indices.keys().collect();
        let target_index_names: HashSet<_> = target_indices.keys().collect();

        changes.new_indices = sorted(target_index_names.difference(&current_index_names));
        changes.removed_indices = sorted(current_index_names.difference(&target_index_names));

        for index_name in current_index_names.intersection(&target_index_names) {
            let current_sql = normalize_sql(&current_indices[*index_name].sql);
            let target_sql = normalize_sql(&target_indices[*index_name].sql);
            if current_sql != target_sql {
                changes.modified_indices.push(index_name.to_string());
            }
        }

        if changes.is_destructive() {
            warn!(?changes, "Declared schema would remove existing objects");
        }

        Ok(changes)
    }
}

fn sorted<S: ToString>(names: impl Iterator<Item = S>) -> Vec<String> {
    let mut names: Vec<String> = names.map(|s| s.to_string()).collect();
    names.sort();
    names
}

pub async fn user_version<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
) -> Result<i64, StoreError> {
    Ok(sqlx::query("PRAGMA user_version")
        .fetch_one(executor)
        .await?
        .get::<i64, _>(0))
}

async fn get_tables<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
) -> Result<HashMap<String, TableInfo>, StoreError> {
    let rows = sqlx::query(
        "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name != 'sqlite_sequence'",
    )
    .fetch_all(executor)
    .await?;

    let mut tables = HashMap::new();
    for row in rows {
        let name: String = row.get(0);
        let sql: String = row.get(1);
        tables.insert(name, TableInfo { sql });
    }
    Ok(tables)
}

async fn get_indices<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
) -> Result<HashMap<String, IndexInfo>, StoreError> {
    let rows =
        sqlx::query("SELECT name, sql FROM sqlite_master WHERE type = 'index' AND sql IS NOT NULL")
            .fetch_all(executor)
            .await?;

    let mut indices = HashMap::new();
    for row in rows {
        let name: String = row.get(0);
        let sql: String = row.get(1);
        indices.insert(name, IndexInfo { sql });
    }
    Ok(indices)
}

async fn get_table_columns<'e>(
    executor: impl sqlx::Executor<'e, Database = Sqlite>,
    table_name: &str,
) -> Result<Vec<ColumnInfo>, StoreError> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table_name))
        .fetch_all(executor)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| ColumnInfo { name: row.get(1) })
        .collect())
}

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\n]*\n").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" *([(),]) *").expect("valid regex"));
static QUOTED_IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(\w+)""#).expect("valid regex"));

pub fn normalize_sql(sql: &str) -> String {
    let sql = COMMENT_RE.replace_all(sql, "");
    let sql = WHITESPACE_RE.replace_all(&sql, " ");
    let sql = PUNCTUATION_RE.replace_all(&sql, "$1");
    let sql = QUOTED_IDENT_RE.replace_all(&sql, "$1");
    sql.trim().to_string()
}

/// Brings the store behind `conn` up to `target_schema`, refusing destructive
/// changes and newer stores.
pub async fn migrate_declaratively(
    conn: &mut SqliteConnection,
    target_schema: &str,
    target_version: i64,
) -> Result<MigrationOutcome, StoreError> {
    let mut migrator = DeclarativeMigrator::new(target_schema, target_version, false);
    migrator.migrate(conn).await
}

/// Diff between the store at `pool` and the compiled-in schema.
pub async fn pending_changes(pool: &SqlitePool) -> Result<SchemaChanges, StoreError> {
    let migrator =
        DeclarativeMigrator::new(super::CURRENT_SCHEMA, super::SCHEMA_VERSION, false);
    let mut conn = pool.acquire().await?;
    migrator.plan(&mut conn).await
}
