#[cfg(test)]
mod tests {
    use crate::database::{
        CURRENT_SCHEMA, DeclarativeMigrator, SCHEMA_VERSION, Table, migrate_declaratively,
        normalize_sql, pending_changes, user_version,
    };
    use crate::error::StoreError;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Row, SqlitePool};

    const EMPTY_SCHEMA: &str = "";

    const SINGLE_TABLE_SCHEMA: &str = r#"
        CREATE TABLE students (
            id INTEGER PRIMARY KEY,
            data TEXT NOT NULL
        );
    "#;

    const TWO_TABLE_SCHEMA: &str = r#"
        CREATE TABLE students (
            id INTEGER PRIMARY KEY,
            data TEXT NOT NULL
        );

        CREATE TABLE case_files (
            id INTEGER PRIMARY KEY,
            data TEXT NOT NULL
        );
    "#;

    const MODIFIED_TABLE_SCHEMA: &str = r#"
        CREATE TABLE students (
            id INTEGER PRIMARY KEY,
            data TEXT NOT NULL,
            archived INTEGER
        );

        CREATE TABLE case_files (
            id INTEGER PRIMARY KEY,
            data TEXT NOT NULL
        );
    "#;

    const COLUMN_REMOVAL_SCHEMA: &str = r#"
    CREATE TABLE students (
        id INTEGER PRIMARY KEY
        -- removed data column
    );
    "#;

    const WITH_INDEX_SCHEMA: &str = r#"
    CREATE TABLE students (
        id INTEGER PRIMARY KEY,
        data TEXT NOT NULL
    );

    CREATE UNIQUE INDEX idx_students_cedula ON students (json_extract(data, '$.cedula'));
    "#;

    const WITHOUT_INDEX_SCHEMA: &str = r#"
    CREATE TABLE students (
        id INTEGER PRIMARY KEY,
        data TEXT NOT NULL
    );
    -- removed index
    "#;

    async fn create_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database")
    }

    /// Number of schema statements applied.
    async fn migrate(pool: &SqlitePool, schema: &str, allow_deletions: bool) -> Result<u32, StoreError> {
        let mut conn = pool.acquire().await?;
        let mut migrator = DeclarativeMigrator::new(schema, 0, allow_deletions);
        Ok(migrator.migrate(&mut conn).await?.schema_changes_made)
    }

    async fn get_table_names(pool: &SqlitePool) -> Vec<String> {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name != 'sqlite_sequence' ORDER BY name")
            .fetch_all(pool)
            .await
            .expect("Failed to fetch table names");

        rows.into_iter()
            .map(|row| row.get::<String, _>(0))
            .collect()
    }

    async fn get_column_names(pool: &SqlitePool, table: &str) -> Vec<String> {
        sqlx::query(&format!("PRAGMA table_info({})", table))
            .fetch_all(pool)
            .await
            .unwrap()
            .iter()
            .map(|row| row.get::<String, _>("name"))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_to_empty_no_changes() {
        let pool = create_test_db().await;

        let result = migrate(&pool, EMPTY_SCHEMA, false).await;
        assert_eq!(result.unwrap(), 0, "Empty to empty should report no changes");

        assert!(get_table_names(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_first_table() {
        let pool = create_test_db().await;

        let result = migrate(&pool, SINGLE_TABLE_SCHEMA, false).await;
        assert!(result.unwrap() > 0, "Creating first table should report changes");

        assert_eq!(get_table_names(&pool).await, vec!["students"]);

        // Re-running should be no-op
        let result = migrate(&pool, SINGLE_TABLE_SCHEMA, false).await;
        assert_eq!(result.unwrap(), 0, "Re-running same migration should be no-op");
    }

    #[tokio::test]
    async fn test_add_second_table() {
        let pool = create_test_db().await;

        sqlx::raw_sql(SINGLE_TABLE_SCHEMA).execute(&pool).await.unwrap();

        let result = migrate(&pool, TWO_TABLE_SCHEMA, false).await;
        assert!(result.unwrap() > 0, "Adding second table should report changes");

        assert_eq!(get_table_names(&pool).await, vec!["case_files", "students"]);
    }

    #[tokio::test]
    async fn test_modify_existing_table_preserves_rows() {
        let pool = create_test_db().await;

        sqlx::raw_sql(TWO_TABLE_SCHEMA).execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO students (data) VALUES (?)")
            .bind(r#"{"fullName":"Ana Torres"}"#)
            .execute(&pool)
            .await
            .unwrap();

        let result = migrate(&pool, MODIFIED_TABLE_SCHEMA, false).await;
        assert!(result.unwrap() > 0, "Modifying table should report changes");

        assert!(get_column_names(&pool, "students").await.contains(&"archived".to_string()));

        let row = sqlx::query("SELECT data, archived FROM students")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("data"), r#"{"fullName":"Ana Torres"}"#);
        assert!(row.get::<Option<i64>, _>("archived").is_none());
    }

    #[tokio::test]
    async fn test_table_deletion_forbidden() {
        let pool = create_test_db().await;

        sqlx::raw_sql(TWO_TABLE_SCHEMA).execute(&pool).await.unwrap();

        let result = migrate(&pool, SINGLE_TABLE_SCHEMA, false).await;
        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("case_files"), "Error should name the table");
        assert!(error_msg.contains("allow_deletions"), "Error should mention permission");

        assert_eq!(get_table_names(&pool).await, vec!["case_files", "students"]);
    }

    #[tokio::test]
    async fn test_table_deletion_allowed() {
        let pool = create_test_db().await;

        sqlx::raw_sql(TWO_TABLE_SCHEMA).execute(&pool).await.unwrap();

        let result = migrate(&pool, SINGLE_TABLE_SCHEMA, true).await;
        assert!(result.unwrap() > 0);

        assert_eq!(get_table_names(&pool).await, vec!["students"]);
    }

    #[tokio::test]
    async fn test_column_deletion_forbidden() {
        let pool = create_test_db().await;

        sqlx::raw_sql(SINGLE_TABLE_SCHEMA).execute(&pool).await.unwrap();

        let result = migrate(&pool, COLUMN_REMOVAL_SCHEMA, false).await;
        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("data"), "Error should mention the column being removed");

        assert!(
            get_column_names(&pool, "students").await.contains(&"data".to_string()),
            "Original column should still exist"
        );
    }

    #[tokio::test]
    async fn test_index_deletion_forbidden() {
        let pool = create_test_db().await;

        sqlx::raw_sql(WITH_INDEX_SCHEMA).execute(&pool).await.unwrap();

        let result = migrate(&pool, WITHOUT_INDEX_SCHEMA, false).await;
        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("idx_students_cedula"));

        let indices: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_students_cedula'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(indices, 1);
    }

    #[tokio::test]
    async fn test_normalize_sql_function() {
        assert_eq!(
            normalize_sql("CREATE TABLE test( -- comment\n  id INTEGER )"),
            "CREATE TABLE test(id INTEGER)"
        );

        assert_eq!(
            normalize_sql("CREATE TABLE \"quoted\"(id INTEGER)"),
            "CREATE TABLE quoted(id INTEGER)"
        );
    }

    #[tokio::test]
    async fn test_current_schema_creates_every_table() {
        let pool = create_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let outcome = migrate_declaratively(&mut conn, CURRENT_SCHEMA, SCHEMA_VERSION)
            .await
            .unwrap();
        assert!(outcome.was_created);
        assert!(outcome.schema_changes_made > 0);
        assert_eq!(user_version(&mut *conn).await.unwrap(), SCHEMA_VERSION);
        drop(conn);

        let tables = get_table_names(&pool).await;
        for table in Table::ALL {
            assert!(tables.contains(&table.name().to_string()), "missing table {}", table);
        }

        let mut conn = pool.acquire().await.unwrap();
        let again = migrate_declaratively(&mut conn, CURRENT_SCHEMA, SCHEMA_VERSION)
            .await
            .unwrap();
        assert!(!again.was_created);
        assert_eq!(again.schema_changes_made, 0);
    }

    #[tokio::test]
    async fn test_newer_store_is_rejected() {
        let pool = create_test_db().await;
        sqlx::raw_sql(SINGLE_TABLE_SCHEMA).execute(&pool).await.unwrap();
        sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION + 1))
            .execute(&pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let result = migrate_declaratively(&mut conn, CURRENT_SCHEMA, SCHEMA_VERSION).await;

        match result {
            Err(StoreError::SchemaVersionMismatch { found, expected }) => {
                assert_eq!(found, SCHEMA_VERSION + 1);
                assert_eq!(expected, SCHEMA_VERSION);
            }
            other => panic!("expected a version mismatch, got {:?}", other),
        }
        drop(conn);

        // Nothing was created alongside the old table
        assert_eq!(get_table_names(&pool).await, vec!["students"]);
    }

    #[tokio::test]
    async fn test_pending_changes_reports_without_applying() {
        let pool = create_test_db().await;

        let changes = pending_changes(&pool).await.unwrap();
        assert!(changes.has_any_changes());
        assert!(!changes.is_destructive());
        assert_eq!(changes.current_version, 0);
        assert_eq!(changes.target_version, SCHEMA_VERSION);
        assert_eq!(changes.new_tables.len(), Table::ALL.len());

        assert!(get_table_names(&pool).await.is_empty());
    }
}
