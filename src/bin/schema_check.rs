use anyhow::{Context, Result, anyhow};
use dece_store::database::pending_changes;
use dece_store::env::{StoreConfig, load_environment};
use dece_store::telemetry::init_tracing;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;

/// Reports how the store at `DECE_DATABASE_URL` differs from the schema this
/// build expects. Exits non-zero when applying it would be destructive or the
/// store is newer than this build.
#[tokio::main]
async fn main() -> Result<()> {
    load_environment().map_err(|e| anyhow!("Failed to load environment: {}", e))?;
    init_tracing();

    let config = StoreConfig::from_env()?;
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("Invalid DECE_DATABASE_URL")?;
    let pool = SqlitePool::connect_with(options)
        .await
        .context("Failed to open store")?;

    let changes = pending_changes(&pool).await?;

    if changes.current_version > changes.target_version {
        return Err(anyhow!(
            "Store is at schema version {}, this build understands up to {}",
            changes.current_version,
            changes.target_version
        ));
    }

    if !changes.has_any_changes() {
        println!("Store is up to date (schema version {})", changes.current_version);
        return Ok(());
    }

    println!(
        "Schema version {} -> {}",
        changes.current_version, changes.target_version
    );
    print_names(&changes.new_tables, "    Table added:");
    print_names(&changes.new_indices, "    Index added:");
    print_names(&changes.modified_indices, "    Index changed:");
    print_names(&changes.removed_tables, "    Table removed:");
    print_names(&changes.removed_indices, "    Index removed:");
    for table in &changes.modified_tables {
        println!("    Table changed: {}", table.name);
        let prefix = format!("        Column removed from {}:", table.name);
        print_names(&table.removed_columns, &prefix);
    }

    if changes.is_destructive() {
        return Err(anyhow!("Destructive changes detected"));
    }

    println!("Changes passed the check ✓");
    Ok(())
}

fn print_names(names: &[String], prefix: &str) {
    for name in names {
        println!("{} {}", prefix, name);
    }
}
