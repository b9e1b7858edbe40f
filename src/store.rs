//! The store handle and its one-shot initialization.

use crate::database::{CURRENT_SCHEMA, SCHEMA_VERSION, migrate_declaratively};
use crate::env::StoreConfig;
use crate::error::StoreError;
use crate::seed;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::{info, instrument};

/// Handle to the opened store. Built once at startup and passed to whatever
/// needs it; clones share the same pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
    config: StoreConfig,
}

/// Result of [`Store::open`].
#[derive(Debug)]
pub struct Opened {
    pub store: Store,
    /// The store did not exist before this call and was created (and seeded,
    /// when the seed policy allows it).
    pub was_created: bool,
}

impl Store {
    /// Opens (or creates) the store described by `config`.
    ///
    /// Schema creation and, on first creation, seeding run in one
    /// transaction: either the seeded store commits or nothing does. A store
    /// written by a newer schema version fails with
    /// [`StoreError::SchemaVersionMismatch`]; an unreadable file surfaces as
    /// [`StoreError::Database`].
    #[instrument(
        skip_all,
        fields(
            database_url = %config.database_url,
            error = tracing::field::Empty,
            error.type = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    )]
    pub async fn open(config: &StoreConfig) -> Result<Opened, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = if config.is_in_memory() {
            // One long-lived connection, the in-memory database dies with it.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options.journal_mode(SqliteJournalMode::Memory))
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let store = Store {
            pool,
            config: config.clone(),
        };
        let was_created = store.initialize().await?;

        Ok(Opened { store, was_created })
    }

    async fn initialize(&self) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let outcome = migrate_declaratively(&mut tx, CURRENT_SCHEMA, SCHEMA_VERSION).await?;

        if outcome.was_created && self.config.seed.enabled {
            info!("New store, seeding demonstration data");
            let today = Utc::now().date_naive();
            if let Err(err) = seed::run(&mut tx, &self.config, today).await {
                tx.rollback().await?;
                err.log_and_record("seed");
                return Err(StoreError::aborted("seed", err));
            }
        }

        tx.commit().await?;
        info!(was_created = outcome.was_created, "Store ready");
        Ok(outcome.was_created)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.config.bcrypt_cost
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
