use crate::error::StoreError;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://dece.db";

/// Cost bounds bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Whether and how the store is populated the first time it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPolicy {
    pub enabled: bool,
    /// Fixed RNG seed for a reproducible demonstration dataset.
    pub rng_seed: Option<u64>,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub bcrypt_cost: u32,
    pub seed: SeedPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            seed: SeedPolicy::default(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }

    /// Reads `DECE_DATABASE_URL`, `DECE_BCRYPT_COST`, `DECE_SEED_ON_CREATE` and
    /// `DECE_SEED_RNG`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, StoreError> {
        let defaults = Self::default();

        let database_url =
            dotenvy::var("DECE_DATABASE_URL").unwrap_or(defaults.database_url);
        let bcrypt_cost = parse_var("DECE_BCRYPT_COST")?.unwrap_or(defaults.bcrypt_cost);
        let enabled = parse_var("DECE_SEED_ON_CREATE")?.unwrap_or(defaults.seed.enabled);
        let rng_seed = parse_var("DECE_SEED_RNG")?;

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(StoreError::Validation(format!(
                "DECE_BCRYPT_COST must be between {} and {}, got {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST,
                bcrypt_cost
            )));
        }

        Ok(Self {
            database_url,
            bcrypt_cost,
            seed: SeedPolicy { enabled, rng_seed },
        })
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, StoreError> {
    match dotenvy::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StoreError::Validation(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("DECE_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
