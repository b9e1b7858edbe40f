#[cfg(test)]
mod tests {
    use crate::env::{DEFAULT_DATABASE_URL, MAX_BCRYPT_COST, MIN_BCRYPT_COST, StoreConfig};
    use crate::error::StoreError;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "DECE_DATABASE_URL",
        "DECE_BCRYPT_COST",
        "DECE_SEED_ON_CREATE",
        "DECE_SEED_RNG",
    ];

    fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
        VARS.iter().map(|name| (*name, None)).collect()
    }

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        temp_env::with_vars(unset_all(), || {
            let config = StoreConfig::from_env().unwrap();
            assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
            assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
            assert!(config.seed.enabled);
            assert_eq!(config.seed.rng_seed, None);
            assert!(!config.is_in_memory());
        });
    }

    #[test]
    #[serial]
    fn test_overrides_from_environment() {
        temp_env::with_vars(
            [
                ("DECE_DATABASE_URL", Some("sqlite::memory:")),
                ("DECE_BCRYPT_COST", Some("4")),
                ("DECE_SEED_ON_CREATE", Some("false")),
                ("DECE_SEED_RNG", Some(" 2024 ")),
            ],
            || {
                let config = StoreConfig::from_env().unwrap();
                assert!(config.is_in_memory());
                assert_eq!(config.bcrypt_cost, 4);
                assert!(!config.seed.enabled);
                assert_eq!(config.seed.rng_seed, Some(2024));
            },
        );
    }

    #[test]
    #[serial]
    fn test_bcrypt_cost_out_of_range() {
        temp_env::with_vars([("DECE_BCRYPT_COST", Some("99"))], || {
            let err = StoreConfig::from_env().unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
            assert!(err.to_string().contains("DECE_BCRYPT_COST"));
        });
    }

    #[test]
    #[serial]
    fn test_bcrypt_cost_bounds_are_inclusive() {
        for cost in [MIN_BCRYPT_COST, MAX_BCRYPT_COST] {
            let raw = cost.to_string();
            temp_env::with_vars([("DECE_BCRYPT_COST", Some(raw.as_str()))], || {
                assert_eq!(StoreConfig::from_env().unwrap().bcrypt_cost, cost);
            });
        }

        let below = (MIN_BCRYPT_COST - 1).to_string();
        temp_env::with_vars([("DECE_BCRYPT_COST", Some(below.as_str()))], || {
            assert!(matches!(
                StoreConfig::from_env(),
                Err(StoreError::Validation(_))
            ));
        });

        // Hashing accepts the lower bound
        assert!(bcrypt::hash("Dece2024*", MIN_BCRYPT_COST).is_ok());
    }

    #[test]
    #[serial]
    fn test_unparseable_values_rejected() {
        temp_env::with_vars([("DECE_SEED_ON_CREATE", Some("quizás"))], || {
            assert!(matches!(
                StoreConfig::from_env(),
                Err(StoreError::Validation(_))
            ));
        });
        temp_env::with_vars([("DECE_SEED_RNG", Some("-1"))], || {
            assert!(StoreConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_in_memory_config() {
        let config = StoreConfig::in_memory();
        assert!(config.is_in_memory());
        assert!(config.seed.enabled);
    }
}
