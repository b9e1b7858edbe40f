#[cfg(test)]
pub mod test_store {
    use crate::auth::{Registration, Role, UserStatus, new_user};
    use crate::db;
    use crate::env::{MIN_BCRYPT_COST, SeedPolicy, StoreConfig};
    use crate::error::StoreError;
    use crate::models::{
        CaseCategory, Course, Gender, INSTITUTION_ID, Institution, Representative, Student,
    };
    use crate::store::Store;
    use crate::telemetry::init_test_tracing;
    use chrono::NaiveDate;
    use sqlx::SqlitePool;
    use std::collections::HashMap;

    pub static STANDARD_PASSWORD: &str = "password123";
    pub static TEST_RNG_SEED: u64 = 20240307;

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    pub fn test_config(seeded: bool) -> StoreConfig {
        StoreConfig {
            database_url: "sqlite::memory:".to_string(),
            bcrypt_cost: MIN_BCRYPT_COST,
            seed: SeedPolicy {
                enabled: seeded,
                rng_seed: Some(TEST_RNG_SEED),
            },
        }
    }

    #[derive(Default)]
    pub struct TestStoreBuilder {
        seeded: bool,
        institution: Option<String>,
        users: Vec<TestUser>,
        categories: Vec<(String, bool)>,
        courses: Vec<(String, String)>,
        representatives: Vec<TestRepresentative>,
        students: Vec<TestStudent>,
    }

    pub struct TestUser {
        pub full_name: String,
        pub cedula: String,
        pub email: String,
        pub role: Role,
        pub active: bool,
    }

    pub struct TestRepresentative {
        pub full_name: String,
        pub cedula: String,
    }

    pub struct TestStudent {
        pub full_name: String,
        pub cedula: String,
        pub gender: Gender,
        pub course: String,
        pub parallel: String,
        pub representative_cedula: Option<String>,
    }

    /// An opened store plus the ids of the fixtures written into it, keyed by
    /// cédula (people) or name (categories).
    pub struct TestStore {
        pub store: Store,
        pub users: HashMap<String, i64>,
        pub categories: HashMap<String, i64>,
        pub representatives: HashMap<String, i64>,
        pub students: HashMap<String, i64>,
    }

    impl TestStore {
        pub fn pool(&self) -> &SqlitePool {
            self.store.pool()
        }

        pub fn student_id(&self, cedula: &str) -> i64 {
            self.students[cedula]
        }
    }

    impl TestStoreBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Runs the demonstration seed with a fixed RNG seed.
        pub fn seeded(mut self) -> Self {
            self.seeded = true;
            self
        }

        pub fn institution(mut self, name: &str) -> Self {
            self.institution = Some(name.to_string());
            self
        }

        pub fn user(mut self, full_name: &str, cedula: &str, email: &str, role: Role) -> Self {
            self.users.push(TestUser {
                full_name: full_name.to_string(),
                cedula: cedula.to_string(),
                email: email.to_string(),
                role,
                active: false,
            });
            self
        }

        pub fn active_user(mut self, full_name: &str, cedula: &str, email: &str, role: Role) -> Self {
            self.users.push(TestUser {
                full_name: full_name.to_string(),
                cedula: cedula.to_string(),
                email: email.to_string(),
                role,
                active: true,
            });
            self
        }

        pub fn category(mut self, name: &str, protected: bool) -> Self {
            self.categories.push((name.to_string(), protected));
            self
        }

        pub fn course(mut self, name: &str, parallel: &str) -> Self {
            self.courses.push((name.to_string(), parallel.to_string()));
            self
        }

        pub fn representative(mut self, full_name: &str, cedula: &str) -> Self {
            self.representatives.push(TestRepresentative {
                full_name: full_name.to_string(),
                cedula: cedula.to_string(),
            });
            self
        }

        pub fn student(
            mut self,
            full_name: &str,
            cedula: &str,
            gender: Gender,
            course: &str,
            parallel: &str,
            representative_cedula: Option<&str>,
        ) -> Self {
            self.students.push(TestStudent {
                full_name: full_name.to_string(),
                cedula: cedula.to_string(),
                gender,
                course: course.to_string(),
                parallel: parallel.to_string(),
                representative_cedula: representative_cedula.map(String::from),
            });
            self
        }

        pub async fn build(self) -> Result<TestStore, StoreError> {
            init_test_tracing();

            let opened = Store::open(&test_config(self.seeded)).await?;
            let store = opened.store;
            let pool = store.pool();

            if let Some(name) = &self.institution {
                let institution = Institution {
                    id: Some(INSTITUTION_ID),
                    name: name.clone(),
                    code: "09H00001".to_string(),
                    district: "09D03".to_string(),
                    authority_name: "Rectora".to_string(),
                    address: "Guayaquil".to_string(),
                    phone: "042000000".to_string(),
                    email: "dece@colegio.edu.ec".to_string(),
                    school_year: "2024-2025".to_string(),
                    logo: None,
                };
                db::put(pool, &institution).await?;
            }

            let mut users = HashMap::new();
            for user in &self.users {
                let registration = Registration {
                    full_name: &user.full_name,
                    cedula: &user.cedula,
                    email: &user.email,
                    password: STANDARD_PASSWORD,
                    role: user.role,
                };
                let mut record = new_user(&registration, MIN_BCRYPT_COST)?;
                if user.active {
                    record.status = UserStatus::Active;
                    record.first_login = false;
                }
                let id = db::insert(pool, &record).await?;
                users.insert(user.cedula.clone(), id);
            }

            let mut categories = HashMap::new();
            for (name, protected) in &self.categories {
                let category = CaseCategory {
                    id: None,
                    name: name.clone(),
                    protected: *protected,
                };
                let id = db::insert(pool, &category).await?;
                categories.insert(name.clone(), id);
            }

            for (name, parallel) in &self.courses {
                db::insert(pool, &Course::new(name, parallel, "MATUTINA")).await?;
            }

            let mut representatives = HashMap::new();
            for representative in &self.representatives {
                let record = Representative {
                    id: None,
                    full_name: representative.full_name.clone(),
                    cedula: representative.cedula.clone(),
                    age: 40,
                    address: "Av. Quito y Padre Solano".to_string(),
                    phone: "0991234567".to_string(),
                    relationship: Some("Madre".to_string()),
                };
                let id = db::insert(pool, &record).await?;
                representatives.insert(representative.cedula.clone(), id);
            }

            let mut students = HashMap::new();
            for student in &self.students {
                let representative_id = match &student.representative_cedula {
                    Some(cedula) => representatives.get(cedula).copied(),
                    None => representatives.values().next().copied(),
                }
                .unwrap_or(0);

                let record = Student {
                    id: None,
                    full_name: student.full_name.clone(),
                    cedula: student.cedula.clone(),
                    gender: student.gender,
                    birth_date: date(2010, 5, 14),
                    course: student.course.clone(),
                    parallel: student.parallel.clone(),
                    tutor_id: None,
                    representative_id,
                    address: None,
                    special_condition: None,
                    special_condition_attachment: None,
                };
                let id = db::insert(pool, &record).await?;
                students.insert(student.cedula.clone(), id);
            }

            Ok(TestStore {
                store,
                users,
                categories,
                representatives,
                students,
            })
        }
    }
}
