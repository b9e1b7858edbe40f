use std::fmt;

/// Bumped whenever `CURRENT_SCHEMA` changes. Stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Every entity table in the store, in seeding dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    CaseCategories,
    Institution,
    Users,
    Courses,
    Teachers,
    Representatives,
    Students,
    CaseFiles,
    FollowUps,
    SexualViolenceCases,
    SexualViolenceVictims,
    DeceFollowUpForms,
    PsychosocialInterviews,
    PregnancyCases,
    AssistedClasses,
    Appointments,
    PreventiveActivities,
    PefModules,
    PefEvaluations,
    AppSettings,
}

impl Table {
    pub const ALL: [Table; 20] = [
        Table::CaseCategories,
        Table::Institution,
        Table::Users,
        Table::Courses,
        Table::Teachers,
        Table::Representatives,
        Table::Students,
        Table::CaseFiles,
        Table::FollowUps,
        Table::SexualViolenceCases,
        Table::SexualViolenceVictims,
        Table::DeceFollowUpForms,
        Table::PsychosocialInterviews,
        Table::PregnancyCases,
        Table::AssistedClasses,
        Table::Appointments,
        Table::PreventiveActivities,
        Table::PefModules,
        Table::PefEvaluations,
        Table::AppSettings,
    ];

    /// SQL table name, also used as the key in backup documents.
    pub fn name(&self) -> &'static str {
        match self {
            Table::CaseCategories => "case_categories",
            Table::Institution => "institution",
            Table::Users => "users",
            Table::Courses => "courses",
            Table::Teachers => "teachers",
            Table::Representatives => "representatives",
            Table::Students => "students",
            Table::CaseFiles => "case_files",
            Table::FollowUps => "follow_ups",
            Table::SexualViolenceCases => "sexual_violence_cases",
            Table::SexualViolenceVictims => "sexual_violence_victims",
            Table::DeceFollowUpForms => "dece_follow_up_forms",
            Table::PsychosocialInterviews => "psychosocial_interviews",
            Table::PregnancyCases => "pregnancy_cases",
            Table::AssistedClasses => "assisted_classes",
            Table::Appointments => "appointments",
            Table::PreventiveActivities => "preventive_activities",
            Table::PefModules => "pef_modules",
            Table::PefEvaluations => "pef_evaluations",
            Table::AppSettings => "app_settings",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Document tables hold `(id, data)`; only `app_settings` is keyed by name.
    pub fn is_document_table(&self) -> bool {
        !matches!(self, Table::AppSettings)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Every entity row is a JSON document. Lookup, unique and compound keys are
// expression indices over json_extract so the engine enforces them.
pub const CURRENT_SCHEMA: &str = r#"
PRAGMA user_version = 1;

CREATE TABLE IF NOT EXISTS case_categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_case_categories_name
    ON case_categories (json_extract(data, '$.name'));

CREATE TABLE IF NOT EXISTS institution (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    data TEXT NOT NULL CHECK (json_valid(data))
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_users_cedula
    ON users (json_extract(data, '$.cedula'));
CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email
    ON users (json_extract(data, '$.email'));

CREATE TABLE IF NOT EXISTS courses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_courses_identity
    ON courses (json_extract(data, '$.name'), json_extract(data, '$.parallel'), json_extract(data, '$.shift'));

CREATE TABLE IF NOT EXISTS teachers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_teachers_cedula
    ON teachers (json_extract(data, '$.cedula'));
CREATE INDEX IF NOT EXISTS idx_teachers_tutor_course
    ON teachers (json_extract(data, '$.tutorCourseId'));

CREATE TABLE IF NOT EXISTS representatives (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_representatives_cedula
    ON representatives (json_extract(data, '$.cedula'));

CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_students_cedula
    ON students (json_extract(data, '$.cedula'));
CREATE INDEX IF NOT EXISTS idx_students_course
    ON students (json_extract(data, '$.course'), json_extract(data, '$.parallel'));
CREATE INDEX IF NOT EXISTS idx_students_representative
    ON students (json_extract(data, '$.representativeId'));

CREATE TABLE IF NOT EXISTS case_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_case_files_code
    ON case_files (json_extract(data, '$.code'));
CREATE INDEX IF NOT EXISTS idx_case_files_student
    ON case_files (json_extract(data, '$.studentId'));
CREATE INDEX IF NOT EXISTS idx_case_files_category_status
    ON case_files (json_extract(data, '$.category'), json_extract(data, '$.status'));
CREATE INDEX IF NOT EXISTS idx_case_files_opening_date
    ON case_files (json_extract(data, '$.openingDate'));

CREATE TABLE IF NOT EXISTS follow_ups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE INDEX IF NOT EXISTS idx_follow_ups_case
    ON follow_ups (json_extract(data, '$.caseId'));
CREATE INDEX IF NOT EXISTS idx_follow_ups_date
    ON follow_ups (json_extract(data, '$.date'));

CREATE TABLE IF NOT EXISTS sexual_violence_cases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sexual_violence_cases_case
    ON sexual_violence_cases (json_extract(data, '$.caseFileId'));

CREATE TABLE IF NOT EXISTS sexual_violence_victims (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE INDEX IF NOT EXISTS idx_sexual_violence_victims_details
    ON sexual_violence_victims (json_extract(data, '$.detailsId'));

CREATE TABLE IF NOT EXISTS dece_follow_up_forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_dece_follow_up_forms_follow_up
    ON dece_follow_up_forms (json_extract(data, '$.followUpId'));

CREATE TABLE IF NOT EXISTS psychosocial_interviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_psychosocial_interviews_case_type
    ON psychosocial_interviews (json_extract(data, '$.caseFileId'), json_extract(data, '$.interviewType'));

CREATE TABLE IF NOT EXISTS pregnancy_cases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE INDEX IF NOT EXISTS idx_pregnancy_cases_student
    ON pregnancy_cases (json_extract(data, '$.studentId'));

CREATE TABLE IF NOT EXISTS assisted_classes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE INDEX IF NOT EXISTS idx_assisted_classes_student
    ON assisted_classes (json_extract(data, '$.studentId'));

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE INDEX IF NOT EXISTS idx_appointments_date
    ON appointments (json_extract(data, '$.date'));

CREATE TABLE IF NOT EXISTS preventive_activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE INDEX IF NOT EXISTS idx_preventive_activities_date
    ON preventive_activities (json_extract(data, '$.date'));

CREATE TABLE IF NOT EXISTS pef_modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_pef_modules_name
    ON pef_modules (json_extract(data, '$.name'));

CREATE TABLE IF NOT EXISTS pef_evaluations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL CHECK (json_valid(data))
);
CREATE INDEX IF NOT EXISTS idx_pef_evaluations_teacher
    ON pef_evaluations (json_extract(data, '$.teacherId'));

CREATE TABLE IF NOT EXISTS app_settings (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL CHECK (json_valid(value))
);
"#;
