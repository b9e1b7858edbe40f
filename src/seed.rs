//! Demonstration dataset written the first time a store is created.
//!
//! Steps run in a fixed order and each one only references rows created by an
//! earlier step, always through the ids those inserts returned. The caller
//! owns the transaction; [`crate::store::Store::open`] runs this inside the
//! same transaction that creates the schema.

use crate::auth::{Registration, Role, User, UserStatus, new_user};
use crate::case_code;
use crate::db;
use crate::env::StoreConfig;
use crate::error::StoreError;
use crate::models::{
    Appointment, AppointmentStatus, AssistedClass, AttendeeType, CaseCategory, CaseFile,
    CaseStatus, Course, DeceFollowUpForm, FollowUp, Gender, INSTITUTION_ID, Institution,
    Modality, PEF_CRITERIA, ParticipantType, PefEvaluation, PefModule, PregnancyCase,
    PregnancyCondition, PreventiveActivity, Priority, Representative, SEXUAL_VIOLENCE_CATEGORY,
    SexualViolenceCaseDetails, SexualViolenceVictim, Student, Teacher,
};
use chrono::{Datelike, Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::SqliteConnection;
use tracing::{info, instrument};

pub const TEACHER_COUNT: usize = 25;
pub const REPRESENTATIVE_COUNT: usize = 150;
pub const STUDENT_COUNT: usize = 200;
pub const CASE_COUNT: usize = 50;
pub const MAX_PREGNANCY_CASES: usize = 5;
pub const ASSISTED_CLASS_COUNT: usize = 5;
pub const APPOINTMENT_COUNT: usize = 30;
pub const PREVENTIVE_ACTIVITY_COUNT: usize = 15;
pub const PEF_EVALUATION_COUNT: usize = 15;

/// Case opening dates fall within this many days before today.
const OPENING_WINDOW_DAYS: u64 = 540;

pub const SHIFT: &str = "MATUTINA";
pub const GRADES: [&str; 6] = [
    "Octavo EGB",
    "Noveno EGB",
    "Décimo EGB",
    "Primero BGU",
    "Segundo BGU",
    "Tercero BGU",
];
pub const PARALLELS: [&str; 3] = ["A", "B", "C"];

/// (name, protected)
pub const CATEGORIES: [(&str, bool); 15] = [
    (SEXUAL_VIOLENCE_CATEGORY, true),
    ("Violencia Física", true),
    ("Violencia Psicológica", true),
    ("Acoso Escolar", false),
    ("Consumo de Drogas", true),
    ("Autolesiones", true),
    ("Ideación Suicida", true),
    ("Embarazo Adolescente", false),
    ("Bajo Rendimiento Académico", false),
    ("Deserción Escolar", false),
    ("Problemas de Conducta", false),
    ("Conflictos Familiares", false),
    ("Necesidades Educativas Especiales", false),
    ("Trabajo Infantil", false),
    ("Orientación Vocacional", false),
];

pub const DEMO_PASSWORD: &str = "Dece2024*";

/// Login fixture created by the seed, one per role.
pub struct DemoUser {
    pub full_name: &'static str,
    pub cedula: &'static str,
    pub email: &'static str,
    pub role: Role,
    pub status: UserStatus,
    pub first_login: bool,
}

pub const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        full_name: "María Fernanda Salazar",
        cedula: "0912345678",
        email: "coordinador@dece.edu.ec",
        role: Role::Coordinator,
        status: UserStatus::Active,
        first_login: false,
    },
    DemoUser {
        full_name: "Jorge Luis Mendoza",
        cedula: "0923456789",
        email: "analista@dece.edu.ec",
        role: Role::Analyst,
        status: UserStatus::Active,
        first_login: false,
    },
    DemoUser {
        full_name: "Carla Andrea Villacís",
        cedula: "0934567890",
        email: "profesional@dece.edu.ec",
        role: Role::Professional,
        status: UserStatus::Pending,
        first_login: true,
    },
];

pub const PEF_MODULES: [(&str, &str); 3] = [
    (
        "Módulo 1: Prevención del Embarazo Adolescente",
        "Acompañamiento familiar en la educación sexual integral.",
    ),
    (
        "Módulo 2: Prevención de la Violencia",
        "Detección temprana y rutas de actuación frente a la violencia.",
    ),
    (
        "Módulo 3: Prevención del Uso de Drogas",
        "Factores de protección y comunicación en el hogar.",
    ),
];

const MALE_NAMES: [&str; 12] = [
    "Carlos", "José", "Luis", "Andrés", "Miguel", "Diego", "Javier", "Mateo", "Sebastián",
    "Daniel", "Kevin", "Joel",
];
const FEMALE_NAMES: [&str; 12] = [
    "María", "Ana", "Sofía", "Valentina", "Camila", "Daniela", "Gabriela", "Lucía", "Paula",
    "Fernanda", "Isabel", "Dayana",
];
const SURNAMES: [&str; 16] = [
    "García", "Rodríguez", "Zambrano", "Mendoza", "Cedeño", "Vera", "Moreira", "Castro", "Macías",
    "Torres", "Morales", "Ortiz", "Suárez", "Álava", "Pincay", "Bravo",
];
const STREETS: [&str; 6] = [
    "Av. 9 de Octubre",
    "Av. Quito",
    "Calle Chile",
    "Av. Machala",
    "Calle Rumichaca",
    "Av. del Bombero",
];
const RELATIONSHIPS: [&str; 5] = ["Madre", "Padre", "Abuela", "Tío", "Tutor legal"];
const FOLLOW_UP_NOTES: [&str; 5] = [
    "Entrevista con el estudiante para valorar la situación.",
    "Reunión con el representante legal.",
    "Coordinación con el docente tutor.",
    "Derivación a servicio externo y verificación de asistencia.",
    "Seguimiento del plan de acompañamiento acordado.",
];
const ASSISTED_CLASS_REASONS: [&str; 3] = [
    "Enfermedad catastrófica",
    "Embarazo de alto riesgo",
    "Recuperación post quirúrgica",
];
const APPOINTMENT_REASONS: [&str; 4] = [
    "Seguimiento de caso",
    "Citación por conducta",
    "Orientación vocacional",
    "Entrega de informe",
];
const APPOINTMENT_TIMES: [&str; 6] = ["08:00", "09:00", "10:30", "11:15", "12:00", "13:30"];
const ACTIVITY_TOPICS: [&str; 5] = [
    "Prevención del acoso escolar",
    "Prevención del consumo de drogas",
    "Educación sexual integral",
    "Convivencia armónica",
    "Proyecto de vida",
];
const AUDIENCES: [&str; 3] = ["Estudiantes", "Docentes", "Representantes"];

/// Rows written by each step.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub users: usize,
    pub courses: usize,
    pub teachers: usize,
    pub representatives: usize,
    pub students: usize,
    pub case_files: usize,
    pub follow_ups: usize,
    pub sexual_violence_cases: usize,
    pub pregnancy_cases: usize,
    pub assisted_classes: usize,
    pub appointments: usize,
    pub preventive_activities: usize,
    pub pef_modules: usize,
    pub pef_evaluations: usize,
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date - Days::new(days)
}

fn full_name(rng: &mut StdRng, gender: Gender) -> String {
    let first = match gender {
        Gender::Male => pick(rng, &MALE_NAMES),
        Gender::Female => pick(rng, &FEMALE_NAMES),
    };
    format!("{} {} {}", first, pick(rng, &SURNAMES), pick(rng, &SURNAMES))
}

fn random_gender(rng: &mut StdRng) -> Gender {
    if rng.random_bool(0.5) {
        Gender::Male
    } else {
        Gender::Female
    }
}

fn phone(rng: &mut StdRng) -> String {
    format!("09{:08}", rng.random_range(0..100_000_000u32))
}

fn address(rng: &mut StdRng) -> String {
    format!("{} y {}", pick(rng, &STREETS), pick(rng, &STREETS))
}

/// Populates every table. `today` anchors all generated dates.
#[instrument(skip_all, fields(%today))]
pub async fn run(
    conn: &mut SqliteConnection,
    config: &StoreConfig,
    today: NaiveDate,
) -> Result<SeedSummary, StoreError> {
    let mut rng = match config.seed.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut summary = SeedSummary::default();

    // 1. Categories
    for (name, protected) in CATEGORIES {
        let category = CaseCategory {
            id: None,
            name: name.to_string(),
            protected,
        };
        db::insert(&mut *conn, &category).await?;
    }
    summary.categories = CATEGORIES.len();
    info!(count = summary.categories, "Seeded case categories");

    // 2. Institution
    let institution = Institution {
        id: Some(INSTITUTION_ID),
        name: "Unidad Educativa Fiscal Vicente Rocafuerte".to_string(),
        code: "09H00001".to_string(),
        district: "09D03 Tarqui - Ximena".to_string(),
        authority_name: "Lcdo. Ramón Aguirre Villamar".to_string(),
        address: "Av. Vicente Rocafuerte y Lorenzo de Garaycoa".to_string(),
        phone: "042345678".to_string(),
        email: "dece@vicenterocafuerte.edu.ec".to_string(),
        school_year: format!("{}-{}", today.year(), today.year() + 1),
        logo: None,
    };
    db::insert(&mut *conn, &institution).await?;
    info!("Seeded institution");

    // 3. Users
    let mut user_names = Vec::with_capacity(DEMO_USERS.len());
    for fixture in &DEMO_USERS {
        let registration = Registration {
            full_name: fixture.full_name,
            cedula: fixture.cedula,
            email: fixture.email,
            password: DEMO_PASSWORD,
            role: fixture.role,
        };
        let user = User {
            status: fixture.status,
            first_login: fixture.first_login,
            ..new_user(&registration, config.bcrypt_cost)?
        };
        db::insert(&mut *conn, &user).await?;
        user_names.push(fixture.full_name);
    }
    summary.users = DEMO_USERS.len();
    info!(count = summary.users, "Seeded users");

    // 4. Courses
    let mut courses = Vec::with_capacity(GRADES.len() * PARALLELS.len());
    for grade in GRADES {
        for parallel in PARALLELS {
            let course = Course::new(grade, parallel, SHIFT);
            let id = db::insert(&mut *conn, &course).await?;
            courses.push(Course {
                id: Some(id),
                ..course
            });
        }
    }
    summary.courses = courses.len();
    info!(count = summary.courses, "Seeded courses");

    // 5. Teachers, the first N tutor the first N courses
    let mut teachers = Vec::with_capacity(TEACHER_COUNT);
    let mut tutor_of_course: Vec<Option<i64>> = vec![None; courses.len()];
    for i in 0..TEACHER_COUNT {
        let gender = random_gender(&mut rng);
        let name = full_name(&mut rng, gender);
        let teacher = Teacher {
            id: None,
            email: Some(format!("docente{:02}@vicenterocafuerte.edu.ec", i + 1)),
            full_name: name,
            cedula: format!("0910{:06}", i + 1),
            phone: Some(phone(&mut rng)),
            tutor_course_id: courses.get(i).and_then(|c| c.id),
        };
        let id = db::insert(&mut *conn, &teacher).await?;
        if let Some(slot) = tutor_of_course.get_mut(i) {
            *slot = Some(id);
        }
        teachers.push(Teacher {
            id: Some(id),
            ..teacher
        });
    }
    summary.teachers = teachers.len();
    info!(count = summary.teachers, "Seeded teachers");

    // 6. Representatives
    let mut representatives = Vec::with_capacity(REPRESENTATIVE_COUNT);
    for i in 0..REPRESENTATIVE_COUNT {
        let gender = random_gender(&mut rng);
        let representative = Representative {
            id: None,
            full_name: full_name(&mut rng, gender),
            cedula: format!("0920{:06}", i + 1),
            age: rng.random_range(25..=65),
            address: address(&mut rng),
            phone: phone(&mut rng),
            relationship: Some(pick(&mut rng, &RELATIONSHIPS).to_string()),
        };
        let id = db::insert(&mut *conn, &representative).await?;
        representatives.push(Representative {
            id: Some(id),
            ..representative
        });
    }
    summary.representatives = representatives.len();
    info!(count = summary.representatives, "Seeded representatives");

    // 7. Students
    let mut students = Vec::with_capacity(STUDENT_COUNT);
    for i in 0..STUDENT_COUNT {
        let course_index = rng.random_range(0..courses.len());
        let course = &courses[course_index];
        let grade_offset = GRADES
            .iter()
            .position(|g| *g == course.name)
            .unwrap_or(0) as u64;
        let gender = random_gender(&mut rng);
        let representative = pick(&mut rng, &representatives);
        let age_days = (12 + grade_offset) * 365 + rng.random_range(0..365);

        let student = Student {
            id: None,
            full_name: full_name(&mut rng, gender),
            cedula: format!("0930{:06}", i + 1),
            gender,
            birth_date: days_before(today, age_days),
            course: course.name.clone(),
            parallel: course.parallel.clone(),
            tutor_id: tutor_of_course[course_index],
            representative_id: representative.id.unwrap_or_default(),
            address: Some(representative.address.clone()),
            special_condition: None,
            special_condition_attachment: None,
        };
        let id = db::insert(&mut *conn, &student).await?;
        students.push(Student {
            id: Some(id),
            ..student
        });
    }
    summary.students = students.len();
    info!(count = summary.students, "Seeded students");

    // 8-10. Case files, their follow-ups and the sexual-violence protocol rows
    for i in 0..CASE_COUNT {
        let student = pick(&mut rng, &students);
        let student_id = student.id.unwrap_or_default();
        // The first case always follows the sexual-violence protocol so the
        // protocol tables are populated in every demo store.
        let category = if i == 0 {
            SEXUAL_VIOLENCE_CATEGORY
        } else {
            pick(&mut rng, &CATEGORIES).0
        };
        let opening_date = days_before(today, rng.random_range(0..=OPENING_WINDOW_DAYS));

        let case = CaseFile {
            id: None,
            student_id,
            code: case_code::seed_code(category, &student.full_name, i),
            category: category.to_string(),
            priority: *pick(&mut rng, &Priority::ALL),
            status: *pick(&mut rng, &CaseStatus::ALL),
            opening_date,
            next_follow_up_date: CaseFile::due_date_from(opening_date),
            description: format!("Caso de {} reportado por el docente tutor.", category.to_lowercase()),
            observations: None,
            attachments: Vec::new(),
        };
        let case_id = db::insert(&mut *conn, &case).await?;

        let span_days = (today - opening_date).num_days().max(0) as u64;
        for _ in 0..rng.random_range(1..=5) {
            let follow_up = FollowUp {
                id: None,
                case_id,
                date: opening_date + Days::new(rng.random_range(0..=span_days)),
                description: pick(&mut rng, &FOLLOW_UP_NOTES).to_string(),
                responsible: pick(&mut rng, &user_names).to_string(),
                effective: Some(rng.random_bool(0.7)),
                participants: vec![ParticipantType::Student, ParticipantType::Representative],
            };
            db::insert(&mut *conn, &follow_up).await?;
            summary.follow_ups += 1;
        }

        if category == SEXUAL_VIOLENCE_CATEGORY {
            seed_sexual_violence_protocol(&mut *conn, &mut rng, case_id, &case, student, &user_names)
                .await?;
            summary.follow_ups += 1;
            summary.sexual_violence_cases += 1;
        }
    }
    summary.case_files = CASE_COUNT;
    info!(
        cases = summary.case_files,
        follow_ups = summary.follow_ups,
        sexual_violence = summary.sexual_violence_cases,
        "Seeded case files"
    );

    // 11. Pregnancy cases
    let female_students: Vec<&Student> = students
        .iter()
        .filter(|s| s.gender == Gender::Female)
        .collect();
    for student in female_students.iter().take(MAX_PREGNANCY_CASES) {
        let condition = if rng.random_bool(0.6) {
            PregnancyCondition::Pregnancy
        } else {
            PregnancyCondition::Maternity
        };
        let mut pregnancy = PregnancyCase::new(
            student.id.unwrap_or_default(),
            &student.full_name,
            condition,
        );
        match condition {
            PregnancyCondition::Pregnancy => {
                pregnancy.set_pregnancy_start(days_before(today, rng.random_range(30..=200)));
            }
            _ => {
                pregnancy.birth_date = Some(days_before(today, rng.random_range(10..=120)));
            }
        }
        pregnancy.attends_prenatal_control = rng.random_bool(0.8);
        pregnancy.has_family_support = rng.random_bool(0.7);
        pregnancy.continues_studies = rng.random_bool(0.9);
        db::insert(&mut *conn, &pregnancy).await?;
        summary.pregnancy_cases += 1;
    }
    info!(count = summary.pregnancy_cases, "Seeded pregnancy cases");

    // 12. Remaining registers
    for i in 0..ASSISTED_CLASS_COUNT {
        let student = pick(&mut rng, &students);
        let start_date = days_before(today, rng.random_range(0..=60));
        let assisted = AssistedClass {
            id: None,
            student_id: student.id.unwrap_or_default(),
            student_name: student.full_name.clone(),
            reason: pick(&mut rng, &ASSISTED_CLASS_REASONS).to_string(),
            start_date,
            end_date: start_date + Days::new(rng.random_range(30..=90)),
            approved: rng.random_bool(0.8),
            document_reference: Some(format!("MINEDUC-ZEE-{:04}", i + 1)),
        };
        db::insert(&mut *conn, &assisted).await?;
    }
    summary.assisted_classes = ASSISTED_CLASS_COUNT;

    for _ in 0..APPOINTMENT_COUNT {
        let attendee_type = *pick(
            &mut rng,
            &[
                AttendeeType::Student,
                AttendeeType::Representative,
                AttendeeType::Teacher,
            ],
        );
        let (attendee_id, attendee_name) = match attendee_type {
            AttendeeType::Student => {
                let s = pick(&mut rng, &students);
                (s.id, s.full_name.clone())
            }
            AttendeeType::Representative => {
                let r = pick(&mut rng, &representatives);
                (r.id, r.full_name.clone())
            }
            AttendeeType::Teacher => {
                let t = pick(&mut rng, &teachers);
                (t.id, t.full_name.clone())
            }
        };
        let offset: i64 = rng.random_range(-30..=30);
        let date = if offset < 0 {
            days_before(today, offset.unsigned_abs())
        } else {
            today + Days::new(offset as u64)
        };
        let status = if date >= today {
            AppointmentStatus::Scheduled
        } else if rng.random_bool(0.8) {
            AppointmentStatus::Completed
        } else {
            AppointmentStatus::Cancelled
        };

        let appointment = Appointment {
            id: None,
            date,
            time: pick(&mut rng, &APPOINTMENT_TIMES).to_string(),
            attendee_type,
            attendee_id: attendee_id.unwrap_or_default(),
            attendee_name,
            reason: pick(&mut rng, &APPOINTMENT_REASONS).to_string(),
            status,
            notes: None,
        };
        db::insert(&mut *conn, &appointment).await?;
    }
    summary.appointments = APPOINTMENT_COUNT;

    for _ in 0..PREVENTIVE_ACTIVITY_COUNT {
        let topic = pick(&mut rng, &ACTIVITY_TOPICS);
        let activity = PreventiveActivity {
            id: None,
            date: days_before(today, rng.random_range(0..=300)),
            title: format!("Taller: {}", topic),
            topic: topic.to_string(),
            audience: pick(&mut rng, &AUDIENCES).to_string(),
            participants: rng.random_range(10..=120),
            responsible: pick(&mut rng, &user_names).to_string(),
            description: None,
        };
        db::insert(&mut *conn, &activity).await?;
    }
    summary.preventive_activities = PREVENTIVE_ACTIVITY_COUNT;

    for (name, description) in PEF_MODULES {
        let module = PefModule {
            id: None,
            name: name.to_string(),
            description: description.to_string(),
        };
        db::insert(&mut *conn, &module).await?;
    }
    summary.pef_modules = PEF_MODULES.len();

    for teacher in teachers.iter().take(PEF_EVALUATION_COUNT) {
        let mut criteria = [false; PEF_CRITERIA];
        for met in criteria.iter_mut() {
            *met = rng.random_bool(0.75);
        }
        let modality = if rng.random_bool(0.5) {
            Modality::InPerson
        } else {
            Modality::Remote
        };
        let evaluation = PefEvaluation::evaluate(
            teacher.id.unwrap_or_default(),
            &teacher.full_name,
            pick(&mut rng, &PEF_MODULES).0,
            Some(modality),
            criteria,
            days_before(today, rng.random_range(0..=180)),
        );
        db::insert(&mut *conn, &evaluation).await?;
        summary.pef_evaluations += 1;
    }
    info!(
        assisted_classes = summary.assisted_classes,
        appointments = summary.appointments,
        activities = summary.preventive_activities,
        pef_evaluations = summary.pef_evaluations,
        "Seeded registers"
    );

    Ok(summary)
}

/// Details, victim, protocol follow-up and DECE form for one seeded case.
async fn seed_sexual_violence_protocol(
    conn: &mut SqliteConnection,
    rng: &mut StdRng,
    case_id: i64,
    case: &CaseFile,
    student: &Student,
    user_names: &[&str],
) -> Result<(), StoreError> {
    let report_date = case.opening_date;

    let details = SexualViolenceCaseDetails {
        id: None,
        case_file_id: case_id,
        report_date,
        event_date: Some(days_before(report_date, rng.random_range(1..=15))),
        event_location: "Domicilio".to_string(),
        occurred_in_institution: false,
        aggressor_relationship: "Familiar".to_string(),
        aggressor_in_institution: false,
        aggressor_name: None,
        aggressor_age: None,
        reported_to_prosecutor: true,
        prosecutor_report_number: Some(format!("FGE-{:06}", case_id)),
        prosecutor_report_date: Some(report_date),
        district_notified: true,
        district_notification_date: Some(report_date),
        health_referral: true,
        psychological_referral: true,
        protection_measures_requested: true,
        protection_measures: Some("Boleta de auxilio".to_string()),
        aggressor_separated: true,
        administrative_process: None,
        observations: None,
    };
    let details_id = db::insert(&mut *conn, &details).await?;

    let victim = SexualViolenceVictim {
        id: None,
        details_id,
        student_id: student.id,
        full_name: student.full_name.clone(),
        cedula: student.cedula.clone(),
        age: report_date.years_since(student.birth_date).unwrap_or(0),
        gender: student.gender,
        course: student.course.clone(),
        parallel: student.parallel.clone(),
        has_disability: false,
        ethnicity: Some("Mestiza".to_string()),
        nationality: "Ecuatoriana".to_string(),
    };
    db::insert(&mut *conn, &victim).await?;

    let follow_up = FollowUp {
        id: None,
        case_id,
        date: report_date,
        description: "Seguimiento DECE del protocolo de violencia sexual.".to_string(),
        responsible: pick(rng, user_names).to_string(),
        effective: None,
        participants: vec![ParticipantType::Student, ParticipantType::ExternalInstitution],
    };
    let follow_up_id = db::insert(&mut *conn, &follow_up).await?;

    let form = DeceFollowUpForm {
        id: None,
        follow_up_id,
        case_file_id: case_id,
        victim_attending_classes: true,
        receiving_psychological_care: true,
        receiving_medical_care: true,
        family_informed: true,
        family_supportive: rng.random_bool(0.7),
        protection_measures_active: true,
        aggressor_separated: true,
        complaint_filed: true,
        district_informed: true,
        risk_persists: rng.random_bool(0.3),
        revictimization_avoided: true,
        requires_referral: false,
        emotional_state: "Estable, con episodios de ansiedad".to_string(),
        academic_situation: "Asiste regularmente a clases".to_string(),
        family_situation: "Cuenta con apoyo de la madre".to_string(),
        actions_taken: "Derivación a atención psicológica externa".to_string(),
        agreements: "Reunión quincenal con la representante".to_string(),
        referral_institution: "Centro de Salud Tipo C".to_string(),
        protection_measure_details: "Boleta de auxilio vigente".to_string(),
        complaint_status: "En investigación previa".to_string(),
        risk_details: "Sin contacto con el agresor".to_string(),
        next_actions: "Visita domiciliaria".to_string(),
        observations: "Ninguna".to_string(),
    };
    db::insert(&mut *conn, &form).await?;

    Ok(())
}
