#[cfg(test)]
mod tests {
    use crate::case_code::{institution_initials, person_initials};
    use crate::cases::{
        NewCase, case_overview, delete_case, delete_category, institution, open_case,
        open_sexual_violence_case, record_dece_follow_up, record_follow_up, save_institution,
        save_interview,
    };
    use crate::database::Table;
    use crate::db::{self, Key};
    use crate::error::StoreError;
    use crate::models::{
        CaseCategory, CaseFile, CaseStatus, DeceFollowUpForm, FollowUp, Gender, InterviewType,
        ParticipantType, Priority, PregnancyCase, PregnancyCondition, PsychosocialInterview,
        SEXUAL_VIOLENCE_CATEGORY, SexualViolenceCaseDetails, SexualViolenceVictim, Student,
    };
    use crate::test::utils::test_store::{TestStore, TestStoreBuilder, date};
    use std::collections::BTreeMap;

    const INSTITUTION: &str = "Unidad Educativa Fiscal Vicente Rocafuerte";
    const PREGNANCY_CATEGORY: &str = "Embarazo/ maternidad/ paternidad adolescente";

    async fn school() -> TestStore {
        TestStoreBuilder::new()
            .institution(INSTITUTION)
            .category(PREGNANCY_CATEGORY, false)
            .category(SEXUAL_VIOLENCE_CATEGORY, true)
            .category("Acoso Escolar", false)
            .representative("Rosa Pincay", "0922222222")
            .student("Ana Torres", "0933333333", Gender::Female, "OCTAVO EGB", "A", None)
            .student("Pedro Vera", "0933333334", Gender::Male, "OCTAVO EGB", "A", None)
            .build()
            .await
            .unwrap()
    }

    fn new_case(student_id: i64, category: &str) -> NewCase {
        NewCase {
            student_id,
            category: category.to_string(),
            priority: Priority::High,
            opening_date: date(2024, 3, 7),
            description: "Reporte del docente tutor".to_string(),
        }
    }

    fn follow_up(case_id: i64, on: chrono::NaiveDate) -> FollowUp {
        FollowUp {
            id: None,
            case_id,
            date: on,
            description: "Entrevista con la estudiante".to_string(),
            responsible: "Carla Villacís".to_string(),
            effective: Some(true),
            participants: vec![ParticipantType::Student],
        }
    }

    fn details() -> SexualViolenceCaseDetails {
        SexualViolenceCaseDetails {
            id: None,
            case_file_id: 0,
            report_date: date(2024, 3, 7),
            event_date: Some(date(2024, 3, 1)),
            event_location: "Domicilio".to_string(),
            occurred_in_institution: false,
            aggressor_relationship: "Familiar".to_string(),
            aggressor_in_institution: false,
            aggressor_name: None,
            aggressor_age: None,
            reported_to_prosecutor: true,
            prosecutor_report_number: Some("FGE-000123".to_string()),
            prosecutor_report_date: Some(date(2024, 3, 7)),
            district_notified: true,
            district_notification_date: Some(date(2024, 3, 8)),
            health_referral: true,
            psychological_referral: true,
            protection_measures_requested: false,
            protection_measures: None,
            aggressor_separated: false,
            administrative_process: None,
            observations: None,
        }
    }

    fn victim(student: &Student) -> SexualViolenceVictim {
        SexualViolenceVictim {
            id: None,
            details_id: 0,
            student_id: student.id,
            full_name: student.full_name.clone(),
            cedula: student.cedula.clone(),
            age: 13,
            gender: student.gender,
            course: student.course.clone(),
            parallel: student.parallel.clone(),
            has_disability: false,
            ethnicity: None,
            nationality: "Ecuatoriana".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_case_builds_code_and_is_found_by_student() {
        let test_store = school().await;
        let pool = test_store.pool();
        let student_id = test_store.student_id("0933333333");

        let case = open_case(pool, &new_case(student_id, PREGNANCY_CATEGORY))
            .await
            .unwrap();

        let prefix = format!(
            "{}-{}-20240307-",
            institution_initials(INSTITUTION),
            person_initials("Ana Torres")
        );
        assert!(case.code.starts_with(&prefix), "unexpected code {}", case.code);
        assert_eq!(case.code.len(), prefix.len() + 4);
        assert!(case.code.starts_with("UEFVR-AT-"));
        assert_eq!(case.status, CaseStatus::Open);
        assert_eq!(case.next_follow_up_date, date(2024, 4, 6));

        let found = db::cases_for_student(pool, student_id).await.unwrap();
        assert_eq!(found, vec![case]);
    }

    #[tokio::test]
    async fn test_open_case_for_missing_student_fails() {
        let test_store = school().await;

        let err = open_case(test_store.pool(), &new_case(999, "Acoso Escolar"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(db::count(test_store.pool(), Table::CaseFiles).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_follow_up_moves_due_date_and_status() {
        let test_store = school().await;
        let pool = test_store.pool();
        let case = open_case(pool, &new_case(test_store.student_id("0933333333"), "Acoso Escolar"))
            .await
            .unwrap();
        let case_id = case.id.unwrap();

        record_follow_up(pool, &follow_up(case_id, date(2024, 3, 20))).await.unwrap();

        let updated: CaseFile = db::require(pool, case_id).await.unwrap();
        assert_eq!(updated.status, CaseStatus::InProgress);
        assert_eq!(updated.next_follow_up_date, date(2024, 4, 19));
        assert_eq!(db::follow_ups_for_case(pool, case_id).await.unwrap().len(), 1);

        let in_progress =
            db::cases_by_category_and_status(pool, "Acoso Escolar", CaseStatus::InProgress)
                .await
                .unwrap();
        assert_eq!(in_progress.len(), 1);
    }

    #[tokio::test]
    async fn test_follow_up_for_missing_case_is_rejected() {
        let test_store = school().await;
        let pool = test_store.pool();

        let err = record_follow_up(pool, &follow_up(42, date(2024, 3, 20)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TransactionAborted { .. }));
        assert_eq!(db::count(pool, Table::FollowUps).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sexual_violence_case_written_together() {
        let test_store = school().await;
        let pool = test_store.pool();
        let student: Student = db::require(pool, test_store.student_id("0933333333"))
            .await
            .unwrap();

        let ids = open_sexual_violence_case(
            pool,
            &new_case(student.id.unwrap(), "Acoso Escolar"),
            &details(),
            &[victim(&student)],
        )
        .await
        .unwrap();

        let case: CaseFile = db::require(pool, ids.case_file_id).await.unwrap();
        assert_eq!(case.category, SEXUAL_VIOLENCE_CATEGORY);

        let overview = case_overview(pool, ids.case_file_id).await.unwrap();
        let stored_details = overview.sexual_violence.unwrap();
        assert_eq!(stored_details.id, Some(ids.details_id));
        assert_eq!(stored_details.case_file_id, ids.case_file_id);
        assert_eq!(overview.victims.len(), 1);
        assert_eq!(overview.victims[0].details_id, ids.details_id);

        let (follow_up_id, form_id) = record_dece_follow_up(
            pool,
            &follow_up(ids.case_file_id, date(2024, 3, 21)),
            &DeceFollowUpForm {
                receiving_psychological_care: true,
                emotional_state: "Estable".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let form: DeceFollowUpForm = db::require(pool, form_id).await.unwrap();
        assert_eq!(form.follow_up_id, follow_up_id);
        assert_eq!(form.case_file_id, ids.case_file_id);
    }

    #[tokio::test]
    async fn test_sexual_violence_case_rolls_back_on_invalid_victim() {
        let test_store = school().await;
        let pool = test_store.pool();
        let student: Student = db::require(pool, test_store.student_id("0933333333"))
            .await
            .unwrap();

        // An invalid victim fails validation after the case and details rows
        // were already written inside the transaction.
        let mut bad_victim = victim(&student);
        bad_victim.full_name = String::new();

        let err = open_sexual_violence_case(
            pool,
            &new_case(student.id.unwrap(), SEXUAL_VIOLENCE_CATEGORY),
            &details(),
            &[victim(&student), bad_victim],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::TransactionAborted { operation: "open_sexual_violence_case", .. }));

        assert_eq!(db::count(pool, Table::CaseFiles).await.unwrap(), 0);
        assert_eq!(db::count(pool, Table::SexualViolenceCases).await.unwrap(), 0);
        assert_eq!(db::count(pool, Table::SexualViolenceVictims).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_interview_replaces_same_case_and_type() {
        let test_store = school().await;
        let pool = test_store.pool();
        let case = open_case(pool, &new_case(test_store.student_id("0933333333"), "Acoso Escolar"))
            .await
            .unwrap();

        let mut answers = BTreeMap::new();
        answers.insert(
            "familia".to_string(),
            BTreeMap::from([("convive".to_string(), "Madre".to_string())]),
        );
        let interview = PsychosocialInterview {
            id: None,
            case_file_id: case.id.unwrap(),
            interview_type: InterviewType::Student,
            date: date(2024, 3, 10),
            interviewer: "Carla Villacís".to_string(),
            answers,
        };

        let first_id = save_interview(pool, &interview).await.unwrap();

        let mut revised = interview.clone();
        revised.interviewer = "Jorge Mendoza".to_string();
        let second_id = save_interview(pool, &revised).await.unwrap();

        assert_eq!(first_id, second_id);
        assert_eq!(db::count(pool, Table::PsychosocialInterviews).await.unwrap(), 1);
        let stored = db::interview_for(pool, case.id.unwrap(), InterviewType::Student)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.interviewer, "Jorge Mendoza");
        assert_eq!(stored.answers["familia"]["convive"], "Madre");

        let teacher_interview = PsychosocialInterview {
            interview_type: InterviewType::Teacher,
            ..interview
        };
        save_interview(pool, &teacher_interview).await.unwrap();
        assert_eq!(db::count(pool, Table::PsychosocialInterviews).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_overview_tolerates_deleted_student() {
        let test_store = school().await;
        let pool = test_store.pool();
        let student_id = test_store.student_id("0933333334");
        let case = open_case(pool, &new_case(student_id, "Acoso Escolar")).await.unwrap();

        assert!(db::delete::<Student, _>(pool, student_id).await.unwrap());

        let overview = case_overview(pool, case.id.unwrap()).await.unwrap();
        assert!(overview.student.is_none());
        assert_eq!(overview.case.student_id, student_id);
    }

    #[tokio::test]
    async fn test_delete_case_removes_dependents() {
        let test_store = school().await;
        let pool = test_store.pool();
        let student: Student = db::require(pool, test_store.student_id("0933333333"))
            .await
            .unwrap();
        let ids = open_sexual_violence_case(
            pool,
            &new_case(student.id.unwrap(), SEXUAL_VIOLENCE_CATEGORY),
            &details(),
            &[victim(&student)],
        )
        .await
        .unwrap();
        record_dece_follow_up(
            pool,
            &follow_up(ids.case_file_id, date(2024, 3, 21)),
            &DeceFollowUpForm::default(),
        )
        .await
        .unwrap();

        let other = open_case(pool, &new_case(test_store.student_id("0933333334"), "Acoso Escolar"))
            .await
            .unwrap();
        record_follow_up(pool, &follow_up(other.id.unwrap(), date(2024, 3, 22)))
            .await
            .unwrap();

        assert!(delete_case(pool, ids.case_file_id).await.unwrap());

        for table in [
            Table::SexualViolenceCases,
            Table::SexualViolenceVictims,
            Table::DeceFollowUpForms,
        ] {
            assert_eq!(db::count(pool, table).await.unwrap(), 0, "{}", table);
        }
        assert_eq!(db::count(pool, Table::CaseFiles).await.unwrap(), 1);
        let remaining: Vec<FollowUp> = db::all(pool).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].case_id, other.id.unwrap());

        assert!(!delete_case(pool, ids.case_file_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_protected_category_in_use_cannot_be_deleted() {
        let test_store = school().await;
        let pool = test_store.pool();
        let protected_id = test_store.categories[SEXUAL_VIOLENCE_CATEGORY];
        let open_id = test_store.categories["Acoso Escolar"];

        // Unused protected categories can go
        let unused = CaseCategory {
            id: None,
            name: "Autolesiones".to_string(),
            protected: true,
        };
        let unused_id = db::insert(pool, &unused).await.unwrap();
        delete_category(pool, unused_id).await.unwrap();

        open_case(pool, &new_case(test_store.student_id("0933333333"), SEXUAL_VIOLENCE_CATEGORY))
            .await
            .unwrap();
        open_case(pool, &new_case(test_store.student_id("0933333334"), "Acoso Escolar"))
            .await
            .unwrap();

        let err = delete_category(pool, protected_id).await.unwrap_err();
        assert!(matches!(err, StoreError::Protected(_)));
        assert!(db::get::<CaseCategory, _>(pool, protected_id).await.unwrap().is_some());

        delete_category(pool, open_id).await.unwrap();
        assert!(db::get::<CaseCategory, _>(pool, open_id).await.unwrap().is_none());

        // Case files keep the category name they were written with
        let cases: Vec<CaseFile> = db::find_by(pool, "category", Key::from("Acoso Escolar"))
            .await
            .unwrap();
        assert_eq!(cases.len(), 1);
    }

    #[tokio::test]
    async fn test_institution_upsert_keeps_single_row() {
        let test_store = school().await;
        let pool = test_store.pool();

        let mut current = institution(pool).await.unwrap().unwrap();
        current.id = None;
        current.name = "Colegio Fiscal Guayaquil".to_string();
        save_institution(pool, &current).await.unwrap();

        let stored = institution(pool).await.unwrap().unwrap();
        assert_eq!(stored.id, Some(1));
        assert_eq!(stored.name, "Colegio Fiscal Guayaquil");
        assert_eq!(db::count(pool, Table::Institution).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pregnancy_due_date_is_280_days_after_start() {
        let test_store = school().await;
        let pool = test_store.pool();
        let student_id = test_store.student_id("0933333333");

        let mut pregnancy = PregnancyCase::new(student_id, "Ana Torres", PregnancyCondition::Pregnancy);
        pregnancy.set_pregnancy_start(date(2024, 1, 1));
        let id = db::insert(pool, &pregnancy).await.unwrap();

        let stored: PregnancyCase = db::require(pool, id).await.unwrap();
        assert_eq!(stored.estimated_due_date, Some(date(2024, 10, 7)));
    }
}
