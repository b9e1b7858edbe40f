//! Case-file operations that span more than one record.

use crate::case_code;
use crate::db::{self, Key};
use crate::error::StoreError;
use crate::models::{
    CaseCategory, CaseFile, CaseStatus, DeceFollowUpForm, FollowUp, INSTITUTION_ID, Institution,
    Priority, PsychosocialInterview, SEXUAL_VIOLENCE_CATEGORY, SexualViolenceCaseDetails,
    SexualViolenceVictim, Student,
};
use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, instrument, warn};

/// Input for a new case file. Code, status and due date are derived.
#[derive(Debug, Clone)]
pub struct NewCase {
    pub student_id: i64,
    pub category: String,
    pub priority: Priority,
    pub opening_date: NaiveDate,
    pub description: String,
}

/// A case file with everything hanging off it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOverview {
    pub case: CaseFile,
    /// `None` when the student has since been deleted.
    pub student: Option<Student>,
    pub follow_ups: Vec<FollowUp>,
    pub interviews: Vec<PsychosocialInterview>,
    pub sexual_violence: Option<SexualViolenceCaseDetails>,
    pub victims: Vec<SexualViolenceVictim>,
}

pub async fn institution(pool: &SqlitePool) -> Result<Option<Institution>, StoreError> {
    db::get(pool, INSTITUTION_ID).await
}

/// Writes the institution under its fixed id, replacing any previous row.
#[instrument(skip_all, fields(name = %institution.name))]
pub async fn save_institution(
    pool: &SqlitePool,
    institution: &Institution,
) -> Result<(), StoreError> {
    let institution = Institution {
        id: Some(INSTITUTION_ID),
        ..institution.clone()
    };
    db::put(pool, &institution).await?;
    Ok(())
}

async fn build_case(
    conn: &mut SqliteConnection,
    new_case: &NewCase,
    ticks: i64,
) -> Result<CaseFile, StoreError> {
    let student: Student = db::require(&mut *conn, new_case.student_id).await?;
    let institution_name = db::get::<Institution, _>(&mut *conn, INSTITUTION_ID)
        .await?
        .map(|i| i.name)
        .unwrap_or_default();

    Ok(CaseFile {
        id: None,
        student_id: new_case.student_id,
        code: case_code::generate(
            &institution_name,
            &student.full_name,
            new_case.opening_date,
            ticks,
        ),
        category: new_case.category.clone(),
        priority: new_case.priority,
        status: CaseStatus::Open,
        opening_date: new_case.opening_date,
        next_follow_up_date: CaseFile::due_date_from(new_case.opening_date),
        description: new_case.description.clone(),
        observations: None,
        attachments: Vec::new(),
    })
}

/// Opens a case for an existing student. A code collision surfaces as
/// [`StoreError::Duplicate`].
#[instrument(skip_all, fields(student_id = new_case.student_id, category = %new_case.category))]
pub async fn open_case(pool: &SqlitePool, new_case: &NewCase) -> Result<CaseFile, StoreError> {
    let mut conn = pool.acquire().await?;
    let mut case = build_case(&mut conn, new_case, Utc::now().timestamp_millis()).await?;
    let id = db::insert(&mut *conn, &case).await?;
    case.id = Some(id);

    info!(case_id = id, code = %case.code, "Opened case file");
    Ok(case)
}

async fn insert_follow_up(
    conn: &mut SqliteConnection,
    follow_up: &FollowUp,
) -> Result<i64, StoreError> {
    let mut case: CaseFile = db::require(&mut *conn, follow_up.case_id).await?;
    let id = db::insert(&mut *conn, follow_up).await?;

    case.next_follow_up_date = CaseFile::due_date_from(follow_up.date);
    if case.status == CaseStatus::Open {
        case.status = CaseStatus::InProgress;
    }
    db::update(&mut *conn, &case).await?;
    Ok(id)
}

/// Adds a follow-up to an existing case and moves the case's next due date
/// forward from the follow-up date. An open case moves to in-progress.
#[instrument(skip_all, fields(case_id = follow_up.case_id))]
pub async fn record_follow_up(pool: &SqlitePool, follow_up: &FollowUp) -> Result<i64, StoreError> {
    let mut tx = pool.begin().await?;
    match insert_follow_up(&mut tx, follow_up).await {
        Ok(id) => {
            tx.commit().await?;
            info!(follow_up_id = id, "Recorded follow-up");
            Ok(id)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(StoreError::aborted("record_follow_up", err))
        }
    }
}

/// Ids written by [`open_sexual_violence_case`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SexualViolenceCaseIds {
    pub case_file_id: i64,
    pub details_id: i64,
    pub victim_ids: Vec<i64>,
}

/// Opens a sexual-violence case file together with its details and victims.
/// Either all rows are written or none are.
#[instrument(skip_all, fields(student_id = new_case.student_id, victims = victims.len()))]
pub async fn open_sexual_violence_case(
    pool: &SqlitePool,
    new_case: &NewCase,
    details: &SexualViolenceCaseDetails,
    victims: &[SexualViolenceVictim],
) -> Result<SexualViolenceCaseIds, StoreError> {
    let ticks = Utc::now().timestamp_millis();
    let mut tx = pool.begin().await?;

    let result = async {
        let new_case = NewCase {
            category: SEXUAL_VIOLENCE_CATEGORY.to_string(),
            ..new_case.clone()
        };
        let case = build_case(&mut tx, &new_case, ticks).await?;
        let case_file_id = db::insert(&mut *tx, &case).await?;

        let details = SexualViolenceCaseDetails {
            id: None,
            case_file_id,
            ..details.clone()
        };
        let details_id = db::insert(&mut *tx, &details).await?;

        let mut victim_ids = Vec::with_capacity(victims.len());
        for victim in victims {
            let victim = SexualViolenceVictim {
                id: None,
                details_id,
                ..victim.clone()
            };
            victim_ids.push(db::insert(&mut *tx, &victim).await?);
        }

        Ok::<_, StoreError>(SexualViolenceCaseIds {
            case_file_id,
            details_id,
            victim_ids,
        })
    }
    .await;

    match result {
        Ok(ids) => {
            tx.commit().await?;
            info!(case_id = ids.case_file_id, "Opened sexual-violence case");
            Ok(ids)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(StoreError::aborted("open_sexual_violence_case", err))
        }
    }
}

/// Records a follow-up and its DECE questionnaire in one transaction.
/// Returns `(follow_up_id, form_id)`.
#[instrument(skip_all, fields(case_id = follow_up.case_id))]
pub async fn record_dece_follow_up(
    pool: &SqlitePool,
    follow_up: &FollowUp,
    form: &DeceFollowUpForm,
) -> Result<(i64, i64), StoreError> {
    let mut tx = pool.begin().await?;

    let result = async {
        let follow_up_id = insert_follow_up(&mut tx, follow_up).await?;
        let form = DeceFollowUpForm {
            id: None,
            follow_up_id,
            case_file_id: follow_up.case_id,
            ..form.clone()
        };
        let form_id = db::insert(&mut *tx, &form).await?;
        Ok::<_, StoreError>((follow_up_id, form_id))
    }
    .await;

    match result {
        Ok(ids) => {
            tx.commit().await?;
            Ok(ids)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(StoreError::aborted("record_dece_follow_up", err))
        }
    }
}

/// Creates the interview, or replaces the existing one for the same case
/// file and interview type. Returns the stored id.
#[instrument(skip_all, fields(case_id = interview.case_file_id, kind = interview.interview_type.as_str()))]
pub async fn save_interview(
    pool: &SqlitePool,
    interview: &PsychosocialInterview,
) -> Result<i64, StoreError> {
    let existing = db::interview_for(pool, interview.case_file_id, interview.interview_type).await?;

    match existing.and_then(|e| e.id) {
        Some(id) => {
            let interview = PsychosocialInterview {
                id: Some(id),
                ..interview.clone()
            };
            db::update(pool, &interview).await?;
            info!(interview_id = id, "Replaced interview");
            Ok(id)
        }
        None => {
            let interview = PsychosocialInterview {
                id: None,
                ..interview.clone()
            };
            db::insert(pool, &interview).await
        }
    }
}

pub async fn case_overview(pool: &SqlitePool, case_id: i64) -> Result<CaseOverview, StoreError> {
    let case: CaseFile = db::require(pool, case_id).await?;

    let student = db::get::<Student, _>(pool, case.student_id).await?;
    if student.is_none() {
        warn!(case_id, student_id = case.student_id, "Case refers to a missing student");
    }

    let follow_ups = db::follow_ups_for_case(pool, case_id).await?;
    let interviews = db::find_by(pool, "caseFileId", Key::from(case_id)).await?;
    let sexual_violence: Option<SexualViolenceCaseDetails> =
        db::find_one_by(pool, "caseFileId", Key::from(case_id)).await?;
    let victims = match sexual_violence.as_ref().and_then(|d| d.id) {
        Some(details_id) => db::find_by(pool, "detailsId", Key::from(details_id)).await?,
        None => Vec::new(),
    };

    Ok(CaseOverview {
        case,
        student,
        follow_ups,
        interviews,
        sexual_violence,
        victims,
    })
}

async fn delete_case_rows(conn: &mut SqliteConnection, case_id: i64) -> Result<bool, StoreError> {
    let details: Vec<SexualViolenceCaseDetails> =
        db::find_by(&mut *conn, "caseFileId", Key::from(case_id)).await?;
    for detail in &details {
        if let Some(details_id) = detail.id {
            db::delete_by::<SexualViolenceVictim, _>(&mut *conn, "detailsId", Key::from(details_id))
                .await?;
        }
    }
    db::delete_by::<SexualViolenceCaseDetails, _>(&mut *conn, "caseFileId", Key::from(case_id))
        .await?;
    db::delete_by::<DeceFollowUpForm, _>(&mut *conn, "caseFileId", Key::from(case_id)).await?;
    db::delete_by::<FollowUp, _>(&mut *conn, "caseId", Key::from(case_id)).await?;
    db::delete_by::<PsychosocialInterview, _>(&mut *conn, "caseFileId", Key::from(case_id))
        .await?;

    db::delete::<CaseFile, _>(&mut *conn, case_id).await
}

/// Deletes a case file with its follow-ups, DECE forms, interviews and
/// sexual-violence rows. Returns whether the case existed.
#[instrument(skip(pool))]
pub async fn delete_case(pool: &SqlitePool, case_id: i64) -> Result<bool, StoreError> {
    let mut tx = pool.begin().await?;
    match delete_case_rows(&mut tx, case_id).await {
        Ok(existed) => {
            tx.commit().await?;
            Ok(existed)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(StoreError::aborted("delete_case", err))
        }
    }
}

/// Deletes a category. A protected category still used by any case file is
/// refused with [`StoreError::Protected`].
#[instrument(skip(pool))]
pub async fn delete_category(pool: &SqlitePool, category_id: i64) -> Result<(), StoreError> {
    let category: CaseCategory = db::require(pool, category_id).await?;

    if category.protected {
        let in_use: Option<CaseFile> =
            db::find_one_by(pool, "category", Key::from(category.name.as_str())).await?;
        if in_use.is_some() {
            return Err(StoreError::Protected(format!(
                "Category '{}' is protected and still used by case files",
                category.name
            )));
        }
    }

    db::delete::<CaseCategory, _>(pool, category_id).await?;
    Ok(())
}
