use crate::database::Table;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Days between a case's opening and its first follow-up due date.
pub const FOLLOW_UP_INTERVAL_DAYS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    /// Base64 file contents.
    pub data: String,
    pub uploaded_on: NaiveDate,
}

impl Attachment {
    pub fn new(file_name: &str, mime_type: &str, data: &str, uploaded_on: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            data: data.to_string(),
            uploaded_on,
        }
    }
}

/// Protected categories cover sensitive topics and cannot be deleted while
/// any case file uses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CaseCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1))]
    pub name: String,
    pub protected: bool,
}

impl_record!(CaseCategory, Table::CaseCategories);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "Baja")]
    Low,
    #[serde(rename = "Media")]
    Medium,
    #[serde(rename = "Alta")]
    High,
    #[serde(rename = "Crítica")]
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    #[serde(rename = "Abierto")]
    Open,
    #[serde(rename = "En Seguimiento")]
    InProgress,
    #[serde(rename = "Cerrado")]
    Closed,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 3] = [CaseStatus::Open, CaseStatus::InProgress, CaseStatus::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "Abierto",
            CaseStatus::InProgress => "En Seguimiento",
            CaseStatus::Closed => "Cerrado",
        }
    }
}

/// `category` holds the category name as written, so renaming a category
/// leaves existing case files on the old name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CaseFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub student_id: i64,
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub category: String,
    pub priority: Priority,
    pub status: CaseStatus,
    pub opening_date: NaiveDate,
    pub next_follow_up_date: NaiveDate,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl_record!(CaseFile, Table::CaseFiles);

impl CaseFile {
    pub fn due_date_from(opening_date: NaiveDate) -> NaiveDate {
        opening_date + Days::new(FOLLOW_UP_INTERVAL_DAYS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantType {
    #[serde(rename = "Estudiante")]
    Student,
    #[serde(rename = "Representante")]
    Representative,
    #[serde(rename = "Docente")]
    Teacher,
    #[serde(rename = "Autoridad")]
    Authority,
    #[serde(rename = "Institución externa")]
    ExternalInstitution,
}

/// `responsible` is the name of whoever carried out the follow-up, not a
/// user reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub case_id: i64,
    pub date: NaiveDate,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1))]
    pub responsible: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective: Option<bool>,
    #[serde(default)]
    pub participants: Vec<ParticipantType>,
}

impl_record!(FollowUp, Table::FollowUps);
