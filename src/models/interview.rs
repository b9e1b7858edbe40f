use crate::database::Table;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewType {
    #[serde(rename = "Estudiante")]
    Student,
    #[serde(rename = "Docente")]
    Teacher,
    #[serde(rename = "Representante")]
    Representative,
}

impl InterviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Student => "Estudiante",
            InterviewType::Teacher => "Docente",
            InterviewType::Representative => "Representante",
        }
    }
}

/// section -> question key -> answer
pub type InterviewAnswers = BTreeMap<String, BTreeMap<String, String>>;

/// At most one interview per case file and interview type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PsychosocialInterview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub case_file_id: i64,
    pub interview_type: InterviewType,
    pub date: NaiveDate,
    #[validate(length(min = 1))]
    pub interviewer: String,
    #[serde(default)]
    pub answers: InterviewAnswers,
}

impl_record!(PsychosocialInterview, Table::PsychosocialInterviews);
