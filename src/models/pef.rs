use crate::database::Table;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const PEF_CRITERIA: usize = 8;
pub const PEF_PASSING_SCORE: u32 = 6;
pub const IN_PERSON_HOURS: u32 = 15;
pub const REMOTE_HOURS: u32 = 10;

/// Training module of the "Educando en Familia" programme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PefModule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: String,
}

impl_record!(PefModule, Table::PefModules);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    #[serde(rename = "Presencial")]
    InPerson,
    #[serde(rename = "Virtual")]
    Remote,
}

/// A teacher's evaluation on one module, referenced by module name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PefEvaluation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub teacher_id: i64,
    pub teacher_name: String,
    #[validate(length(min = 1))]
    pub module_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<Modality>,
    #[validate(length(equal = 8))]
    pub criteria: Vec<bool>,
    pub score: u32,
    pub approved: bool,
    pub hours: u32,
    pub evaluation_date: NaiveDate,
}

impl_record!(PefEvaluation, Table::PefEvaluations);

impl PefEvaluation {
    /// Builds an evaluation, deriving score, approval and credited hours
    /// from the criteria met.
    pub fn evaluate(
        teacher_id: i64,
        teacher_name: &str,
        module_name: &str,
        modality: Option<Modality>,
        criteria: [bool; PEF_CRITERIA],
        evaluation_date: NaiveDate,
    ) -> Self {
        let score = criteria.iter().filter(|met| **met).count() as u32;
        let approved = score >= PEF_PASSING_SCORE;
        let hours = match (approved, modality) {
            (true, Some(Modality::InPerson)) => IN_PERSON_HOURS,
            (true, Some(Modality::Remote)) => REMOTE_HOURS,
            _ => 0,
        };

        Self {
            id: None,
            teacher_id,
            teacher_name: teacher_name.to_string(),
            module_name: module_name.to_string(),
            modality,
            criteria: criteria.to_vec(),
            score,
            approved,
            hours,
            evaluation_date,
        }
    }
}
