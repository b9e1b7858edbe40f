use crate::database::Table;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const GESTATION_DAYS: u64 = 280;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PregnancyCondition {
    #[serde(rename = "Embarazo")]
    Pregnancy,
    #[serde(rename = "Maternidad")]
    Maternity,
    #[serde(rename = "Paternidad")]
    Paternity,
}

/// Leave start/end dates are filled in by the caller from the
/// `leaveSettings` policy; the store only keeps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PregnancyCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub student_id: i64,
    pub student_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_file_id: Option<i64>,
    pub condition: PregnancyCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pregnancy_start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maternity_leave_start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maternity_leave_end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lactation_leave_start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lactation_leave_end_date: Option<NaiveDate>,
    pub attends_prenatal_control: bool,
    pub has_family_support: bool,
    pub continues_studies: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl_record!(PregnancyCase, Table::PregnancyCases);

impl PregnancyCase {
    pub fn new(student_id: i64, student_name: &str, condition: PregnancyCondition) -> Self {
        Self {
            id: None,
            student_id,
            student_name: student_name.to_string(),
            case_file_id: None,
            condition,
            pregnancy_start_date: None,
            estimated_due_date: None,
            birth_date: None,
            maternity_leave_start_date: None,
            maternity_leave_end_date: None,
            lactation_leave_start_date: None,
            lactation_leave_end_date: None,
            attends_prenatal_control: false,
            has_family_support: false,
            continues_studies: true,
            observations: None,
        }
    }

    /// Sets the pregnancy start and derives the estimated due date.
    pub fn set_pregnancy_start(&mut self, start: NaiveDate) {
        self.pregnancy_start_date = Some(start);
        self.estimated_due_date = Some(start + Days::new(GESTATION_DAYS));
    }
}
