use super::Attachment;
use crate::database::Table;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Masculino")]
    Male,
    #[serde(rename = "Femenino")]
    Female,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(length(min = 10, max = 13))]
    pub cedula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Course this teacher tutors. Lookup only: removing the course leaves
    /// the teacher untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_course_id: Option<i64>,
}

impl_record!(Teacher, Table::Teachers);

/// Legal guardian of one or more students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Representative {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(length(min = 10, max = 13))]
    pub cedula: String,
    #[validate(range(min = 14, max = 110))]
    pub age: u32,
    pub address: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

impl_record!(Representative, Table::Representatives);

/// `course` and `parallel` are copies of the course identity at the time of
/// writing, not a reference; whoever moves a student keeps them in step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(length(min = 10, max = 13))]
    pub cedula: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    #[validate(length(min = 1))]
    pub course: String,
    #[validate(length(min = 1))]
    pub parallel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<i64>,
    pub representative_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_condition_attachment: Option<Attachment>,
}

impl_record!(Student, Table::Students);
