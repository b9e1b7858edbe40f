use crate::database::Table;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Exemption from regular attendance in favour of assisted classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssistedClass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub student_id: i64,
    pub student_name: String,
    #[validate(length(min = 1))]
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_reference: Option<String>,
}

impl_record!(AssistedClass, Table::AssistedClasses);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendeeType {
    #[serde(rename = "Estudiante")]
    Student,
    #[serde(rename = "Representante")]
    Representative,
    #[serde(rename = "Docente")]
    Teacher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[serde(rename = "Programada")]
    Scheduled,
    #[serde(rename = "Realizada")]
    Completed,
    #[serde(rename = "Cancelada")]
    Cancelled,
}

/// `attendee_id` points into the table matching `attendee_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub date: NaiveDate,
    /// "HH:MM"
    #[validate(length(equal = 5))]
    pub time: String,
    pub attendee_type: AttendeeType,
    pub attendee_id: i64,
    pub attendee_name: String,
    #[validate(length(min = 1))]
    pub reason: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl_record!(Appointment, Table::Appointments);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreventiveActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub date: NaiveDate,
    #[validate(length(min = 1))]
    pub title: String,
    pub topic: String,
    pub audience: String,
    pub participants: u32,
    pub responsible: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl_record!(PreventiveActivity, Table::PreventiveActivities);
