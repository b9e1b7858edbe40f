use super::Gender;
use crate::database::Table;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Category name that routes a case through the sexual-violence protocol.
pub const SEXUAL_VIOLENCE_CATEGORY: &str = "Violencia Sexual";

/// Regulated reporting details, one row per sexual-violence case file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SexualViolenceCaseDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub case_file_id: i64,
    pub report_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    pub event_location: String,
    pub occurred_in_institution: bool,
    pub aggressor_relationship: String,
    pub aggressor_in_institution: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggressor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggressor_age: Option<u32>,
    pub reported_to_prosecutor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prosecutor_report_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prosecutor_report_date: Option<NaiveDate>,
    pub district_notified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_notification_date: Option<NaiveDate>,
    pub health_referral: bool,
    pub psychological_referral: bool,
    pub protection_measures_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_measures: Option<String>,
    pub aggressor_separated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrative_process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl_record!(SexualViolenceCaseDetails, Table::SexualViolenceCases);

/// A victim listed on a details row; belongs to the details, not the case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SexualViolenceVictim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub details_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[validate(length(min = 1))]
    pub full_name: String,
    pub cedula: String,
    pub age: u32,
    pub gender: Gender,
    pub course: String,
    pub parallel: String,
    pub has_disability: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    pub nationality: String,
}

impl_record!(SexualViolenceVictim, Table::SexualViolenceVictims);

/// Fixed DECE follow-up questionnaire attached to one follow-up of a
/// sexual-violence case.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeceFollowUpForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub follow_up_id: i64,
    pub case_file_id: i64,

    pub victim_attending_classes: bool,
    pub receiving_psychological_care: bool,
    pub receiving_medical_care: bool,
    pub family_informed: bool,
    pub family_supportive: bool,
    pub protection_measures_active: bool,
    pub aggressor_separated: bool,
    pub complaint_filed: bool,
    pub district_informed: bool,
    pub risk_persists: bool,
    pub revictimization_avoided: bool,
    pub requires_referral: bool,

    pub emotional_state: String,
    pub academic_situation: String,
    pub family_situation: String,
    pub actions_taken: String,
    pub agreements: String,
    pub referral_institution: String,
    pub protection_measure_details: String,
    pub complaint_status: String,
    pub risk_details: String,
    pub next_actions: String,
    pub observations: String,
}

impl_record!(DeceFollowUpForm, Table::DeceFollowUpForms);
