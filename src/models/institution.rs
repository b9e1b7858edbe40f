use crate::database::Table;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The institution table holds a single row under this id.
pub const INSTITUTION_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1))]
    pub name: String,
    /// Ministry (AMIE) code, e.g. "09H00001".
    #[validate(length(min = 1))]
    pub code: String,
    pub district: String,
    pub authority_name: String,
    pub address: String,
    pub phone: String,
    #[validate(email)]
    pub email: String,
    pub school_year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl_record!(Institution, Table::Institution);

/// A grade, parallel and shift combination. Unique on all three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub parallel: String,
    pub shift: String,
}

impl_record!(Course, Table::Courses);

impl Course {
    pub fn new(name: &str, parallel: &str, shift: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            parallel: parallel.to_string(),
            shift: shift.to_string(),
        }
    }
}
