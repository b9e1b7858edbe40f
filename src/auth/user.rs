use crate::database::Table;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Number of security question/answer pairs a completed profile carries.
pub const SECURITY_QUESTION_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Coordinador")]
    Coordinator,
    #[serde(rename = "Analista")]
    Analyst,
    #[serde(rename = "Profesional")]
    Professional,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Coordinator => "Coordinador",
            Role::Analyst => "Analista",
            Role::Professional => "Profesional",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, StoreError> {
        match s {
            "Coordinador" => Ok(Role::Coordinator),
            "Analista" => Ok(Role::Analyst),
            "Profesional" => Ok(Role::Professional),
            _ => Err(StoreError::Validation(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "Activo")]
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityQuestion {
    pub question: String,
    pub answer_hash: String,
}

/// A counseling-office operator. Users are never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(length(min = 10, max = 13))]
    pub cedula: String,
    #[validate(email)]
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub first_login: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 2))]
    pub security_questions: Option<Vec<SecurityQuestion>>,
}

crate::models::impl_record!(User, Table::Users);

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}
