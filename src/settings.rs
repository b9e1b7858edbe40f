//! Application settings keyed by name.
//!
//! The raw layer stores any JSON value and keeps "absent" apart from a stored
//! `null`. The typed layer maps every known key to one variant of
//! [`Setting`].

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Executor, Sqlite};
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveDuration {
    pub value: u32,
    pub unit: DurationUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePolicy {
    pub maternity: LeaveDuration,
    pub lactation: LeaveDuration,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            maternity: LeaveDuration {
                value: 84,
                unit: DurationUnit::Days,
            },
            lactation: LeaveDuration {
                value: 12,
                unit: DurationUnit::Months,
            },
        }
    }
}

/// Header and footer images used on generated PDFs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Letterhead {
    pub header_image: Option<String>,
    pub footer_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    /// "HH:MM"
    pub start: String,
    pub end: String,
}

/// Contact of the health ministry authority that receives referrals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityContact {
    pub name: String,
    pub position: String,
    pub institution: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoBackup {
    pub enabled: bool,
    pub interval_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    LeaveSettings,
    Letterhead,
    WorkingHours,
    MspAuthority,
    AutoBackup,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::LeaveSettings,
        SettingKey::Letterhead,
        SettingKey::WorkingHours,
        SettingKey::MspAuthority,
        SettingKey::AutoBackup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::LeaveSettings => "leaveSettings",
            SettingKey::Letterhead => "pdfLetterhead",
            SettingKey::WorkingHours => "workingHours",
            SettingKey::MspAuthority => "mspAuthority",
            SettingKey::AutoBackup => "autoBackup",
        }
    }

    pub fn from_str(key: &str) -> Option<SettingKey> {
        SettingKey::ALL.iter().copied().find(|k| k.as_str() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    LeaveSettings(LeavePolicy),
    Letterhead(Letterhead),
    WorkingHours(WorkingHours),
    MspAuthority(AuthorityContact),
    AutoBackup(AutoBackup),
}

impl Setting {
    pub fn key(&self) -> SettingKey {
        match self {
            Setting::LeaveSettings(_) => SettingKey::LeaveSettings,
            Setting::Letterhead(_) => SettingKey::Letterhead,
            Setting::WorkingHours(_) => SettingKey::WorkingHours,
            Setting::MspAuthority(_) => SettingKey::MspAuthority,
            Setting::AutoBackup(_) => SettingKey::AutoBackup,
        }
    }

    fn to_value(&self) -> Result<Value, StoreError> {
        let value = match self {
            Setting::LeaveSettings(v) => serde_json::to_value(v)?,
            Setting::Letterhead(v) => serde_json::to_value(v)?,
            Setting::WorkingHours(v) => serde_json::to_value(v)?,
            Setting::MspAuthority(v) => serde_json::to_value(v)?,
            Setting::AutoBackup(v) => serde_json::to_value(v)?,
        };
        Ok(value)
    }

    fn from_value(key: SettingKey, value: Value) -> Result<Setting, StoreError> {
        let setting = match key {
            SettingKey::LeaveSettings => Setting::LeaveSettings(serde_json::from_value(value)?),
            SettingKey::Letterhead => Setting::Letterhead(serde_json::from_value(value)?),
            SettingKey::WorkingHours => Setting::WorkingHours(serde_json::from_value(value)?),
            SettingKey::MspAuthority => Setting::MspAuthority(serde_json::from_value(value)?),
            SettingKey::AutoBackup => Setting::AutoBackup(serde_json::from_value(value)?),
        };
        Ok(setting)
    }
}

/// `None` when the key was never stored; `Some(Value::Null)` when a null was.
pub async fn get_raw<'e, E>(executor: E, key: &str) -> Result<Option<Value>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<String> = sqlx::query_scalar("SELECT value FROM app_settings WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await?;

    row.map(|value| serde_json::from_str(&value).map_err(StoreError::from))
        .transpose()
}

#[instrument(skip(executor, value))]
pub async fn put_raw<'e, E>(executor: E, key: &str, value: &Value) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO app_settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(executor)
    .await
    .map_err(|e| StoreError::from_write("app_settings", e))?;

    info!("Stored setting");
    Ok(())
}

/// Returns whether the key existed.
#[instrument(skip(executor))]
pub async fn delete<'e, E>(executor: E, key: &str) -> Result<bool, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM app_settings WHERE key = ?")
        .bind(key)
        .execute(executor)
        .await?;

    info!(removed = result.rows_affected(), "Deleted setting");
    Ok(result.rows_affected() > 0)
}

/// Reads a known setting. A stored value of the wrong shape is a
/// serialization error rather than `None`.
pub async fn get<'e, E>(executor: E, key: SettingKey) -> Result<Option<Setting>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    match get_raw(executor, key.as_str()).await? {
        Some(value) => Ok(Some(Setting::from_value(key, value)?)),
        None => Ok(None),
    }
}

pub async fn put<'e, E>(executor: E, setting: &Setting) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    put_raw(executor, setting.key().as_str(), &setting.to_value()?).await
}

/// Leave policy, falling back to the default when nothing is stored.
pub async fn leave_policy<'e, E>(executor: E) -> Result<LeavePolicy, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    match get(executor, SettingKey::LeaveSettings).await? {
        Some(Setting::LeaveSettings(policy)) => Ok(policy),
        _ => Ok(LeavePolicy::default()),
    }
}
