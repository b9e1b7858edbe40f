use super::{Role, SECURITY_QUESTION_COUNT, SecurityQuestion, User, UserStatus};
use crate::db;
use crate::error::StoreError;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

pub struct Registration<'a> {
    pub full_name: &'a str,
    pub cedula: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
}

/// Answers are compared case- and whitespace-insensitively.
fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Builds a pending user with a hashed password. Nothing is written.
pub fn new_user(registration: &Registration<'_>, cost: u32) -> Result<User, StoreError> {
    let password_hash = bcrypt::hash(registration.password, cost)?;

    Ok(User {
        id: None,
        full_name: registration.full_name.to_string(),
        cedula: registration.cedula.to_string(),
        email: registration.email.to_lowercase(),
        password_hash,
        role: registration.role,
        status: UserStatus::Pending,
        first_login: true,
        phone: None,
        position: None,
        security_questions: None,
    })
}

/// Registers a new user. A cédula or email already in use fails with
/// [`StoreError::Duplicate`].
#[instrument(skip_all, fields(email = registration.email, role = %registration.role))]
pub async fn register_user(
    pool: &SqlitePool,
    registration: &Registration<'_>,
    cost: u32,
) -> Result<i64, StoreError> {
    info!("Registering user");
    let user = new_user(registration, cost)?;
    db::insert(pool, &user).await
}

/// Looks the user up by email or cédula and checks the password.
#[instrument(skip_all, fields(login = %login))]
pub async fn authenticate(
    pool: &SqlitePool,
    login: &str,
    password: &str,
) -> Result<Option<User>, StoreError> {
    info!("Authenticating user");
    let user = match db::user_by_email(pool, &login.to_lowercase()).await? {
        Some(user) => Some(user),
        None => db::user_by_cedula(pool, login).await?,
    };

    match user {
        Some(user) => match bcrypt::verify(password, &user.password_hash) {
            Ok(true) => Ok(Some(user)),
            _ => Ok(None),
        },
        None => Ok(None),
    }
}

/// Finishes a first login: stores the two security questions with hashed
/// answers, activates the user and clears the first-login flag.
#[instrument(skip_all, fields(user_id = user_id))]
pub async fn complete_profile(
    pool: &SqlitePool,
    user_id: i64,
    questions: &[(&str, &str)],
    phone: Option<&str>,
    cost: u32,
) -> Result<User, StoreError> {
    info!("Completing user profile");
    if questions.len() != SECURITY_QUESTION_COUNT {
        return Err(StoreError::Validation(format!(
            "Exactly {} security questions are required, got {}",
            SECURITY_QUESTION_COUNT,
            questions.len()
        )));
    }

    let mut user: User = db::require(pool, user_id).await?;

    let mut security_questions = Vec::with_capacity(SECURITY_QUESTION_COUNT);
    for (question, answer) in questions {
        security_questions.push(SecurityQuestion {
            question: question.to_string(),
            answer_hash: bcrypt::hash(normalize_answer(answer), cost)?,
        });
    }

    user.security_questions = Some(security_questions);
    user.status = UserStatus::Active;
    user.first_login = false;
    if let Some(phone) = phone {
        user.phone = Some(phone.to_string());
    }

    db::update(pool, &user).await?;
    Ok(user)
}

/// Resets a forgotten password after both security answers match.
#[instrument(skip_all, fields(login = %login))]
pub async fn reset_password(
    pool: &SqlitePool,
    login: &str,
    answers: &[&str],
    new_password: &str,
    cost: u32,
) -> Result<(), StoreError> {
    info!("Resetting password with security questions");
    let user = match db::user_by_email(pool, &login.to_lowercase()).await? {
        Some(user) => user,
        None => db::user_by_cedula(pool, login)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("No user for {}", login)))?,
    };

    let questions = user.security_questions.as_deref().ok_or_else(|| {
        StoreError::Validation("User has not set up security questions".to_string())
    })?;

    if answers.len() != questions.len() {
        return Err(StoreError::Validation(format!(
            "Expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }

    for (question, answer) in questions.iter().zip(answers) {
        let matches = bcrypt::verify(normalize_answer(answer), &question.answer_hash)
            .unwrap_or(false);
        if !matches {
            warn!("Security answer mismatch");
            return Err(StoreError::Authentication(
                "Security answers do not match".to_string(),
            ));
        }
    }

    let mut user = user;
    user.password_hash = bcrypt::hash(new_password, cost)?;
    db::update(pool, &user).await
}

#[instrument(skip_all, fields(user_id = user_id))]
pub async fn change_password(
    pool: &SqlitePool,
    user_id: i64,
    current_password: &str,
    new_password: &str,
    cost: u32,
) -> Result<(), StoreError> {
    info!("Changing user password");
    let mut user: User = db::require(pool, user_id).await?;

    if !bcrypt::verify(current_password, &user.password_hash).unwrap_or(false) {
        return Err(StoreError::Authentication(
            "Current password is incorrect".to_string(),
        ));
    }

    user.password_hash = bcrypt::hash(new_password, cost)?;
    db::update(pool, &user).await
}
