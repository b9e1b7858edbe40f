//! Case file codes: `{INSTITUTION}-{STUDENT}-{YYYYMMDD}-{NNNN}`.
//!
//! The suffix is the last four digits of a caller-supplied tick (normally the
//! current time in milliseconds). Two students with the same initials opened
//! within the same tick window get the same code; the unique index on
//! `case_files.code` rejects the second insert as a duplicate.

use chrono::NaiveDate;

/// Words skipped when abbreviating an institution name.
const CONNECTORS: [&str; 9] = ["de", "del", "la", "las", "el", "los", "y", "e", "en"];

fn first_letter(word: &str) -> Option<char> {
    word.chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().next().unwrap_or(c))
}

pub fn institution_initials(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter(|word| !CONNECTORS.contains(&word.to_lowercase().as_str()))
        .filter_map(first_letter)
        .collect();

    if initials.is_empty() {
        "IE".to_string()
    } else {
        initials
    }
}

pub fn person_initials(full_name: &str) -> String {
    let initials: String = full_name.split_whitespace().filter_map(first_letter).collect();

    if initials.is_empty() {
        "XX".to_string()
    } else {
        initials
    }
}

pub fn generate(institution_name: &str, student_name: &str, date: NaiveDate, ticks: i64) -> String {
    format!(
        "{}-{}-{}-{:04}",
        institution_initials(institution_name),
        person_initials(student_name),
        date.format("%Y%m%d"),
        ticks.rem_euclid(10_000)
    )
}

/// Codes for seeded cases, unique by construction through `index`.
pub fn seed_code(category: &str, student_name: &str, index: usize) -> String {
    format!(
        "{}-{}-{:04}",
        institution_initials(category),
        person_initials(student_name),
        index + 1
    )
}
