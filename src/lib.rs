//! Local data store for a school counseling (DECE) office: entity schema,
//! first-run seeding, backup/restore and application settings on SQLite.

pub mod auth;
pub mod backup;
pub mod case_code;
pub mod cases;
pub mod database;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod seed;
pub mod settings;
pub mod store;
pub mod telemetry;
#[cfg(test)]
mod test;

pub use error::StoreError;
pub use store::{Opened, Store};
