pub mod migrations;
pub mod schema;

pub use migrations::*;
pub use schema::*;
