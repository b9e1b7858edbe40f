mod cases;
mod env;
mod migrations;
pub mod utils;
