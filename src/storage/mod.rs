mod content;
pub mod db;
pub mod models;
mod notes;
mod profiles;
mod reset_tokens;
mod tables;
mod users;

pub use db::{Database, DatabaseError};
pub use tables::*;
