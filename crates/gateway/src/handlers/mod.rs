//! API handlers module

pub mod analyze;
pub mod assignments;
pub mod auth;
pub mod health;
pub mod sources;
