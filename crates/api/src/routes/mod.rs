//! HTTP route handlers.

pub mod admin_fields;
pub mod admin_forms;
pub mod forms;
pub mod health;
