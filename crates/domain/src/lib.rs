//! Domain layer for the forms builder.
//!
//! This crate contains:
//! - Domain models (Form, Field, Entry, Principal)
//! - Access control, submission cleaning, response aggregation and mail composition

pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;
