//! Shared utilities and common types for the Forms Builder backend.
//!
//! This crate provides functionality used across the other crates:
//! - JWT access token validation
//! - Common validation logic

pub mod jwt;
pub mod validation;
