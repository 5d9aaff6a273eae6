//! Couponly Core — domain models, error taxonomy, and repository traits.
//!
//! This crate has no database dependency; `couponly-db` implements the
//! repository traits against SurrealDB, and `couponly-links` builds the
//! form-link workflow on top of the traits.

pub mod error;
pub mod models;
pub mod repository;
