//! Domain models for Couponly.
//!
//! These are the core types shared across all crates.

pub mod campaign;
pub mod coupon;
pub mod form_link;
pub mod tenant;
