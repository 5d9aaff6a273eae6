//! Couponly Links — the tenant-scoped form-link redemption workflow.
//!
//! A form link is a single-use bearer token gating one anonymous
//! coupon-request submission. This crate provides:
//! - Token and code generation ([`token`])
//! - The workflow service ([`service::LinkService`]): link generation,
//!   token resolution, form submission, statistics, coupon redemption

pub mod error;
pub mod service;
pub mod token;
