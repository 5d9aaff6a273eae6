//! Error types for the Couponly platform.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CouponlyError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Already used: {entity} {id}")]
    AlreadyUsed { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CouponlyResult<T> = Result<T, CouponlyError>;

impl CouponlyError {
    /// True for the failure classes a public form surfaces as a single
    /// "link not found or expired" message.
    pub fn is_link_unavailable(&self) -> bool {
        matches!(
            self,
            CouponlyError::NotFound { .. } | CouponlyError::AlreadyUsed { .. }
        )
    }
}
