//! Form-link workflow error types.

use couponly_core::error::CouponlyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link count must be between {min} and {max}, got {count}")]
    CountOutOfRange { count: u32, min: u32, max: u32 },

    #[error("campaign is not active")]
    CampaignInactive,
}

impl From<LinkError> for CouponlyError {
    fn from(err: LinkError) -> Self {
        CouponlyError::Validation {
            message: err.to_string(),
        }
    }
}
