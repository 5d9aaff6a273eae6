//! Coupon domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::campaign::DiscountKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CouponStatus {
    Active,
    Redeemed,
}

/// An issued, redeemable discount instance.
///
/// The discount fields are a snapshot copied from the campaign at
/// issuance time, so later campaign edits never retroactively change
/// an issued coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub campaign_id: Uuid,
    /// Generated coupon code, unique per tenant.
    pub code: String,
    pub status: CouponStatus,
    pub discount_kind: DiscountKind,
    pub discount_value: u32,
    /// Requester details captured from the submission form.
    pub recipient_email: Option<String>,
    pub recipient_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to issue a new coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCoupon {
    pub tenant_id: Uuid,
    pub campaign_id: Uuid,
    pub code: String,
    pub discount_kind: DiscountKind,
    pub discount_value: u32,
    pub recipient_email: Option<String>,
    pub recipient_name: Option<String>,
}
