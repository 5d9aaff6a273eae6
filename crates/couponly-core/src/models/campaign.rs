//! Campaign domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a campaign's discount is expressed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DiscountKind {
    /// Percentage off, `value` in whole percent (e.g., 15 = 15% off).
    Percentage,
    /// Fixed amount off, `value` in minor currency units (cents).
    Fixed,
}

/// A named discount offer scoped to one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Unique per tenant.
    pub name: String,
    /// Generated campaign code, unique per tenant (e.g., `SPRING24X`).
    pub code: String,
    pub discount_kind: DiscountKind,
    pub discount_value: u32,
    /// Inactive campaigns reject new submissions but keep their
    /// already-issued coupons valid.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new campaign.
///
/// The campaign code is generated at creation time, not supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub tenant_id: Uuid,
    pub name: String,
    pub discount_kind: DiscountKind,
    pub discount_value: u32,
}

/// Fields that can be updated on an existing campaign.
///
/// Edits never propagate to already-issued coupons; those carry a
/// discount snapshot taken at issuance time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateCampaign {
    pub name: Option<String>,
    pub discount_kind: Option<DiscountKind>,
    pub discount_value: Option<u32>,
    pub active: Option<bool>,
}

/// Public view of a campaign as rendered on an anonymous submission
/// form, annotated with the form token that resolved to it.
///
/// The token is echoed back so the submission processor can re-verify
/// it at submit time. Internal ids are never part of this view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignView {
    pub name: String,
    pub code: String,
    pub discount_kind: DiscountKind,
    pub discount_value: u32,
    pub form_token: String,
}
