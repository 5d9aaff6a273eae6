//! Tenant domain model.
//!
//! Tenants are the isolation root of the platform: every campaign,
//! form link, and coupon is owned by exactly one tenant and is never
//! queried or mutated outside that tenant's scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An isolated customer organization.
///
/// Tenants are created by superadmin action. Once other entities
/// reference a tenant it is immutable and can only be removed via a
/// cascade delete that takes its campaigns, form links, and coupons
/// with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe unique identifier (e.g., `acme-stores`).
    pub slug: String,
    /// Arbitrary key-value metadata.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
    pub metadata: Option<serde_json::Value>,
}
