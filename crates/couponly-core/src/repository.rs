//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter on every operation to enforce data
//! isolation; tenant scope is always an explicit filter predicate,
//! never inferred from a token or campaign code.

use uuid::Uuid;

use crate::error::CouponlyResult;
use crate::models::{
    campaign::{Campaign, CreateCampaign, UpdateCampaign},
    coupon::{Coupon, CreateCoupon},
    form_link::FormLink,
    tenant::{CreateTenant, Tenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenants (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = CouponlyResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CouponlyResult<Tenant>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = CouponlyResult<Tenant>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CouponlyResult<PaginatedResult<Tenant>>> + Send;
    /// Cascade delete: removes the tenant and every campaign, form
    /// link, and coupon it owns, in one transaction.
    fn delete_cascade(&self, id: Uuid) -> impl Future<Output = CouponlyResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait CampaignRepository: Send + Sync {
    /// Create a campaign with a pre-generated campaign code.
    fn create(
        &self,
        input: CreateCampaign,
        code: String,
    ) -> impl Future<Output = CouponlyResult<Campaign>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CouponlyResult<Campaign>> + Send;
    fn get_by_code(
        &self,
        tenant_id: Uuid,
        code: &str,
    ) -> impl Future<Output = CouponlyResult<Campaign>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateCampaign,
    ) -> impl Future<Output = CouponlyResult<Campaign>> + Send;
    fn set_active(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = CouponlyResult<Campaign>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CouponlyResult<PaginatedResult<Campaign>>> + Send;
}

pub trait FormLinkRepository: Send + Sync {
    /// Insert one row per token, all unused. Tokens are generated by
    /// the caller; a unique-index violation surfaces as a database
    /// error, never a silent drop.
    fn create_batch(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
        tokens: Vec<String>,
    ) -> impl Future<Output = CouponlyResult<Vec<FormLink>>> + Send;

    /// Look up a link by token within the tenant's scope. A token that
    /// exists under a different tenant is reported as not-found.
    fn get_by_token(
        &self,
        tenant_id: Uuid,
        token: &str,
    ) -> impl Future<Output = CouponlyResult<FormLink>> + Send;

    /// Atomically consume the link and issue the coupon.
    ///
    /// The consume is a conditional update (`used_at` must still be
    /// null) in the same transaction as the coupon insert; both happen
    /// or neither does. Zero affected rows means the link was missing
    /// or already used, and no coupon is issued.
    fn consume_and_issue(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
        token: &str,
        coupon: CreateCoupon,
    ) -> impl Future<Output = CouponlyResult<Coupon>> + Send;

    /// All links for a campaign, oldest first.
    fn list_by_campaign(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
    ) -> impl Future<Output = CouponlyResult<Vec<FormLink>>> + Send;
}

pub trait CouponRepository: Send + Sync {
    /// Issue a coupon outside the form-link flow (untokened
    /// submissions).
    fn create(&self, input: CreateCoupon) -> impl Future<Output = CouponlyResult<Coupon>> + Send;
    fn get_by_code(
        &self,
        tenant_id: Uuid,
        code: &str,
    ) -> impl Future<Output = CouponlyResult<Coupon>> + Send;
    /// Flip status from `Active` to `Redeemed` at most once, via a
    /// conditional update. Returns the redeemed coupon.
    fn redeem(
        &self,
        tenant_id: Uuid,
        code: &str,
    ) -> impl Future<Output = CouponlyResult<Coupon>> + Send;
    fn list_by_campaign(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CouponlyResult<PaginatedResult<Coupon>>> + Send;
}
