//! Form-link workflow service — generation, resolution, submission,
//! and statistics orchestration.

use couponly_core::error::{CouponlyError, CouponlyResult};
use couponly_core::models::campaign::{Campaign, CampaignView, CreateCampaign};
use couponly_core::models::coupon::{Coupon, CreateCoupon};
use couponly_core::models::form_link::{FormLink, LinkStats, LinksWithStats};
use couponly_core::repository::{CampaignRepository, CouponRepository, FormLinkRepository};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::LinkError;
use crate::token;

/// Smallest permitted link batch.
pub const MIN_LINK_BATCH: u32 = 1;
/// Largest permitted link batch.
pub const MAX_LINK_BATCH: u32 = 1000;

/// An anonymous coupon-request submission.
///
/// Field values arrive already normalized; format validation is the
/// HTTP layer's job and validation failures propagate as-is.
#[derive(Debug, Clone)]
pub struct FormSubmission {
    /// Campaign code the form was rendered for.
    pub campaign_code: String,
    pub recipient_email: Option<String>,
    pub recipient_name: Option<String>,
    /// Present when the form was reached through a single-use link.
    pub form_token: Option<String>,
}

/// Form-link workflow service.
///
/// Generic over repository implementations so the workflow layer has
/// no dependency on the database crate.
pub struct LinkService<Cam, Lnk, Cpn>
where
    Cam: CampaignRepository,
    Lnk: FormLinkRepository,
    Cpn: CouponRepository,
{
    campaigns: Cam,
    links: Lnk,
    coupons: Cpn,
}

impl<Cam, Lnk, Cpn> LinkService<Cam, Lnk, Cpn>
where
    Cam: CampaignRepository,
    Lnk: FormLinkRepository,
    Cpn: CouponRepository,
{
    pub fn new(campaigns: Cam, links: Lnk, coupons: Cpn) -> Self {
        Self {
            campaigns,
            links,
            coupons,
        }
    }

    /// Create a campaign with a freshly generated campaign code.
    pub async fn create_campaign(&self, input: CreateCampaign) -> CouponlyResult<Campaign> {
        let code = token::generate_campaign_code();
        let campaign = self.campaigns.create(input, code).await?;
        info!(
            tenant_id = %campaign.tenant_id,
            campaign_id = %campaign.id,
            code = %campaign.code,
            "Campaign created"
        );
        Ok(campaign)
    }

    /// Generate a batch of single-use form links for a campaign.
    ///
    /// `count` must be in `[1, 1000]` and the campaign must exist
    /// under the tenant.
    pub async fn generate_links(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
        count: u32,
    ) -> CouponlyResult<Vec<FormLink>> {
        if !(MIN_LINK_BATCH..=MAX_LINK_BATCH).contains(&count) {
            return Err(LinkError::CountOutOfRange {
                count,
                min: MIN_LINK_BATCH,
                max: MAX_LINK_BATCH,
            }
            .into());
        }

        // Campaign must exist and belong to this tenant.
        let campaign = self.campaigns.get_by_id(tenant_id, campaign_id).await?;

        let tokens: Vec<String> = (0..count).map(|_| token::generate_form_token()).collect();
        let links = self
            .links
            .create_batch(tenant_id, campaign.id, tokens)
            .await?;

        info!(
            tenant_id = %tenant_id,
            campaign_id = %campaign_id,
            count = links.len(),
            "Form links generated"
        );
        Ok(links)
    }

    /// Resolve a form token into the campaign view the public form
    /// renders. Pure read — no side effects.
    ///
    /// A token belonging to another tenant answers exactly like a
    /// nonexistent token; the token is echoed back in the view so the
    /// submission processor can re-verify it at submit time.
    pub async fn resolve_campaign_for_token(
        &self,
        tenant_id: Uuid,
        form_token: &str,
    ) -> CouponlyResult<CampaignView> {
        let link = self.links.get_by_token(tenant_id, form_token).await?;

        if link.is_used() {
            debug!(tenant_id = %tenant_id, link_id = %link.id, "Form link already used");
            return Err(CouponlyError::AlreadyUsed {
                entity: "form_link".into(),
                id: link.id.to_string(),
            });
        }

        let campaign = self.campaigns.get_by_id(tenant_id, link.campaign_id).await?;

        Ok(CampaignView {
            name: campaign.name,
            code: campaign.code,
            discount_kind: campaign.discount_kind,
            discount_value: campaign.discount_value,
            form_token: form_token.to_string(),
        })
    }

    /// Process a public form submission and issue a coupon.
    ///
    /// Without a token this is a plain issuance against the named
    /// campaign. With a token, the link is re-checked and consumed
    /// atomically with the coupon insert; a link that was consumed
    /// between form load and submit fails here with no side effects.
    pub async fn submit_form(
        &self,
        tenant_id: Uuid,
        submission: FormSubmission,
    ) -> CouponlyResult<Coupon> {
        let campaign = self
            .campaigns
            .get_by_code(tenant_id, &submission.campaign_code)
            .await?;

        if !campaign.active {
            return Err(LinkError::CampaignInactive.into());
        }

        // Discount snapshot: later campaign edits must not change
        // this coupon.
        let new_coupon = CreateCoupon {
            tenant_id,
            campaign_id: campaign.id,
            code: token::generate_coupon_code(),
            discount_kind: campaign.discount_kind,
            discount_value: campaign.discount_value,
            recipient_email: submission.recipient_email,
            recipient_name: submission.recipient_name,
        };

        let coupon = match submission.form_token {
            Some(form_token) => {
                self.links
                    .consume_and_issue(tenant_id, campaign.id, &form_token, new_coupon)
                    .await?
            }
            None => self.coupons.create(new_coupon).await?,
        };

        info!(
            tenant_id = %tenant_id,
            campaign_id = %campaign.id,
            coupon_id = %coupon.id,
            "Coupon issued"
        );
        Ok(coupon)
    }

    /// Admin dashboard listing: every link for a campaign plus
    /// statistics derived on read from the rows themselves.
    pub async fn links_with_stats(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
    ) -> CouponlyResult<LinksWithStats> {
        let campaign = self.campaigns.get_by_id(tenant_id, campaign_id).await?;
        let links = self.links.list_by_campaign(tenant_id, campaign.id).await?;
        let statistics = LinkStats::derive(&links);
        Ok(LinksWithStats { links, statistics })
    }

    /// Store-staff redemption: flip a coupon from `Active` to
    /// `Redeemed`, at most once.
    pub async fn redeem_coupon(&self, tenant_id: Uuid, code: &str) -> CouponlyResult<Coupon> {
        let coupon = self.coupons.redeem(tenant_id, code).await?;
        info!(
            tenant_id = %tenant_id,
            coupon_id = %coupon.id,
            "Coupon redeemed"
        );
        Ok(coupon)
    }
}
