//! Integration tests for the form-link workflow service using
//! in-memory SurrealDB.

use std::collections::HashSet;
use std::sync::Arc;

use couponly_core::error::CouponlyError;
use couponly_core::models::campaign::{Campaign, CreateCampaign, DiscountKind, UpdateCampaign};
use couponly_core::models::coupon::CouponStatus;
use couponly_core::models::tenant::CreateTenant;
use couponly_core::repository::{CampaignRepository, CouponRepository, TenantRepository};
use couponly_db::repository::{
    SurrealCampaignRepository, SurrealCouponRepository, SurrealFormLinkRepository,
    SurrealTenantRepository,
};
use couponly_links::service::{FormSubmission, LinkService};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

type TestService = LinkService<
    SurrealCampaignRepository<Db>,
    SurrealFormLinkRepository<Db>,
    SurrealCouponRepository<Db>,
>;

/// Spin up in-memory DB, run migrations, create a tenant and an
/// active campaign, and build the service on top.
async fn setup() -> (TestService, Uuid, Campaign, Surreal<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    couponly_db::run_migrations(&db).await.unwrap();

    let tenant_repo = SurrealTenantRepository::new(db.clone());
    let tenant = tenant_repo
        .create(CreateTenant {
            name: "Test Tenant".into(),
            slug: "test-tenant".into(),
            metadata: None,
        })
        .await
        .unwrap();

    let svc = LinkService::new(
        SurrealCampaignRepository::new(db.clone()),
        SurrealFormLinkRepository::new(db.clone()),
        SurrealCouponRepository::new(db.clone()),
    );
    let campaign = svc
        .create_campaign(CreateCampaign {
            tenant_id: tenant.id,
            name: "Spring Sale".into(),
            discount_kind: DiscountKind::Percentage,
            discount_value: 15,
        })
        .await
        .unwrap();

    (svc, tenant.id, campaign, db)
}

fn submission(campaign_code: &str, form_token: Option<String>) -> FormSubmission {
    FormSubmission {
        campaign_code: campaign_code.into(),
        recipient_email: Some("shopper@example.com".into()),
        recipient_name: Some("Shopper".into()),
        form_token,
    }
}

// -----------------------------------------------------------------------
// Link generation
// -----------------------------------------------------------------------

#[tokio::test]
async fn generated_tokens_are_unique_across_batches() {
    let (svc, tenant_id, campaign, _db) = setup().await;

    let mut seen = HashSet::new();
    for _ in 0..3 {
        let links = svc.generate_links(tenant_id, campaign.id, 20).await.unwrap();
        for link in links {
            assert!(seen.insert(link.token), "token collision across batches");
        }
    }
    assert_eq!(seen.len(), 60);
}

#[tokio::test]
async fn generate_rejects_out_of_range_counts() {
    let (svc, tenant_id, campaign, _db) = setup().await;

    let err = svc.generate_links(tenant_id, campaign.id, 0).await.unwrap_err();
    assert!(matches!(err, CouponlyError::Validation { .. }));

    let err = svc
        .generate_links(tenant_id, campaign.id, 1001)
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::Validation { .. }));
}

#[tokio::test]
async fn generate_rejects_unknown_campaign() {
    let (svc, tenant_id, _campaign, _db) = setup().await;

    let err = svc
        .generate_links(tenant_id, Uuid::new_v4(), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::NotFound { .. }));
}

#[tokio::test]
async fn fresh_batch_reports_full_availability() {
    let (svc, tenant_id, campaign, _db) = setup().await;

    svc.generate_links(tenant_id, campaign.id, 5).await.unwrap();

    let listing = svc.links_with_stats(tenant_id, campaign.id).await.unwrap();
    assert_eq!(listing.links.len(), 5);
    assert_eq!(listing.statistics.total, 5);
    assert_eq!(listing.statistics.used, 0);
    assert_eq!(listing.statistics.available, 5);
}

// -----------------------------------------------------------------------
// Token resolution
// -----------------------------------------------------------------------

#[tokio::test]
async fn resolve_returns_campaign_view_with_echoed_token() {
    let (svc, tenant_id, campaign, _db) = setup().await;

    let links = svc.generate_links(tenant_id, campaign.id, 1).await.unwrap();
    let token = links[0].token.clone();

    let view = svc
        .resolve_campaign_for_token(tenant_id, &token)
        .await
        .unwrap();
    assert_eq!(view.code, campaign.code);
    assert_eq!(view.name, "Spring Sale");
    assert_eq!(view.discount_kind, DiscountKind::Percentage);
    assert_eq!(view.discount_value, 15);
    assert_eq!(view.form_token, token);
}

#[tokio::test]
async fn resolve_unknown_token_is_not_found() {
    let (svc, tenant_id, _campaign, _db) = setup().await;

    let err = svc
        .resolve_campaign_for_token(tenant_id, "no-such-token")
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::NotFound { .. }));
}

#[tokio::test]
async fn resolve_under_wrong_tenant_behaves_like_not_found() {
    let (svc, tenant_id, campaign, db) = setup().await;
    let tenant_repo = SurrealTenantRepository::new(db.clone());
    let tenant_b = tenant_repo
        .create(CreateTenant {
            name: "Tenant B".into(),
            slug: "tenant-b".into(),
            metadata: None,
        })
        .await
        .unwrap();

    let links = svc.generate_links(tenant_id, campaign.id, 1).await.unwrap();
    let token = links[0].token.clone();

    // Tenant B must get the same answer as for a nonexistent token,
    // and never tenant A's campaign data.
    let err = svc
        .resolve_campaign_for_token(tenant_b.id, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::NotFound { .. }));
}

// -----------------------------------------------------------------------
// Submission
// -----------------------------------------------------------------------

#[tokio::test]
async fn tokened_submission_issues_coupon_and_consumes_link() {
    let (svc, tenant_id, campaign, _db) = setup().await;

    let links = svc.generate_links(tenant_id, campaign.id, 1).await.unwrap();
    let token = links[0].token.clone();

    let coupon = svc
        .submit_form(tenant_id, submission(&campaign.code, Some(token.clone())))
        .await
        .unwrap();
    assert_eq!(coupon.status, CouponStatus::Active);
    assert_eq!(coupon.discount_kind, DiscountKind::Percentage);
    assert_eq!(coupon.discount_value, 15);
    assert_eq!(coupon.recipient_email.as_deref(), Some("shopper@example.com"));

    // The link is now consumed: resolving it reports already-used.
    let err = svc
        .resolve_campaign_for_token(tenant_id, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::AlreadyUsed { .. }));

    let listing = svc.links_with_stats(tenant_id, campaign.id).await.unwrap();
    assert_eq!(listing.statistics.total, 1);
    assert_eq!(listing.statistics.used, 1);
    assert_eq!(listing.statistics.available, 0);
}

#[tokio::test]
async fn replayed_submission_fails_and_issues_no_second_coupon() {
    let (svc, tenant_id, campaign, db) = setup().await;

    let links = svc.generate_links(tenant_id, campaign.id, 1).await.unwrap();
    let token = links[0].token.clone();

    svc.submit_form(tenant_id, submission(&campaign.code, Some(token.clone())))
        .await
        .unwrap();

    let err = svc
        .submit_form(tenant_id, submission(&campaign.code, Some(token)))
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::AlreadyUsed { .. }));

    assert_eq!(count_coupons(&db).await, 1);
}

#[tokio::test]
async fn untokened_submission_issues_coupon_without_touching_links() {
    let (svc, tenant_id, campaign, _db) = setup().await;

    svc.generate_links(tenant_id, campaign.id, 2).await.unwrap();

    let coupon = svc
        .submit_form(tenant_id, submission(&campaign.code, None))
        .await
        .unwrap();
    assert_eq!(coupon.status, CouponStatus::Active);

    // Legacy path: no link was consumed.
    let listing = svc.links_with_stats(tenant_id, campaign.id).await.unwrap();
    assert_eq!(listing.statistics.used, 0);
    assert_eq!(listing.statistics.available, 2);
}

#[tokio::test]
async fn submission_against_inactive_campaign_is_rejected() {
    let (svc, tenant_id, campaign, db) = setup().await;

    let campaign_repo = SurrealCampaignRepository::new(db);
    campaign_repo
        .set_active(tenant_id, campaign.id, false)
        .await
        .unwrap();

    let err = svc
        .submit_form(tenant_id, submission(&campaign.code, None))
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::Validation { .. }));
}

#[tokio::test]
async fn discount_snapshot_survives_campaign_edit() {
    let (svc, tenant_id, campaign, db) = setup().await;

    let coupon = svc
        .submit_form(tenant_id, submission(&campaign.code, None))
        .await
        .unwrap();
    assert_eq!(coupon.discount_value, 15);

    // Editing the campaign must not retroactively change the coupon.
    let campaign_repo = SurrealCampaignRepository::new(db.clone());
    campaign_repo
        .update(
            tenant_id,
            campaign.id,
            UpdateCampaign {
                discount_value: Some(50),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let coupon_repo = SurrealCouponRepository::new(db);
    let fetched = coupon_repo.get_by_code(tenant_id, &coupon.code).await.unwrap();
    assert_eq!(fetched.discount_value, 15);
}

#[tokio::test]
async fn concurrent_submissions_with_same_token_issue_one_coupon() {
    let (svc, tenant_id, campaign, db) = setup().await;
    let svc = Arc::new(svc);

    let links = svc.generate_links(tenant_id, campaign.id, 1).await.unwrap();
    let token = links[0].token.clone();

    let a = {
        let svc = Arc::clone(&svc);
        let sub = submission(&campaign.code, Some(token.clone()));
        tokio::spawn(async move { svc.submit_form(tenant_id, sub).await })
    };
    let b = {
        let svc = Arc::clone(&svc);
        let sub = submission(&campaign.code, Some(token));
        tokio::spawn(async move { svc.submit_form(tenant_id, sub).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one submission may win the token");
    assert_eq!(count_coupons(&db).await, 1);
}

// -----------------------------------------------------------------------
// Statistics and redemption
// -----------------------------------------------------------------------

#[tokio::test]
async fn statistics_stay_consistent_through_the_lifecycle() {
    let (svc, tenant_id, campaign, _db) = setup().await;

    let links = svc.generate_links(tenant_id, campaign.id, 3).await.unwrap();

    for (i, link) in links.iter().enumerate() {
        svc.submit_form(
            tenant_id,
            submission(&campaign.code, Some(link.token.clone())),
        )
        .await
        .unwrap();

        let stats = svc
            .links_with_stats(tenant_id, campaign.id)
            .await
            .unwrap()
            .statistics;
        let used = (i + 1) as u64;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.used, used);
        assert_eq!(stats.available + stats.used, stats.total);
    }
}

#[tokio::test]
async fn issued_coupon_redeems_at_most_once() {
    let (svc, tenant_id, campaign, _db) = setup().await;

    let coupon = svc
        .submit_form(tenant_id, submission(&campaign.code, None))
        .await
        .unwrap();

    let redeemed = svc.redeem_coupon(tenant_id, &coupon.code).await.unwrap();
    assert_eq!(redeemed.status, CouponStatus::Redeemed);

    let err = svc.redeem_coupon(tenant_id, &coupon.code).await.unwrap_err();
    assert!(matches!(err, CouponlyError::AlreadyUsed { .. }));
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

async fn count_coupons(db: &Surreal<Db>) -> u64 {
    let mut result = db
        .query("SELECT count() AS total FROM coupon GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    rows.first().map(|r| r.total).unwrap_or(0)
}
