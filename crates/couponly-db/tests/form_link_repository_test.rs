//! Integration tests for the FormLink repository using in-memory
//! SurrealDB: batch creation, token lookup, tenant isolation, and the
//! atomic consume-and-issue transaction.

use std::sync::Arc;

use couponly_core::error::CouponlyError;
use couponly_core::models::campaign::{CreateCampaign, DiscountKind};
use couponly_core::models::coupon::{CouponStatus, CreateCoupon};
use couponly_core::models::tenant::CreateTenant;
use couponly_core::repository::{CampaignRepository, FormLinkRepository, TenantRepository};
use couponly_db::repository::{
    SurrealCampaignRepository, SurrealFormLinkRepository, SurrealTenantRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create a tenant and
/// an active campaign.
async fn setup() -> (
    Surreal<surrealdb::engine::local::Db>,
    Uuid, // tenant_id
    Uuid, // campaign_id
) {
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

    let campaign_repo = SurrealCampaignRepository::new(db.clone());
    let campaign = campaign_repo
        .create(
            CreateCampaign {
                tenant_id: tenant.id,
                name: "Spring Sale".into(),
                discount_kind: DiscountKind::Percentage,
                discount_value: 15,
            },
            "SPRING24".into(),
        )
        .await
        .unwrap();

    (db, tenant.id, campaign.id)
}

fn new_coupon(tenant_id: Uuid, campaign_id: Uuid, code: &str) -> CreateCoupon {
    CreateCoupon {
        tenant_id,
        campaign_id,
        code: code.into(),
        discount_kind: DiscountKind::Percentage,
        discount_value: 15,
        recipient_email: Some("shopper@example.com".into()),
        recipient_name: Some("Shopper".into()),
    }
}

#[tokio::test]
async fn create_batch_preserves_order_and_starts_unused() {
    let (db, tenant_id, campaign_id) = setup().await;
    let repo = SurrealFormLinkRepository::new(db);

    let tokens: Vec<String> = (0..5).map(|i| format!("batch-token-{i}")).collect();
    let links = repo
        .create_batch(tenant_id, campaign_id, tokens.clone())
        .await
        .unwrap();

    assert_eq!(links.len(), 5);
    for (link, token) in links.iter().zip(&tokens) {
        assert_eq!(&link.token, token);
        assert!(link.used_at.is_none());
        assert_eq!(link.tenant_id, tenant_id);
        assert_eq!(link.campaign_id, campaign_id);
    }
}

#[tokio::test]
async fn duplicate_token_fails_whole_batch() {
    let (db, tenant_id, campaign_id) = setup().await;
    let repo = SurrealFormLinkRepository::new(db);

    repo.create_batch(tenant_id, campaign_id, vec!["dup-token".into()])
        .await
        .unwrap();

    // A batch containing a colliding token is rolled back entirely;
    // the fresh token must not survive the failed batch.
    let err = repo
        .create_batch(
            tenant_id,
            campaign_id,
            vec!["fresh-token".into(), "dup-token".into()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::Database(_)));

    let err = repo.get_by_token(tenant_id, "fresh-token").await.unwrap_err();
    assert!(matches!(err, CouponlyError::NotFound { .. }));
}

#[tokio::test]
async fn get_by_token_enforces_tenant_scope() {
    let (db, tenant_id, campaign_id) = setup().await;
    let tenant_repo = SurrealTenantRepository::new(db.clone());
    let other = tenant_repo
        .create(CreateTenant {
            name: "Other Tenant".into(),
            slug: "other-tenant".into(),
            metadata: None,
        })
        .await
        .unwrap();

    let repo = SurrealFormLinkRepository::new(db);
    repo.create_batch(tenant_id, campaign_id, vec!["scoped-token".into()])
        .await
        .unwrap();

    // Same token queried under another tenant behaves exactly like a
    // nonexistent token.
    let err = repo.get_by_token(other.id, "scoped-token").await.unwrap_err();
    assert!(matches!(err, CouponlyError::NotFound { .. }));

    let link = repo.get_by_token(tenant_id, "scoped-token").await.unwrap();
    assert_eq!(link.token, "scoped-token");
}

#[tokio::test]
async fn consume_and_issue_marks_link_and_creates_coupon() {
    let (db, tenant_id, campaign_id) = setup().await;
    let repo = SurrealFormLinkRepository::new(db);

    repo.create_batch(tenant_id, campaign_id, vec!["consume-me".into()])
        .await
        .unwrap();

    let coupon = repo
        .consume_and_issue(
            tenant_id,
            campaign_id,
            "consume-me",
            new_coupon(tenant_id, campaign_id, "COUPON-ONE"),
        )
        .await
        .unwrap();

    assert_eq!(coupon.status, CouponStatus::Active);
    assert_eq!(coupon.code, "COUPON-ONE");
    assert_eq!(coupon.discount_value, 15);

    let link = repo.get_by_token(tenant_id, "consume-me").await.unwrap();
    assert!(link.used_at.is_some(), "link must be marked used");
}

#[tokio::test]
async fn second_consume_fails_with_already_used() {
    let (db, tenant_id, campaign_id) = setup().await;
    let repo = SurrealFormLinkRepository::new(db.clone());

    repo.create_batch(tenant_id, campaign_id, vec!["once-only".into()])
        .await
        .unwrap();

    repo.consume_and_issue(
        tenant_id,
        campaign_id,
        "once-only",
        new_coupon(tenant_id, campaign_id, "COUPON-A"),
    )
    .await
    .unwrap();

    let err = repo
        .consume_and_issue(
            tenant_id,
            campaign_id,
            "once-only",
            new_coupon(tenant_id, campaign_id, "COUPON-B"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::AlreadyUsed { .. }));

    // The failed attempt must not have issued a second coupon.
    assert_eq!(count_coupons(&db).await, 1);
}

#[tokio::test]
async fn consume_rejects_campaign_mismatch() {
    let (db, tenant_id, campaign_id) = setup().await;
    let campaign_repo = SurrealCampaignRepository::new(db.clone());
    let other_campaign = campaign_repo
        .create(
            CreateCampaign {
                tenant_id,
                name: "Other Campaign".into(),
                discount_kind: DiscountKind::Fixed,
                discount_value: 100,
            },
            "OTHERCMP".into(),
        )
        .await
        .unwrap();

    let repo = SurrealFormLinkRepository::new(db);
    repo.create_batch(tenant_id, campaign_id, vec!["wrong-campaign".into()])
        .await
        .unwrap();

    // Token generated for one campaign is not consumable by another.
    let err = repo
        .consume_and_issue(
            tenant_id,
            other_campaign.id,
            "wrong-campaign",
            new_coupon(tenant_id, other_campaign.id, "COUPON-X"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CouponlyError::NotFound { .. }));

    // Link stays unused for its legitimate campaign.
    let link = repo.get_by_token(tenant_id, "wrong-campaign").await.unwrap();
    assert!(link.used_at.is_none());
}

#[tokio::test]
async fn concurrent_consume_yields_exactly_one_coupon() {
    let (db, tenant_id, campaign_id) = setup().await;
    let repo = Arc::new(SurrealFormLinkRepository::new(db.clone()));

    repo.create_batch(tenant_id, campaign_id, vec!["raced-token".into()])
        .await
        .unwrap();

    let a = {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move {
            repo.consume_and_issue(
                tenant_id,
                campaign_id,
                "raced-token",
                new_coupon(tenant_id, campaign_id, "RACE-A"),
            )
            .await
        })
    };
    let b = {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move {
            repo.consume_and_issue(
                tenant_id,
                campaign_id,
                "raced-token",
                new_coupon(tenant_id, campaign_id, "RACE-B"),
            )
            .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one racer may win the token");

    // Never two coupons, never zero.
    assert_eq!(count_coupons(&db).await, 1);
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Count coupon rows directly on the raw connection.
async fn count_coupons(db: &Surreal<surrealdb::engine::local::Db>) -> u64 {
    let mut result = db
        .query("SELECT count() AS total FROM coupon GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    rows.first().map(|r| r.total).unwrap_or(0)
}
