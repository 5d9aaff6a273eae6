//! SurrealDB implementation of [`FormLinkRepository`].
//!
//! The consume path is the one concurrency-sensitive operation in the
//! platform: marking a link used and issuing its coupon happen inside
//! a single transaction, with the mark implemented as a conditional
//! update (`used_at IS NONE`) so two racing submissions can never both
//! succeed.
//!
//! Token lookups bind the value as `$form_token`: `$token` is a
//! protected SurrealDB parameter (it holds the session auth token) and
//! rejects `bind`.

use std::collections::HashMap;

use couponly_core::error::{CouponlyError, CouponlyResult};
use couponly_core::models::coupon::{Coupon, CreateCoupon};
use couponly_core::models::form_link::FormLink;
use couponly_core::repository::FormLinkRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::campaign::discount_kind_to_string;
use crate::repository::coupon::CouponRow;

/// THROW marker raised when the conditional consume matches no row,
/// cancelling the transaction before the coupon insert.
const LINK_UNAVAILABLE: &str = "form link unavailable";

/// Per-link payload for the batch insert.
#[derive(Debug, SurrealValue)]
struct NewLinkRow {
    id: String,
    token: String,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct FormLinkRowWithId {
    record_id: String,
    tenant_id: String,
    campaign_id: String,
    token: String,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl FormLinkRowWithId {
    fn try_into_form_link(self) -> Result<FormLink, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Query(format!("invalid tenant UUID: {e}")))?;
        let campaign_id = Uuid::parse_str(&self.campaign_id)
            .map_err(|e| DbError::Query(format!("invalid campaign UUID: {e}")))?;
        Ok(FormLink {
            id,
            tenant_id,
            campaign_id,
            token: self.token,
            used_at: self.used_at,
            created_at: self.created_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the FormLink repository.
#[derive(Clone)]
pub struct SurrealFormLinkRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFormLinkRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Count rows holding this token under any tenant. Used only to
    /// log cross-tenant probes distinctly; the caller still reports
    /// plain not-found.
    async fn token_exists_anywhere(&self, token: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM form_link \
                 WHERE token = $form_token GROUP ALL",
            )
            .bind(("form_token", token.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    /// Side-effect-free classification for a consume that matched no
    /// row: already used, wrong campaign, or absent under the tenant.
    async fn classify_unavailable(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
        token: &str,
    ) -> CouponlyError {
        match self.get_by_token(tenant_id, token).await {
            Ok(link) if link.campaign_id != campaign_id => {
                warn!(
                    tenant_id = %tenant_id,
                    expected_campaign = %campaign_id,
                    actual_campaign = %link.campaign_id,
                    "Form token presented for a different campaign"
                );
                CouponlyError::NotFound {
                    entity: "form_link".into(),
                    id: "token".into(),
                }
            }
            Ok(link) if link.is_used() => CouponlyError::AlreadyUsed {
                entity: "form_link".into(),
                id: link.id.to_string(),
            },
            // Unused and campaign-matching yet not consumed: the
            // transaction failed for a reason the consume predicate
            // cannot explain.
            Ok(_) => CouponlyError::Database("consume transaction matched no row".into()),
            Err(e) => e,
        }
    }
}

impl<C: Connection> FormLinkRepository for SurrealFormLinkRepository<C> {
    async fn create_batch(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
        tokens: Vec<String>,
    ) -> CouponlyResult<Vec<FormLink>> {
        let new_rows: Vec<NewLinkRow> = tokens
            .iter()
            .map(|token| NewLinkRow {
                id: Uuid::new_v4().to_string(),
                token: token.clone(),
            })
            .collect();

        // All-or-nothing insert: a unique-index violation on any token
        // rolls the whole batch back and surfaces as a database error.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 FOR $link IN $links { \
                     CREATE type::record('form_link', $link.id) SET \
                     tenant_id = $tenant_id, \
                     campaign_id = $campaign_id, \
                     token = $link.token; \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("links", new_rows))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("campaign_id", campaign_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        // Read the batch back; order follows the input token order.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM form_link \
                 WHERE tenant_id = $tenant_id \
                 AND campaign_id = $campaign_id \
                 AND token IN $tokens",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("campaign_id", campaign_id.to_string()))
            .bind(("tokens", tokens.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FormLinkRowWithId> = result.take(0).map_err(DbError::from)?;
        let mut by_token: HashMap<String, FormLink> = rows
            .into_iter()
            .map(|row| row.try_into_form_link().map(|l| (l.token.clone(), l)))
            .collect::<Result<_, _>>()?;

        tokens
            .iter()
            .map(|token| {
                by_token.remove(token).ok_or_else(|| {
                    DbError::NotFound {
                        entity: "form_link".into(),
                        id: "token".into(),
                    }
                    .into()
                })
            })
            .collect()
    }

    async fn get_by_token(&self, tenant_id: Uuid, token: &str) -> CouponlyResult<FormLink> {
        let token_owned = token.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM form_link \
                 WHERE tenant_id = $tenant_id AND token = $form_token",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("form_token", token_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FormLinkRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.try_into_form_link()?),
            None => {
                // Same external answer either way; the cross-tenant
                // case is only distinguished in the logs.
                if self.token_exists_anywhere(&token_owned).await? {
                    warn!(
                        tenant_id = %tenant_id,
                        "Form token exists under another tenant"
                    );
                }
                Err(CouponlyError::NotFound {
                    entity: "form_link".into(),
                    id: "token".into(),
                })
            }
        }
    }

    async fn consume_and_issue(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
        token: &str,
        coupon: CreateCoupon,
    ) -> CouponlyResult<Coupon> {
        let coupon_id = Uuid::new_v4();
        let coupon_id_str = coupon_id.to_string();

        let mut result = self
            .db
            .query(format!(
                "BEGIN TRANSACTION; \
                 LET $consumed = UPDATE form_link SET used_at = time::now() \
                     WHERE tenant_id = $tenant_id \
                     AND campaign_id = $campaign_id \
                     AND token = $form_token \
                     AND used_at IS NONE \
                     RETURN AFTER; \
                 IF array::len($consumed) == 0 {{ THROW '{LINK_UNAVAILABLE}' }}; \
                 CREATE type::record('coupon', $coupon_id) SET \
                     tenant_id = $tenant_id, \
                     campaign_id = $campaign_id, \
                     code = $code, \
                     status = 'Active', \
                     discount_kind = $discount_kind, \
                     discount_value = $discount_value, \
                     recipient_email = $recipient_email, \
                     recipient_name = $recipient_name; \
                 COMMIT TRANSACTION;"
            ))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("campaign_id", campaign_id.to_string()))
            .bind(("form_token", token.to_string()))
            .bind(("coupon_id", coupon_id_str.clone()))
            .bind(("code", coupon.code))
            .bind((
                "discount_kind",
                discount_kind_to_string(coupon.discount_kind).to_string(),
            ))
            .bind(("discount_value", coupon.discount_value))
            .bind(("recipient_email", coupon.recipient_email))
            .bind(("recipient_name", coupon.recipient_name))
            .await
            .map_err(DbError::from)?;

        let errors = result.take_errors();
        if !errors.is_empty() {
            // THROW cancels the transaction; the marker message is on
            // one statement while the others report the cancellation.
            if errors.values().any(|e| e.to_string().contains(LINK_UNAVAILABLE)) {
                return Err(self.classify_unavailable(tenant_id, campaign_id, token).await);
            }
            let msg = errors
                .values()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DbError::Query(msg).into());
        }

        // Transaction committed; read the coupon it created.
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('coupon', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", coupon_id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CouponRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "coupon".into(),
            id: coupon_id_str,
        })?;

        Ok(row.into_coupon(coupon_id)?)
    }

    async fn list_by_campaign(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
    ) -> CouponlyResult<Vec<FormLink>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM form_link \
                 WHERE tenant_id = $tenant_id \
                 AND campaign_id = $campaign_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("campaign_id", campaign_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FormLinkRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_form_link().map_err(Into::into))
            .collect()
    }
}
