//! SurrealDB implementation of [`CouponRepository`].

use couponly_core::error::{CouponlyError, CouponlyResult};
use couponly_core::models::coupon::{Coupon, CouponStatus, CreateCoupon};
use couponly_core::repository::{CouponRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::campaign::{discount_kind_to_string, parse_discount_kind};

fn parse_status(s: &str) -> Result<CouponStatus, DbError> {
    match s {
        "Active" => Ok(CouponStatus::Active),
        "Redeemed" => Ok(CouponStatus::Redeemed),
        other => Err(DbError::Query(format!("unknown coupon status: {other}"))),
    }
}

/// DB-side row struct for queries where the UUID is already known.
///
/// Shared with the form-link repository, which reads the coupon it
/// created inside the consume transaction.
#[derive(Debug, SurrealValue)]
pub(crate) struct CouponRow {
    tenant_id: String,
    campaign_id: String,
    code: String,
    status: String,
    discount_kind: String,
    discount_value: u32,
    recipient_email: Option<String>,
    recipient_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl CouponRow {
    pub(crate) fn into_coupon(self, id: Uuid) -> Result<Coupon, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Query(format!("invalid tenant UUID: {e}")))?;
        let campaign_id = Uuid::parse_str(&self.campaign_id)
            .map_err(|e| DbError::Query(format!("invalid campaign UUID: {e}")))?;
        Ok(Coupon {
            id,
            tenant_id,
            campaign_id,
            code: self.code,
            status: parse_status(&self.status)?,
            discount_kind: parse_discount_kind(&self.discount_kind)?,
            discount_value: self.discount_value,
            recipient_email: self.recipient_email,
            recipient_name: self.recipient_name,
            created_at: self.created_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct CouponRowWithId {
    record_id: String,
    tenant_id: String,
    campaign_id: String,
    code: String,
    status: String,
    discount_kind: String,
    discount_value: u32,
    recipient_email: Option<String>,
    recipient_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl CouponRowWithId {
    fn try_into_coupon(self) -> Result<Coupon, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Query(format!("invalid tenant UUID: {e}")))?;
        let campaign_id = Uuid::parse_str(&self.campaign_id)
            .map_err(|e| DbError::Query(format!("invalid campaign UUID: {e}")))?;
        Ok(Coupon {
            id,
            tenant_id,
            campaign_id,
            code: self.code,
            status: parse_status(&self.status)?,
            discount_kind: parse_discount_kind(&self.discount_kind)?,
            discount_value: self.discount_value,
            recipient_email: self.recipient_email,
            recipient_name: self.recipient_name,
            created_at: self.created_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Coupon repository.
#[derive(Clone)]
pub struct SurrealCouponRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCouponRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CouponRepository for SurrealCouponRepository<C> {
    async fn create(&self, input: CreateCoupon) -> CouponlyResult<Coupon> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('coupon', $id) SET \
                 tenant_id = $tenant_id, \
                 campaign_id = $campaign_id, \
                 code = $code, \
                 status = 'Active', \
                 discount_kind = $discount_kind, \
                 discount_value = $discount_value, \
                 recipient_email = $recipient_email, \
                 recipient_name = $recipient_name",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("campaign_id", input.campaign_id.to_string()))
            .bind(("code", input.code))
            .bind((
                "discount_kind",
                discount_kind_to_string(input.discount_kind).to_string(),
            ))
            .bind(("discount_value", input.discount_value))
            .bind(("recipient_email", input.recipient_email))
            .bind(("recipient_name", input.recipient_name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<CouponRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "coupon".into(),
            id: id_str,
        })?;

        Ok(row.into_coupon(id)?)
    }

    async fn get_by_code(&self, tenant_id: Uuid, code: &str) -> CouponlyResult<Coupon> {
        let code_owned = code.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM coupon \
                 WHERE tenant_id = $tenant_id AND code = $code",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("code", code_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CouponRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "coupon".into(),
            id: format!("code={code_owned}"),
        })?;

        Ok(row.try_into_coupon()?)
    }

    async fn redeem(&self, tenant_id: Uuid, code: &str) -> CouponlyResult<Coupon> {
        let code_owned = code.to_string();

        // Conditional update: only an Active coupon flips to Redeemed.
        let mut result = self
            .db
            .query(
                "UPDATE coupon SET status = 'Redeemed' \
                 WHERE tenant_id = $tenant_id AND code = $code \
                 AND status = 'Active' \
                 RETURN meta::id(id) AS record_id, *",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("code", code_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CouponRowWithId> = result.take(0).map_err(DbError::from)?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(row.try_into_coupon()?);
        }

        // Zero rows affected: distinguish already-redeemed from absent.
        match self.get_by_code(tenant_id, &code_owned).await {
            Ok(_) => Err(CouponlyError::AlreadyUsed {
                entity: "coupon".into(),
                id: format!("code={code_owned}"),
            }),
            Err(e) => Err(e),
        }
    }

    async fn list_by_campaign(
        &self,
        tenant_id: Uuid,
        campaign_id: Uuid,
        pagination: Pagination,
    ) -> CouponlyResult<PaginatedResult<Coupon>> {
        let tenant_str = tenant_id.to_string();
        let campaign_str = campaign_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM coupon \
                 WHERE tenant_id = $tenant_id \
                 AND campaign_id = $campaign_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_str.clone()))
            .bind(("campaign_id", campaign_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM coupon \
                 WHERE tenant_id = $tenant_id \
                 AND campaign_id = $campaign_id \
                 ORDER BY created_at ASC LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_str))
            .bind(("campaign_id", campaign_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CouponRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(CouponRowWithId::try_into_coupon)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
