//! SurrealDB implementation of [`CampaignRepository`].

use couponly_core::error::{CouponlyError, CouponlyResult};
use couponly_core::models::campaign::{Campaign, CreateCampaign, DiscountKind, UpdateCampaign};
use couponly_core::repository::{CampaignRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

pub(crate) fn parse_discount_kind(s: &str) -> Result<DiscountKind, DbError> {
    match s {
        "Percentage" => Ok(DiscountKind::Percentage),
        "Fixed" => Ok(DiscountKind::Fixed),
        other => Err(DbError::Query(format!("unknown discount kind: {other}"))),
    }
}

pub(crate) fn discount_kind_to_string(kind: DiscountKind) -> &'static str {
    match kind {
        DiscountKind::Percentage => "Percentage",
        DiscountKind::Fixed => "Fixed",
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct CampaignRow {
    tenant_id: String,
    name: String,
    code: String,
    discount_kind: String,
    discount_value: u32,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CampaignRow {
    fn into_campaign(self, id: Uuid) -> Result<Campaign, DbError> {
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Query(format!("invalid tenant UUID: {e}")))?;
        Ok(Campaign {
            id,
            tenant_id,
            name: self.name,
            code: self.code,
            discount_kind: parse_discount_kind(&self.discount_kind)?,
            discount_value: self.discount_value,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct CampaignRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    code: String,
    discount_kind: String,
    discount_value: u32,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CampaignRowWithId {
    fn try_into_campaign(self) -> Result<Campaign, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Query(format!("invalid tenant UUID: {e}")))?;
        Ok(Campaign {
            id,
            tenant_id,
            name: self.name,
            code: self.code,
            discount_kind: parse_discount_kind(&self.discount_kind)?,
            discount_value: self.discount_value,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Campaign repository.
#[derive(Clone)]
pub struct SurrealCampaignRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCampaignRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CampaignRepository for SurrealCampaignRepository<C> {
    async fn create(&self, input: CreateCampaign, code: String) -> CouponlyResult<Campaign> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('campaign', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, \
                 code = $code, \
                 discount_kind = $discount_kind, \
                 discount_value = $discount_value",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("code", code))
            .bind((
                "discount_kind",
                discount_kind_to_string(input.discount_kind).to_string(),
            ))
            .bind(("discount_value", input.discount_value))
            .await
            .map_err(DbError::from)?;

        let mut result = match result.check() {
            Ok(r) => r,
            // Unique (tenant_id, name) or (tenant_id, code) index hit.
            Err(e) if e.to_string().contains("already contains") => {
                return Err(CouponlyError::AlreadyExists {
                    entity: "campaign".into(),
                });
            }
            Err(e) => return Err(DbError::Query(e.to_string()).into()),
        };

        let rows: Vec<CampaignRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "campaign".into(),
            id: id_str,
        })?;

        Ok(row.into_campaign(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> CouponlyResult<Campaign> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('campaign', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CampaignRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "campaign".into(),
            id: id_str,
        })?;

        Ok(row.into_campaign(id)?)
    }

    async fn get_by_code(&self, tenant_id: Uuid, code: &str) -> CouponlyResult<Campaign> {
        let code_owned = code.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM campaign \
                 WHERE tenant_id = $tenant_id AND code = $code",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("code", code_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CampaignRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "campaign".into(),
            id: format!("code={code_owned}"),
        })?;

        Ok(row.try_into_campaign()?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateCampaign,
    ) -> CouponlyResult<Campaign> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.discount_kind.is_some() {
            sets.push("discount_kind = $discount_kind");
        }
        if input.discount_value.is_some() {
            sets.push("discount_value = $discount_value");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        sets.push("updated_at = time::now()");

        let sql = format!(
            "UPDATE type::record('campaign', $id) SET {} \
             WHERE tenant_id = $tenant_id RETURN AFTER",
            sets.join(", "),
        );

        let mut query = self
            .db
            .query(sql)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));
        if let Some(name) = input.name {
            query = query.bind(("name", name));
        }
        if let Some(kind) = input.discount_kind {
            query = query.bind(("discount_kind", discount_kind_to_string(kind).to_string()));
        }
        if let Some(value) = input.discount_value {
            query = query.bind(("discount_value", value));
        }
        if let Some(active) = input.active {
            query = query.bind(("active", active));
        }

        let result = query.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<CampaignRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "campaign".into(),
            id: id_str,
        })?;

        Ok(row.into_campaign(id)?)
    }

    async fn set_active(&self, tenant_id: Uuid, id: Uuid, active: bool) -> CouponlyResult<Campaign> {
        self.update(
            tenant_id,
            id,
            UpdateCampaign {
                active: Some(active),
                ..Default::default()
            },
        )
        .await
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> CouponlyResult<PaginatedResult<Campaign>> {
        let tenant_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM campaign \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM campaign \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CampaignRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(CampaignRowWithId::try_into_campaign)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
