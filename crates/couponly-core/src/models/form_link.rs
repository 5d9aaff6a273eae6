//! Form link domain model.
//!
//! A form link is a single-use bearer credential gating one anonymous
//! coupon-request submission. The token string is the only handle ever
//! exposed outside the admin dashboard; the internal id never reaches
//! the public form flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-use, tenant-scoped form link.
///
/// `used_at` transitions from `None` to a fixed timestamp exactly once,
/// enforced by a conditional update at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormLink {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub campaign_id: Uuid,
    /// Opaque unguessable token, globally unique (32 random bytes,
    /// base64url without padding).
    pub token: String,
    /// Set exactly once, at consumption time.
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl FormLink {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// Derived counts over a campaign's link set.
///
/// Always computed on read from the link rows themselves, never stored,
/// so `available + used == total` holds by construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkStats {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

impl LinkStats {
    /// Derive stats from a slice of links.
    pub fn derive(links: &[FormLink]) -> Self {
        let total = links.len() as u64;
        let used = links.iter().filter(|l| l.is_used()).count() as u64;
        Self {
            total,
            used,
            available: total - used,
        }
    }
}

/// Admin dashboard listing: every link for a campaign plus derived
/// statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksWithStats {
    pub links: Vec<FormLink>,
    pub statistics: LinkStats,
}
