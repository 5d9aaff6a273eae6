//! SurrealDB repository implementations.

mod campaign;
mod coupon;
mod form_link;
mod tenant;

pub use campaign::SurrealCampaignRepository;
pub use coupon::SurrealCouponRepository;
pub use form_link::SurrealFormLinkRepository;
pub use tenant::SurrealTenantRepository;
