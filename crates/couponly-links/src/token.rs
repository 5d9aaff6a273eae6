//! Opaque token and code generation.
//!
//! Form tokens are bearer capabilities: possession is permission to
//! submit once. They carry 256 bits of entropy and are base64url
//! encoded, so collisions are not expected in practice; the database's
//! unique index is the backstop.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Charset for human-facing codes: uppercase alphanumerics minus the
/// ambiguous glyphs (0/O, 1/I/L).
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

const CAMPAIGN_CODE_LEN: usize = 8;
const COUPON_CODE_LEN: usize = 12;

/// Generate a cryptographically random form token
/// (32 bytes → base64url-encoded, no padding, 43 chars).
pub fn generate_form_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn generate_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rand::Rng::random_range(&mut rng, 0..CODE_CHARSET.len());
            CODE_CHARSET[idx] as char
        })
        .collect()
}

/// Generate a campaign code (8 chars, unique per tenant by index).
pub fn generate_campaign_code() -> String {
    generate_code(CAMPAIGN_CODE_LEN)
}

/// Generate a coupon code (12 chars, unique per tenant by index).
pub fn generate_coupon_code() -> String {
    generate_code(COUPON_CODE_LEN)
}
