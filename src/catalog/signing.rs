//! Request signatures expected by the remote API.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::CatalogError;

type HmacSha256 = Hmac<Sha256>;

/// Signs a request.
///
/// The signed text is `endpoint + timestamp + nonce + METHOD + api_key`,
/// lowercased, where `endpoint` is the request path (with query) relative to
/// the API base URL. Returns the hex-encoded HMAC-SHA256 digest.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidSigningKey`] if the key is rejected by the MAC.
pub fn sign_request(
    endpoint: &str,
    timestamp: &str,
    nonce: &str,
    method: &str,
    api_key: &str,
    secret_key: &str,
) -> Result<String, CatalogError> {
    let raw = format!("{endpoint}{timestamp}{nonce}{method}{api_key}").to_lowercase();
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|_| CatalogError::InvalidSigningKey)?;
    mac.update(raw.as_bytes());
    Ok(to_hex(&mac.finalize().into_bytes()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
