//! HMAC-SHA256 request/response signing, mirroring the agent/server hash header contract.

// crates.io
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex-encoded HMAC-SHA256 of `body` keyed by `key`.
///
/// Panics only if `key` is empty; callers must check [`crate::model`]-level config for an empty
/// key before calling this and skip signing entirely, matching the agent/server's "hashing
/// disabled when no key is configured" behavior.
pub fn sign(body: &[u8], key: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");

	mac.update(body);
	hex::encode(mac.finalize().into_bytes())
}

/// Verify `signature` (hex-encoded) against `body` under `key` in constant time.
pub fn verify(body: &[u8], key: &[u8], signature: &str) -> bool {
	let Ok(expected) = hex::decode(signature) else {
		return false;
	};
	let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");

	mac.update(body);
	mac.verify_slice(&expected).is_ok()
}
