use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Generates a URL-safe, unguessable token with at least `entropy_bytes` of
/// randomness from a CSPRNG, matching the format (if not the exact bytes) of
/// Python's `secrets.token_urlsafe`.
///
/// Used for both expectation ids and alert trial ids; callers are expected
/// to pass at least 16 bytes per the data model's entropy requirement.
#[must_use]
pub fn generate_token(entropy_bytes: usize) -> String {
    let mut bytes = vec![0_u8; entropy_bytes];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
