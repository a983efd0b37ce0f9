// ClientID service: a pure function over cookie values, with no framework dependencies.

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the cookie the HTTP upgrade layer reads and (re-)writes.
pub const COOKIE_NAME: &str = "clientID";

/// Returns the client id carried by a cookie value, if any.
///
/// Framework-agnostic: callers extract the raw cookie value (e.g. via a
/// `CookieJar`) and hand it here rather than this module depending on axum.
pub fn client_id_from_cookie_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Mints a fresh, process-unique client id: `<unix-seconds>.<random-31-bit-int>`.
pub fn new_client_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let rand_part: u32 = rand::rng().random_range(0..=0x7fff_ffffu32);
    format!("{secs}.{rand_part}")
}

/// Returns the cookie's client id, or mints a new one if absent/blank.
pub fn client_id_or_new(value: Option<&str>) -> String {
    client_id_from_cookie_value(value).unwrap_or_else(new_client_id)
}
