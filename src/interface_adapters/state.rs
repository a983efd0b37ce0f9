use crate::use_cases::Registry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Game-ID -> hub directory, shared by every connection.
    pub registry: Arc<Registry>,
    // Per-client inbound queue bound, applied when spawning a connection.
    pub client_inbound_queue_capacity: usize,
    // Set-Cookie Max-Age for the clientID cookie.
    pub cookie_max_age_secs: i64,
}
