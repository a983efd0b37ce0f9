use std::env;

// Runtime/server constants, not protocol tuning.

pub fn http_port() -> u16 {
    env::var("RELAY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn hub_input_channel_capacity() -> usize {
    env::var("HUB_INPUT_CHANNEL_CAPACITY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1024)
}

pub fn hub_replay_buffer_len() -> usize {
    env::var("HUB_REPLAY_BUFFER_LEN")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(256)
}

pub fn client_inbound_queue_capacity() -> usize {
    env::var("CLIENT_INBOUND_QUEUE_CAPACITY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(32)
}

pub fn cookie_max_age_secs() -> i64 {
    env::var("COOKIE_MAX_AGE_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3_153_600_000)
}
