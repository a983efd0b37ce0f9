// Envelope: the hub's unit of emission, and the pure data shared by every
// room participant. No framework or transport types leak in here; wire
// encoding lives in interface_adapters::protocol.

use std::time::{SystemTime, UNIX_EPOCH};

pub type ClientId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Welcome,
    Receipt,
    Peer,
    Joiner,
    Leaver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub intent: Intent,
    pub from: Vec<ClientId>,
    pub to: Vec<ClientId>,
    pub num: u64,
    pub time_ms: u64,
    pub body: Option<Vec<u8>>,
}

impl Envelope {
    pub fn welcome(existing_members: Vec<ClientId>, new_member: ClientId, num: u64, time_ms: u64) -> Self {
        Envelope {
            intent: Intent::Welcome,
            from: existing_members,
            to: vec![new_member],
            num,
            time_ms,
            body: None,
        }
    }

    pub fn joiner(new_member: ClientId, existing_members: Vec<ClientId>, num: u64, time_ms: u64) -> Self {
        Envelope {
            intent: Intent::Joiner,
            from: vec![new_member],
            to: existing_members,
            num,
            time_ms,
            body: None,
        }
    }

    pub fn leaver(departed: ClientId, survivors: Vec<ClientId>, num: u64, time_ms: u64) -> Self {
        Envelope {
            intent: Intent::Leaver,
            from: vec![departed],
            to: survivors,
            num,
            time_ms,
            body: None,
        }
    }

    pub fn receipt(sender: ClientId, num: u64, time_ms: u64, body: Vec<u8>) -> Self {
        Envelope {
            intent: Intent::Receipt,
            from: vec![sender.clone()],
            to: vec![sender],
            num,
            time_ms,
            body: Some(body),
        }
    }

    pub fn peer(sender: ClientId, other_members: Vec<ClientId>, num: u64, time_ms: u64, body: Vec<u8>) -> Self {
        Envelope {
            intent: Intent::Peer,
            from: vec![sender],
            to: other_members,
            num,
            time_ms,
            body: Some(body),
        }
    }

    /// Recipients this envelope was actually sent to, for replay-buffer tagging.
    pub fn recipients(&self) -> &[ClientId] {
        &self.to
    }
}

/// Wall-clock milliseconds since the Unix epoch, for `Time` stamping at emission.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
