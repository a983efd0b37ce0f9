// Shared types crossing the client-actor / hub boundary.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Notify};

use crate::domain::{ClientId, Envelope};

/// One event in a hub's single inbound queue: admission, stop-request, or a
/// client message to relay. The hub dispatcher drains exactly this queue.
pub enum HubCommand {
    Add {
        client_id: ClientId,
        lastnum: Option<u64>,
        outbound_tx: mpsc::Sender<Envelope>,
        reply_tx: oneshot::Sender<AddOutcome>,
    },
    Stop {
        client_id: ClientId,
        token: u64,
    },
    Message {
        client_id: ClientId,
        token: u64,
        body: Vec<u8>,
    },
}

/// Result of an `Add` admission request.
pub enum AddOutcome {
    /// The client is now a room member. `token` must be echoed back on every
    /// later `Stop`/`Message` command from this connection so the hub can
    /// tell a superseded reconnect apart from the current one.
    /// `replaced_signal` fires if a later reconnect for the same client id
    /// supersedes this connection; the connection actor should treat that as
    /// an immediate, Leaver-free teardown.
    Admitted {
        token: u64,
        replaced_signal: Arc<Notify>,
    },
    /// `lastnum` predates the retained replay window. The caller must close
    /// the socket with code 4000 and a reason containing "lastnum".
    RejectedLastNum,
}

/// What the game-ID directory keeps for a live hub.
#[derive(Clone)]
pub struct HubHandle {
    pub input_tx: mpsc::Sender<HubCommand>,
    pub active_connections: Arc<AtomicUsize>,
}
