// Domain layer: pure relay types and rules, no framework dependencies.

pub mod client_id;
pub mod envelope;
pub mod game_id;

pub use client_id::{client_id_or_new, new_client_id, COOKIE_NAME};
pub use envelope::{now_ms, ClientId, Envelope, Intent};
pub use game_id::is_valid_game_id;
