// Network adapter: the single WebSocket upgrade route for the relay.

pub mod client;

pub use client::ws_handler;
