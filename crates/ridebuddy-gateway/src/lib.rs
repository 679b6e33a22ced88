//! Realtime chat gateway: session registry, chat operations and the
//! per-connection WebSocket loop.

pub mod auth;
pub mod chat;
pub mod connection;
pub mod registry;
