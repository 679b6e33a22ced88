//! Wire types shared by the REST API, the chat gateway and the store.

pub mod api;
pub mod events;
pub mod models;
