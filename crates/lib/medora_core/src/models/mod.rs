//! Domain models shared by the store, the access layer and the HTTP API.

pub mod auth;
pub mod clinical;
pub mod role;
pub mod user;
