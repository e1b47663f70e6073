//! Services: orchestration between handlers and `medora_core`.

pub mod admin;
pub mod auth;
pub mod clinical;
pub mod cookies;
