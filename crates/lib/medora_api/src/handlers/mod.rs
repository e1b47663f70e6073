//! Request handlers.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod consultations;
pub mod health;
pub mod health_advisor;
pub mod prescriptions;
