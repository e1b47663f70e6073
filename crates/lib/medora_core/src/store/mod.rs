//! Persistence collaborator.
//!
//! The access layer only ever talks to storage through these traits. Two
//! implementations ship: [`pg::PgStore`] over SQLx/PostgreSQL and
//! [`memory::MemoryStore`] for tests and local runs. Both enforce identifier
//! uniqueness and the role-reference check at write time, so a racing writer
//! surfaces as [`StoreError::Conflict`] rather than a crash.

pub mod memory;
pub mod pg;
pub mod seed;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::auth::SessionRecord;
use crate::models::clinical::{
    Appointment, AppointmentPatch, Consultation, ConsultationPatch, NewAppointment,
    NewConsultation, NewPrescription, OwnerScope, Prescription, PrescriptionPatch, Totals,
};
use crate::models::role::{ProfileKind, RolePatch, RoleRecord};
use crate::models::user::{NewUser, Profile, UserPatch, UserRecord};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Uniqueness or reference constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced row (role, profile) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Conflict message for a conditional appointment write that lost a race.
pub const STATUS_CHANGED: &str = "Appointment status changed";

/// Users and their credentials.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact match on email OR mobile.
    async fn find_user_by_identifier(&self, identifier: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn list_users(&self) -> StoreResult<Vec<UserRecord>>;

    /// Insert a user and, if the role requires one, its role-profile row.
    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord>;

    /// Apply a partial update; swaps role-profile rows on role change.
    async fn update_user(&self, user_id: &str, patch: UserPatch) -> StoreResult<Option<UserRecord>>;

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool>;
}

/// Role catalogue.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>>;

    async fn find_role_by_id(&self, role_id: &str) -> StoreResult<Option<RoleRecord>>;

    /// Case-insensitive lookup.
    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>>;

    /// `name` must already be normalized (trimmed, lowercase).
    async fn create_role(&self, name: &str, description: Option<&str>) -> StoreResult<RoleRecord>;

    async fn update_role(&self, role_id: &str, patch: RolePatch) -> StoreResult<Option<RoleRecord>>;

    /// Deletes the role unless a user references it at commit time.
    /// `Ok(false)` when no such role exists.
    async fn delete_role(&self, role_id: &str) -> StoreResult<bool>;
}

/// Doctor / health-advisor / patient profile rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile_id(&self, user_id: &str, kind: ProfileKind)
    -> StoreResult<Option<String>>;

    async fn get_profile(&self, kind: ProfileKind, profile_id: &str)
    -> StoreResult<Option<Profile>>;

    async fn list_profiles(&self, kind: ProfileKind) -> StoreResult<Vec<Profile>>;
}

/// Appointments, prescriptions and consultations.
#[async_trait]
pub trait ClinicalStore: Send + Sync {
    async fn list_appointments(&self, scope: &OwnerScope) -> StoreResult<Vec<Appointment>>;
    async fn get_appointment(&self, id: &str) -> StoreResult<Option<Appointment>>;
    async fn create_appointment(&self, new: &NewAppointment) -> StoreResult<Appointment>;
    /// Fails with [`StoreError::Conflict`] when `patch.expected_status` is set
    /// and no longer matches the stored row.
    async fn update_appointment(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> StoreResult<Option<Appointment>>;
    async fn delete_appointment(&self, id: &str) -> StoreResult<bool>;

    async fn list_prescriptions(&self, scope: &OwnerScope) -> StoreResult<Vec<Prescription>>;
    async fn get_prescription(&self, id: &str) -> StoreResult<Option<Prescription>>;
    async fn create_prescription(&self, new: &NewPrescription) -> StoreResult<Prescription>;
    async fn update_prescription(
        &self,
        id: &str,
        patch: &PrescriptionPatch,
    ) -> StoreResult<Option<Prescription>>;
    async fn delete_prescription(&self, id: &str) -> StoreResult<bool>;

    async fn list_consultations(&self, scope: &OwnerScope) -> StoreResult<Vec<Consultation>>;
    async fn get_consultation(&self, id: &str) -> StoreResult<Option<Consultation>>;
    /// `new.advisor_id` must be set by the caller.
    async fn create_consultation(&self, new: &NewConsultation) -> StoreResult<Consultation>;
    async fn update_consultation(
        &self,
        id: &str,
        patch: &ConsultationPatch,
    ) -> StoreResult<Option<Consultation>>;
    async fn delete_consultation(&self, id: &str) -> StoreResult<bool>;

    async fn totals(&self) -> StoreResult<Totals>;
    async fn count_consultations(&self, scope: &OwnerScope) -> StoreResult<i64>;
}

/// Server-tracked, revocable sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<SessionRecord>;

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<SessionRecord>>;

    async fn revoke_session(&self, session_id: &str) -> StoreResult<()>;

    /// Revoke every session of a user except `keep`.
    async fn revoke_user_sessions(&self, user_id: &str, keep: Option<&str>) -> StoreResult<()>;
}

/// The full persistence surface the application runs against.
#[async_trait]
pub trait Store: UserStore + RoleStore + ProfileStore + ClinicalStore + SessionStore {
    /// Cheap liveness probe.
    async fn ping(&self) -> bool;
}
