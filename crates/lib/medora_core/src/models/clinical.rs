//! Clinical resource models: appointments, prescriptions, consultations.
//!
//! Each resource links to the role-profile rows allowed to act on it
//! (`doctor_id`, `patient_id`, `advisor_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Appointment lifecycle: `booked -> {completed, cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Transitions accepted for non-admin actors.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Booked, Self::Completed) | (Self::Booked, Self::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Consultation status. No transition rules beyond ownership apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "consultation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    #[default]
    Booked,
    Completed,
    Cancelled,
}

/// Which slice of a resource table a list query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerScope {
    All,
    Doctor(String),
    Patient(String),
    Advisor(String),
}

// =============================================================================
// Appointments
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub doctor_id: String,
    pub patient_id: String,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Apply only while the stored status still equals this value.
    pub expected_status: Option<AppointmentStatus>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.scheduled_at.is_none()
    }
}

// =============================================================================
// Prescriptions
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub diagnosis: String,
    pub medicines: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub doctor_id: String,
    pub patient_id: String,
    pub diagnosis: String,
    pub medicines: String,
}

#[derive(Debug, Clone, Default)]
pub struct PrescriptionPatch {
    pub diagnosis: Option<String>,
    pub medicines: Option<String>,
}

impl PrescriptionPatch {
    pub fn is_empty(&self) -> bool {
        self.diagnosis.is_none() && self.medicines.is_none()
    }
}

// =============================================================================
// Consultations
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: String,
    pub advisor_id: String,
    pub patient_id: String,
    pub consultation_at: DateTime<Utc>,
    pub notes: String,
    pub status: ConsultationStatus,
    pub created_at: DateTime<Utc>,
}

/// Consultation draft. `advisor_id` is stamped from the acting advisor; only
/// administrators supply it explicitly.
#[derive(Debug, Clone)]
pub struct NewConsultation {
    pub advisor_id: Option<String>,
    pub patient_id: String,
    pub consultation_at: DateTime<Utc>,
    pub notes: String,
    pub status: ConsultationStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ConsultationPatch {
    pub consultation_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub status: Option<ConsultationStatus>,
}

impl ConsultationPatch {
    pub fn is_empty(&self) -> bool {
        self.consultation_at.is_none() && self.notes.is_none() && self.status.is_none()
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Row counts for the dashboards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub users: i64,
    pub roles: i64,
    pub doctors: i64,
    pub health_advisors: i64,
    pub patients: i64,
    pub appointments: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booked_moves_to_either_terminal_state() {
        assert!(AppointmentStatus::Booked.can_transition_to(AppointmentStatus::Completed));
        assert!(AppointmentStatus::Booked.can_transition_to(AppointmentStatus::Cancelled));
        assert!(!AppointmentStatus::Booked.can_transition_to(AppointmentStatus::Booked));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for from in [AppointmentStatus::Completed, AppointmentStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in [
                AppointmentStatus::Booked,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ] {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }
}
