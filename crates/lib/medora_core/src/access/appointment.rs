//! Appointment ownership and status rules.
//!
//! - admin: everything, including rescheduling and correcting terminal states
//! - doctor: own appointments; status changes along the state machine only
//! - patient: own appointments; the only edit is cancelling a booked one
//! - anyone else: nothing

use chrono::{DateTime, Utc};

use super::AccessError;
use super::actor::Actor;
use super::policy::{Action, OwnershipPolicy, no_access, owns};
use crate::models::clinical::{
    Appointment, AppointmentPatch, AppointmentStatus, NewAppointment, OwnerScope,
};

pub struct AppointmentPolicy;

impl OwnershipPolicy for AppointmentPolicy {
    type Resource = Appointment;
    const LABEL: &'static str = "Appointment";

    fn list_scope(actor: &Actor) -> Result<OwnerScope, AccessError> {
        match actor {
            Actor::Admin => Ok(OwnerScope::All),
            Actor::Doctor { profile_id } => Ok(OwnerScope::Doctor(profile_id.clone())),
            Actor::Patient { profile_id } => Ok(OwnerScope::Patient(profile_id.clone())),
            Actor::HealthAdvisor { .. } | Actor::Other(_) => Err(no_access(actor, "appointment")),
        }
    }

    fn authorize(actor: &Actor, action: Action, appt: &Appointment) -> Result<(), AccessError> {
        match (actor, action) {
            (Actor::Admin, _) => Ok(()),
            (_, Action::Delete) => Err(AccessError::NotAuthorized(
                "only administrators delete appointments".into(),
            )),
            (Actor::Doctor { profile_id }, _) => owns(profile_id, &appt.doctor_id),
            (Actor::Patient { profile_id }, _) => owns(profile_id, &appt.patient_id),
            (Actor::HealthAdvisor { .. } | Actor::Other(_), _) => {
                Err(no_access(actor, "appointment"))
            }
        }
    }
}

/// Booking request. Doctors and patients may omit their own side.
#[derive(Debug, Clone, Default)]
pub struct AppointmentDraft {
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

fn stamp(own: &str, requested: Option<String>, side: &str) -> Result<String, AccessError> {
    match requested {
        None => Ok(own.to_string()),
        Some(id) if id == own => Ok(id),
        Some(id) => Err(AccessError::NotAuthorized(format!(
            "cannot book for another {side} ({id})"
        ))),
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AccessError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AccessError::Validation(format!("{field} is required")))
}

/// Turn a booking request into an insertable appointment for `actor`.
pub fn authorize_create(
    actor: &Actor,
    draft: AppointmentDraft,
) -> Result<NewAppointment, AccessError> {
    let scheduled_at = draft
        .scheduled_at
        .ok_or_else(|| AccessError::Validation("scheduledAt is required".into()))?;
    let (doctor_id, patient_id) = match actor {
        Actor::Admin => (
            required(draft.doctor_id, "doctorId")?,
            required(draft.patient_id, "patientId")?,
        ),
        Actor::Doctor { profile_id } => (
            stamp(profile_id, draft.doctor_id, "doctor")?,
            required(draft.patient_id, "patientId")?,
        ),
        Actor::Patient { profile_id } => (
            required(draft.doctor_id, "doctorId")?,
            stamp(profile_id, draft.patient_id, "patient")?,
        ),
        Actor::HealthAdvisor { .. } | Actor::Other(_) => {
            return Err(no_access(actor, "appointment"));
        }
    };
    Ok(NewAppointment {
        doctor_id,
        patient_id,
        scheduled_at,
    })
}

/// Check an update against the actor's edit rights and the status machine.
///
/// Must run after [`AppointmentPolicy::authorize`] with [`Action::Update`].
/// Returns the patch to apply: a patient's empty patch means "cancel".
/// Non-admin patches carry the status they were checked against, so the
/// store refuses them if another writer moved the appointment first.
pub fn check_patch(
    actor: &Actor,
    current: &Appointment,
    patch: AppointmentPatch,
) -> Result<AppointmentPatch, AccessError> {
    let next = match actor {
        Actor::Admin => {
            if patch.is_empty() {
                return Err(AccessError::Validation("Nothing to update".into()));
            }
            return Ok(patch);
        }
        Actor::Doctor { .. } => {
            if patch.scheduled_at.is_some() {
                return Err(AccessError::NotAuthorized(
                    "doctors cannot reschedule appointments".into(),
                ));
            }
            patch
                .status
                .ok_or_else(|| AccessError::Validation("status is required".into()))?
        }
        Actor::Patient { .. } => {
            if patch.scheduled_at.is_some() {
                return Err(AccessError::NotAuthorized(
                    "patients cannot reschedule appointments".into(),
                ));
            }
            match patch.status.unwrap_or(AppointmentStatus::Cancelled) {
                AppointmentStatus::Cancelled => AppointmentStatus::Cancelled,
                other => {
                    return Err(AccessError::NotAuthorized(format!(
                        "patients may only cancel, not set {}",
                        other.as_str()
                    )));
                }
            }
        }
        Actor::HealthAdvisor { .. } | Actor::Other(_) => {
            return Err(no_access(actor, "appointment"));
        }
    };

    if current.status.is_terminal() {
        return Err(AccessError::Validation(format!(
            "Appointment is already {}",
            current.status.as_str()
        )));
    }
    if !current.status.can_transition_to(next) {
        return Err(AccessError::Validation(format!(
            "Cannot change status from {} to {}",
            current.status.as_str(),
            next.as_str()
        )));
    }
    Ok(AppointmentPatch {
        status: Some(next),
        scheduled_at: None,
        expected_status: Some(current.status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::policy::authorize_loaded;

    fn appointment(doctor: &str, patient: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "a1".into(),
            doctor_id: doctor.into(),
            patient_id: patient.into(),
            scheduled_at: Utc::now(),
            status,
            created_at: Utc::now(),
        }
    }

    fn doctor(id: &str) -> Actor {
        Actor::Doctor {
            profile_id: id.into(),
        }
    }

    fn patient(id: &str) -> Actor {
        Actor::Patient {
            profile_id: id.into(),
        }
    }

    #[test]
    fn doctor_updates_only_own_appointments() {
        let appt = appointment("d2", "p1", AppointmentStatus::Booked);
        assert!(AppointmentPolicy::authorize(&doctor("d2"), Action::Update, &appt).is_ok());
        let result =
            authorize_loaded::<AppointmentPolicy>(&doctor("d1"), Action::Update, Some(appt));
        assert!(matches!(result, Err(AccessError::NotAuthorized(_))));
    }

    #[test]
    fn foreign_reads_look_like_missing_rows() {
        let appt = appointment("d2", "p1", AppointmentStatus::Booked);
        let result =
            authorize_loaded::<AppointmentPolicy>(&patient("p9"), Action::Read, Some(appt));
        assert!(matches!(result, Err(AccessError::NotFound(_))));
        let result = authorize_loaded::<AppointmentPolicy>(&Actor::Admin, Action::Read, None);
        assert!(matches!(result, Err(AccessError::NotFound(_))));
    }

    #[test]
    fn admin_passes_every_check() {
        let appt = appointment("d2", "p1", AppointmentStatus::Cancelled);
        for action in [Action::Read, Action::Update, Action::Delete] {
            assert!(AppointmentPolicy::authorize(&Actor::Admin, action, &appt).is_ok());
        }
        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Booked),
            scheduled_at: None,
            expected_status: None,
        };
        let applied = check_patch(&Actor::Admin, &appt, patch).unwrap();
        assert_eq!(applied.status, Some(AppointmentStatus::Booked));
    }

    #[test]
    fn only_admin_deletes() {
        let appt = appointment("d1", "p1", AppointmentStatus::Booked);
        assert!(AppointmentPolicy::authorize(&doctor("d1"), Action::Delete, &appt).is_err());
        assert!(AppointmentPolicy::authorize(&patient("p1"), Action::Delete, &appt).is_err());
    }

    #[test]
    fn patient_may_only_cancel() {
        let appt = appointment("d1", "p1", AppointmentStatus::Booked);
        let owner = patient("p1");

        let cancel = AppointmentPatch {
            status: Some(AppointmentStatus::Cancelled),
            scheduled_at: None,
            expected_status: None,
        };
        assert_eq!(
            check_patch(&owner, &appt, cancel).unwrap().status,
            Some(AppointmentStatus::Cancelled)
        );
        assert_eq!(
            check_patch(&owner, &appt, AppointmentPatch::default())
                .unwrap()
                .status,
            Some(AppointmentStatus::Cancelled)
        );

        let complete = AppointmentPatch {
            status: Some(AppointmentStatus::Completed),
            scheduled_at: None,
            expected_status: None,
        };
        assert!(matches!(
            check_patch(&owner, &appt, complete),
            Err(AccessError::NotAuthorized(_))
        ));
        let reschedule = AppointmentPatch {
            status: Some(AppointmentStatus::Cancelled),
            scheduled_at: Some(Utc::now()),
            expected_status: None,
        };
        assert!(matches!(
            check_patch(&owner, &appt, reschedule),
            Err(AccessError::NotAuthorized(_))
        ));
    }

    #[test]
    fn doctors_follow_the_state_machine() {
        let booked = appointment("d1", "p1", AppointmentStatus::Booked);
        let complete = AppointmentPatch {
            status: Some(AppointmentStatus::Completed),
            scheduled_at: None,
            expected_status: None,
        };
        let applied = check_patch(&doctor("d1"), &booked, complete.clone()).unwrap();
        assert_eq!(applied.expected_status, Some(AppointmentStatus::Booked));

        let done = appointment("d1", "p1", AppointmentStatus::Completed);
        assert!(matches!(
            check_patch(&doctor("d1"), &done, complete),
            Err(AccessError::Validation(_))
        ));

        let reschedule = AppointmentPatch {
            status: None,
            scheduled_at: Some(Utc::now()),
            expected_status: None,
        };
        assert!(matches!(
            check_patch(&doctor("d1"), &booked, reschedule),
            Err(AccessError::NotAuthorized(_))
        ));
    }

    #[test]
    fn create_stamps_the_actor_side() {
        let draft = AppointmentDraft {
            doctor_id: None,
            patient_id: Some("p1".into()),
            scheduled_at: Some(Utc::now()),
        };
        let new = authorize_create(&doctor("d1"), draft.clone()).unwrap();
        assert_eq!(new.doctor_id, "d1");

        let foreign = AppointmentDraft {
            doctor_id: Some("d2".into()),
            ..draft.clone()
        };
        assert!(matches!(
            authorize_create(&doctor("d1"), foreign),
            Err(AccessError::NotAuthorized(_))
        ));
        assert!(matches!(
            authorize_create(&Actor::Admin, draft.clone()),
            Err(AccessError::Validation(_))
        ));
        assert!(matches!(
            authorize_create(
                &Actor::HealthAdvisor {
                    profile_id: "h1".into()
                },
                draft
            ),
            Err(AccessError::NotAuthorized(_))
        ));
    }
}
