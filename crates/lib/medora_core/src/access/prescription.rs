//! Prescription ownership rules.
//!
//! Readable by the prescribing doctor and the patient; written by the
//! prescribing doctor; deleted by administrators only.

use super::AccessError;
use super::actor::Actor;
use super::policy::{Action, OwnershipPolicy, no_access, owns};
use crate::models::clinical::{NewPrescription, OwnerScope, Prescription, PrescriptionPatch};

pub struct PrescriptionPolicy;

impl OwnershipPolicy for PrescriptionPolicy {
    type Resource = Prescription;
    const LABEL: &'static str = "Prescription";

    fn list_scope(actor: &Actor) -> Result<OwnerScope, AccessError> {
        match actor {
            Actor::Admin => Ok(OwnerScope::All),
            Actor::Doctor { profile_id } => Ok(OwnerScope::Doctor(profile_id.clone())),
            Actor::Patient { profile_id } => Ok(OwnerScope::Patient(profile_id.clone())),
            Actor::HealthAdvisor { .. } | Actor::Other(_) => Err(no_access(actor, "prescription")),
        }
    }

    fn authorize(actor: &Actor, action: Action, rx: &Prescription) -> Result<(), AccessError> {
        match (actor, action) {
            (Actor::Admin, _) => Ok(()),
            (_, Action::Delete) => Err(AccessError::NotAuthorized(
                "only administrators delete prescriptions".into(),
            )),
            (Actor::Doctor { profile_id }, _) => owns(profile_id, &rx.doctor_id),
            (Actor::Patient { profile_id }, Action::Read) => owns(profile_id, &rx.patient_id),
            (Actor::Patient { .. }, _) => Err(AccessError::NotAuthorized(
                "patients cannot edit prescriptions".into(),
            )),
            (Actor::HealthAdvisor { .. } | Actor::Other(_), _) => {
                Err(no_access(actor, "prescription"))
            }
        }
    }
}

/// Prescription request. A doctor may omit `doctor_id`.
#[derive(Debug, Clone, Default)]
pub struct PrescriptionDraft {
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub diagnosis: Option<String>,
    pub medicines: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, AccessError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AccessError::Validation(format!("{field} is required")))
}

pub fn authorize_create(
    actor: &Actor,
    draft: PrescriptionDraft,
) -> Result<NewPrescription, AccessError> {
    let doctor_id = match actor {
        Actor::Admin => required(draft.doctor_id, "doctorId")?,
        Actor::Doctor { profile_id } => match draft.doctor_id {
            Some(id) if &id != profile_id => {
                return Err(AccessError::NotAuthorized(format!(
                    "cannot prescribe as another doctor ({id})"
                )));
            }
            _ => profile_id.clone(),
        },
        _ => return Err(no_access(actor, "prescription")),
    };
    Ok(NewPrescription {
        doctor_id,
        patient_id: required(draft.patient_id, "patientId")?,
        diagnosis: required(draft.diagnosis, "diagnosis")?,
        medicines: required(draft.medicines, "medicines")?,
    })
}

/// Reject empty updates and blank fields.
pub fn check_patch(patch: PrescriptionPatch) -> Result<PrescriptionPatch, AccessError> {
    if patch.is_empty() {
        return Err(AccessError::Validation("Nothing to update".into()));
    }
    let non_blank = |v: Option<String>, field: &str| match v {
        Some(v) if v.trim().is_empty() => {
            Err(AccessError::Validation(format!("{field} cannot be empty")))
        }
        other => Ok(other),
    };
    Ok(PrescriptionPatch {
        diagnosis: non_blank(patch.diagnosis, "diagnosis")?,
        medicines: non_blank(patch.medicines, "medicines")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn rx() -> Prescription {
        Prescription {
            id: "r1".into(),
            doctor_id: "d1".into(),
            patient_id: "p1".into(),
            diagnosis: "flu".into(),
            medicines: "rest".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn patient_reads_but_never_writes() {
        let owner = Actor::Patient {
            profile_id: "p1".into(),
        };
        assert!(PrescriptionPolicy::authorize(&owner, Action::Read, &rx()).is_ok());
        assert!(PrescriptionPolicy::authorize(&owner, Action::Update, &rx()).is_err());
    }

    #[test]
    fn other_doctors_are_rejected() {
        let other = Actor::Doctor {
            profile_id: "d2".into(),
        };
        for action in [Action::Read, Action::Update] {
            assert!(matches!(
                PrescriptionPolicy::authorize(&other, action, &rx()),
                Err(AccessError::NotAuthorized(_))
            ));
        }
    }

    #[test]
    fn doctor_prescribes_as_self() {
        let actor = Actor::Doctor {
            profile_id: "d1".into(),
        };
        let draft = PrescriptionDraft {
            doctor_id: None,
            patient_id: Some("p1".into()),
            diagnosis: Some("flu".into()),
            medicines: Some("rest".into()),
        };
        assert_eq!(authorize_create(&actor, draft.clone()).unwrap().doctor_id, "d1");

        let impersonating = PrescriptionDraft {
            doctor_id: Some("d2".into()),
            ..draft
        };
        assert!(matches!(
            authorize_create(&actor, impersonating),
            Err(AccessError::NotAuthorized(_))
        ));
    }

    #[test]
    fn blank_fields_are_invalid() {
        let patch = PrescriptionPatch {
            diagnosis: Some("  ".into()),
            medicines: None,
        };
        assert!(matches!(check_patch(patch), Err(AccessError::Validation(_))));
        assert!(matches!(
            check_patch(PrescriptionPatch::default()),
            Err(AccessError::Validation(_))
        ));
    }
}
