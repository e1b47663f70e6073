//! Consultation ownership rules.
//!
//! Health advisors own the consultations attributed to them. Patients may
//! read their own. Creation by an advisor always stamps that advisor.

use chrono::{DateTime, Utc};

use super::AccessError;
use super::actor::Actor;
use super::policy::{Action, OwnershipPolicy, no_access, owns};
use crate::models::clinical::{
    Consultation, ConsultationPatch, ConsultationStatus, NewConsultation, OwnerScope,
};

pub struct ConsultationPolicy;

impl OwnershipPolicy for ConsultationPolicy {
    type Resource = Consultation;
    const LABEL: &'static str = "Consultation";

    fn list_scope(actor: &Actor) -> Result<OwnerScope, AccessError> {
        match actor {
            Actor::Admin => Ok(OwnerScope::All),
            Actor::HealthAdvisor { profile_id } => Ok(OwnerScope::Advisor(profile_id.clone())),
            Actor::Patient { profile_id } => Ok(OwnerScope::Patient(profile_id.clone())),
            Actor::Doctor { .. } | Actor::Other(_) => Err(no_access(actor, "consultation")),
        }
    }

    fn authorize(actor: &Actor, action: Action, c: &Consultation) -> Result<(), AccessError> {
        match (actor, action) {
            (Actor::Admin, _) => Ok(()),
            (Actor::HealthAdvisor { profile_id }, _) => owns(profile_id, &c.advisor_id),
            (Actor::Patient { profile_id }, Action::Read) => owns(profile_id, &c.patient_id),
            (Actor::Patient { .. }, _) => Err(AccessError::NotAuthorized(
                "patients cannot edit consultations".into(),
            )),
            (Actor::Doctor { .. } | Actor::Other(_), _) => Err(no_access(actor, "consultation")),
        }
    }
}

/// Consultation request. Advisors may omit `advisor_id`.
#[derive(Debug, Clone, Default)]
pub struct ConsultationDraft {
    pub advisor_id: Option<String>,
    pub patient_id: Option<String>,
    pub consultation_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub status: Option<ConsultationStatus>,
}

pub fn authorize_create(
    actor: &Actor,
    draft: ConsultationDraft,
) -> Result<NewConsultation, AccessError> {
    let advisor_id = match actor {
        Actor::Admin => draft
            .advisor_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AccessError::Validation("advisorId is required".into()))?,
        Actor::HealthAdvisor { profile_id } => match draft.advisor_id {
            Some(id) if &id != profile_id => {
                return Err(AccessError::NotAuthorized(format!(
                    "cannot create consultations for another advisor ({id})"
                )));
            }
            _ => profile_id.clone(),
        },
        _ => return Err(no_access(actor, "consultation")),
    };

    let patient_id = draft
        .patient_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AccessError::Validation("patientId is required".into()))?;
    let consultation_at = draft
        .consultation_at
        .ok_or_else(|| AccessError::Validation("consultationAt is required".into()))?;

    Ok(NewConsultation {
        advisor_id: Some(advisor_id),
        patient_id,
        consultation_at,
        notes: draft.notes.unwrap_or_default(),
        status: draft.status.unwrap_or_default(),
    })
}

pub fn check_patch(patch: ConsultationPatch) -> Result<ConsultationPatch, AccessError> {
    if patch.is_empty() {
        return Err(AccessError::Validation("Nothing to update".into()));
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::policy::authorize_loaded;

    fn consultation() -> Consultation {
        Consultation {
            id: "c1".into(),
            advisor_id: "h1".into(),
            patient_id: "p1".into(),
            consultation_at: Utc::now(),
            notes: String::new(),
            status: ConsultationStatus::Booked,
            created_at: Utc::now(),
        }
    }

    fn advisor(id: &str) -> Actor {
        Actor::HealthAdvisor {
            profile_id: id.into(),
        }
    }

    #[test]
    fn advisor_owns_attributed_consultations() {
        for action in [Action::Read, Action::Update, Action::Delete] {
            assert!(ConsultationPolicy::authorize(&advisor("h1"), action, &consultation()).is_ok());
            assert!(ConsultationPolicy::authorize(&advisor("h2"), action, &consultation()).is_err());
        }
    }

    #[test]
    fn patient_reads_own_consultation() {
        let owner = Actor::Patient {
            profile_id: "p1".into(),
        };
        assert!(authorize_loaded::<ConsultationPolicy>(&owner, Action::Read, Some(consultation())).is_ok());
        assert!(matches!(
            authorize_loaded::<ConsultationPolicy>(&owner, Action::Delete, Some(consultation())),
            Err(AccessError::NotAuthorized(_))
        ));
    }

    #[test]
    fn advisor_creation_stamps_advisor() {
        let draft = ConsultationDraft {
            advisor_id: None,
            patient_id: Some("p1".into()),
            consultation_at: Some(Utc::now()),
            notes: Some("follow up".into()),
            status: None,
        };
        let new = authorize_create(&advisor("h1"), draft.clone()).unwrap();
        assert_eq!(new.advisor_id.as_deref(), Some("h1"));
        assert_eq!(new.status, ConsultationStatus::Booked);

        let foreign = ConsultationDraft {
            advisor_id: Some("h2".into()),
            ..draft.clone()
        };
        assert!(matches!(
            authorize_create(&advisor("h1"), foreign),
            Err(AccessError::NotAuthorized(_))
        ));
        assert!(matches!(
            authorize_create(&Actor::Admin, draft),
            Err(AccessError::Validation(_))
        ));
    }

    #[test]
    fn doctors_have_no_consultation_access() {
        let doctor = Actor::Doctor {
            profile_id: "d1".into(),
        };
        assert!(ConsultationPolicy::list_scope(&doctor).is_err());
    }
}
