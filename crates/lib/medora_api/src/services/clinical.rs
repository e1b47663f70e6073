//! Clinical resource service: appointments, prescriptions, consultations.
//!
//! Every operation resolves the caller's [`Actor`], loads the target row
//! before deciding, and only then touches storage for writes.

use medora_core::access::actor::Actor;
use medora_core::access::appointment::{self, AppointmentDraft, AppointmentPolicy};
use medora_core::access::consultation::{self, ConsultationDraft, ConsultationPolicy};
use medora_core::access::policy::{Action, OwnershipPolicy, authorize_loaded};
use medora_core::access::prescription::{self, PrescriptionDraft, PrescriptionPolicy};
use medora_core::models::auth::Principal;
use medora_core::models::clinical::{
    Appointment, AppointmentPatch, Consultation, ConsultationPatch, Prescription,
    PrescriptionPatch,
};
use medora_core::models::role::ProfileKind;
use medora_core::store::{ClinicalStore, ProfileStore, Store};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{
    CreateAppointmentRequest, CreateConsultationRequest, CreatePrescriptionRequest,
    UpdateAppointmentRequest, UpdateConsultationRequest, UpdatePrescriptionRequest,
};

async fn actor(store: &dyn Store, principal: &Principal) -> AppResult<Actor> {
    Ok(Actor::resolve(store, principal).await?)
}

/// 404 unless the referenced profile row exists.
async fn ensure_profile(store: &dyn Store, kind: ProfileKind, id: &str) -> AppResult<()> {
    match store.get_profile(kind, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("{} not found", kind.label()))),
    }
}

// =============================================================================
// Appointments
// =============================================================================

pub async fn list_appointments(
    store: &dyn Store,
    principal: &Principal,
) -> AppResult<Vec<Appointment>> {
    let actor = actor(store, principal).await?;
    let scope = AppointmentPolicy::list_scope(&actor)?;
    Ok(store.list_appointments(&scope).await?)
}

pub async fn get_appointment(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
) -> AppResult<Appointment> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_appointment(id).await?;
    Ok(authorize_loaded::<AppointmentPolicy>(
        &actor,
        Action::Read,
        loaded,
    )?)
}

pub async fn create_appointment(
    store: &dyn Store,
    principal: &Principal,
    body: CreateAppointmentRequest,
) -> AppResult<Appointment> {
    let actor = actor(store, principal).await?;
    let new = appointment::authorize_create(
        &actor,
        AppointmentDraft {
            doctor_id: body.doctor_id,
            patient_id: body.patient_id,
            scheduled_at: body.scheduled_at,
        },
    )?;
    ensure_profile(store, ProfileKind::Doctor, &new.doctor_id).await?;
    ensure_profile(store, ProfileKind::Patient, &new.patient_id).await?;

    let created = store.create_appointment(&new).await?;
    info!(appointment_id = %created.id, actor = %actor.describe(), "appointment booked");
    Ok(created)
}

pub async fn update_appointment(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
    body: UpdateAppointmentRequest,
) -> AppResult<Appointment> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_appointment(id).await?;
    let current = authorize_loaded::<AppointmentPolicy>(&actor, Action::Update, loaded)?;
    let patch = appointment::check_patch(
        &actor,
        &current,
        AppointmentPatch {
            status: body.status,
            scheduled_at: body.scheduled_at,
            expected_status: None,
        },
    )?;

    let updated = store
        .update_appointment(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Appointment not found".into()))?;
    info!(appointment_id = %id, status = updated.status.as_str(), actor = %actor.describe(), "appointment updated");
    Ok(updated)
}

pub async fn delete_appointment(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
) -> AppResult<()> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_appointment(id).await?;
    authorize_loaded::<AppointmentPolicy>(&actor, Action::Delete, loaded)?;
    if !store.delete_appointment(id).await? {
        return Err(AppError::NotFound("Appointment not found".into()));
    }
    info!(appointment_id = %id, "appointment deleted");
    Ok(())
}

// =============================================================================
// Prescriptions
// =============================================================================

pub async fn list_prescriptions(
    store: &dyn Store,
    principal: &Principal,
) -> AppResult<Vec<Prescription>> {
    let actor = actor(store, principal).await?;
    let scope = PrescriptionPolicy::list_scope(&actor)?;
    Ok(store.list_prescriptions(&scope).await?)
}

pub async fn get_prescription(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
) -> AppResult<Prescription> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_prescription(id).await?;
    Ok(authorize_loaded::<PrescriptionPolicy>(
        &actor,
        Action::Read,
        loaded,
    )?)
}

pub async fn create_prescription(
    store: &dyn Store,
    principal: &Principal,
    body: CreatePrescriptionRequest,
) -> AppResult<Prescription> {
    let actor = actor(store, principal).await?;
    let new = prescription::authorize_create(
        &actor,
        PrescriptionDraft {
            doctor_id: body.doctor_id,
            patient_id: body.patient_id,
            diagnosis: body.diagnosis,
            medicines: body.medicines,
        },
    )?;
    ensure_profile(store, ProfileKind::Doctor, &new.doctor_id).await?;
    ensure_profile(store, ProfileKind::Patient, &new.patient_id).await?;

    let created = store.create_prescription(&new).await?;
    info!(prescription_id = %created.id, actor = %actor.describe(), "prescription written");
    Ok(created)
}

pub async fn update_prescription(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
    body: UpdatePrescriptionRequest,
) -> AppResult<Prescription> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_prescription(id).await?;
    authorize_loaded::<PrescriptionPolicy>(&actor, Action::Update, loaded)?;
    let patch = prescription::check_patch(PrescriptionPatch {
        diagnosis: body.diagnosis,
        medicines: body.medicines,
    })?;

    let updated = store
        .update_prescription(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Prescription not found".into()))?;
    info!(prescription_id = %id, actor = %actor.describe(), "prescription updated");
    Ok(updated)
}

pub async fn delete_prescription(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
) -> AppResult<()> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_prescription(id).await?;
    authorize_loaded::<PrescriptionPolicy>(&actor, Action::Delete, loaded)?;
    if !store.delete_prescription(id).await? {
        return Err(AppError::NotFound("Prescription not found".into()));
    }
    info!(prescription_id = %id, "prescription deleted");
    Ok(())
}

// =============================================================================
// Consultations
// =============================================================================

pub async fn list_consultations(
    store: &dyn Store,
    principal: &Principal,
) -> AppResult<Vec<Consultation>> {
    let actor = actor(store, principal).await?;
    let scope = ConsultationPolicy::list_scope(&actor)?;
    Ok(store.list_consultations(&scope).await?)
}

pub async fn get_consultation(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
) -> AppResult<Consultation> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_consultation(id).await?;
    Ok(authorize_loaded::<ConsultationPolicy>(
        &actor,
        Action::Read,
        loaded,
    )?)
}

pub async fn create_consultation(
    store: &dyn Store,
    principal: &Principal,
    body: CreateConsultationRequest,
) -> AppResult<Consultation> {
    let actor = actor(store, principal).await?;
    let new = consultation::authorize_create(
        &actor,
        ConsultationDraft {
            advisor_id: body.advisor_id,
            patient_id: body.patient_id,
            consultation_at: body.consultation_at,
            notes: body.notes,
            status: body.status,
        },
    )?;
    if let Some(advisor_id) = new.advisor_id.as_deref() {
        ensure_profile(store, ProfileKind::HealthAdvisor, advisor_id).await?;
    }
    ensure_profile(store, ProfileKind::Patient, &new.patient_id).await?;

    let created = store.create_consultation(&new).await?;
    info!(consultation_id = %created.id, actor = %actor.describe(), "consultation created");
    Ok(created)
}

pub async fn update_consultation(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
    body: UpdateConsultationRequest,
) -> AppResult<Consultation> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_consultation(id).await?;
    authorize_loaded::<ConsultationPolicy>(&actor, Action::Update, loaded)?;
    let patch = consultation::check_patch(ConsultationPatch {
        consultation_at: body.consultation_at,
        notes: body.notes,
        status: body.status,
    })?;

    let updated = store
        .update_consultation(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Consultation not found".into()))?;
    info!(consultation_id = %id, actor = %actor.describe(), "consultation updated");
    Ok(updated)
}

pub async fn delete_consultation(
    store: &dyn Store,
    principal: &Principal,
    id: &str,
) -> AppResult<()> {
    let actor = actor(store, principal).await?;
    let loaded = store.get_consultation(id).await?;
    authorize_loaded::<ConsultationPolicy>(&actor, Action::Delete, loaded)?;
    if !store.delete_consultation(id).await? {
        return Err(AppError::NotFound("Consultation not found".into()));
    }
    info!(consultation_id = %id, "consultation deleted");
    Ok(())
}
