//! In-memory store.
//!
//! Mirrors the constraints of the PostgreSQL schema (unique identifiers,
//! case-insensitive role names, restricted deletes, profile rows per role)
//! under one `RwLock`, so every write is atomic with respect to its checks.
//! Used by the test suites and for running the server without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    ClinicalStore, ProfileStore, RoleStore, STATUS_CHANGED, SessionStore, Store, StoreError,
    StoreResult, UserStore,
};
use crate::models::auth::SessionRecord;
use crate::models::clinical::{
    Appointment, AppointmentPatch, AppointmentStatus, Consultation, ConsultationPatch,
    NewAppointment, NewConsultation, NewPrescription, OwnerScope, Prescription, PrescriptionPatch,
    Totals,
};
use crate::models::role::{ProfileKind, Role, RolePatch, RoleRecord};
use crate::models::user::{NewUser, Profile, UserPatch, UserRecord};
use crate::uuid::new_id;

#[derive(Debug, Clone)]
struct RoleRow {
    id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct UserRow {
    id: String,
    email: Option<String>,
    mobile: Option<String>,
    name: Option<String>,
    password_hash: Option<String>,
    role_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ProfileRow {
    id: String,
    user_id: String,
    name: Option<String>,
    specialization: Option<String>,
}

#[derive(Debug, Default)]
struct Data {
    roles: Vec<RoleRow>,
    users: Vec<UserRow>,
    profiles: HashMap<ProfileKind, Vec<ProfileRow>>,
    appointments: Vec<Appointment>,
    prescriptions: Vec<Prescription>,
    consultations: Vec<Consultation>,
    sessions: Vec<SessionRecord>,
}

/// [`Store`] kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Data>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name and specialization of a profile row. Staff
    /// details are maintained outside the access layer; this exists for
    /// fixtures.
    pub async fn set_profile_details(
        &self,
        kind: ProfileKind,
        profile_id: &str,
        name: Option<&str>,
        specialization: Option<&str>,
    ) -> bool {
        let mut data = self.data.write().await;
        match data
            .profiles
            .entry(kind)
            .or_default()
            .iter_mut()
            .find(|p| p.id == profile_id)
        {
            Some(profile) => {
                profile.name = name.map(str::to_string);
                profile.specialization = specialization.map(str::to_string);
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

impl Data {
    fn role(&self, role_id: &str) -> Option<&RoleRow> {
        self.roles.iter().find(|r| r.id == role_id)
    }

    fn role_record(&self, row: &RoleRow) -> RoleRecord {
        let user_count = self.users.iter().filter(|u| u.role_id == row.id).count();
        RoleRecord {
            id: row.id.clone(),
            name: row.name.clone(),
            description: row.description.clone(),
            created_at: row.created_at,
            user_count: i64::try_from(user_count).unwrap_or(i64::MAX),
        }
    }

    fn user_record(&self, row: &UserRow) -> UserRecord {
        UserRecord {
            id: row.id.clone(),
            email: row.email.clone(),
            mobile: row.mobile.clone(),
            name: row.name.clone(),
            password_hash: row.password_hash.clone(),
            role_id: row.role_id.clone(),
            role_name: self
                .role(&row.role_id)
                .map(|r| r.name.clone())
                .unwrap_or_default(),
            created_at: row.created_at,
        }
    }

    fn profiles(&self, kind: ProfileKind) -> &[ProfileRow] {
        self.profiles.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    fn profile_exists(&self, kind: ProfileKind, profile_id: &str) -> bool {
        self.profiles(kind).iter().any(|p| p.id == profile_id)
    }

    fn profile_of(&self, kind: ProfileKind, user_id: &str) -> Option<&ProfileRow> {
        self.profiles(kind).iter().find(|p| p.user_id == user_id)
    }

    /// Whether any clinical row points at the profile.
    fn profile_referenced(&self, kind: ProfileKind, profile_id: &str) -> bool {
        match kind {
            ProfileKind::Doctor => {
                self.appointments.iter().any(|a| a.doctor_id == profile_id)
                    || self.prescriptions.iter().any(|p| p.doctor_id == profile_id)
            }
            ProfileKind::Patient => {
                self.appointments.iter().any(|a| a.patient_id == profile_id)
                    || self.prescriptions.iter().any(|p| p.patient_id == profile_id)
                    || self.consultations.iter().any(|c| c.patient_id == profile_id)
            }
            ProfileKind::HealthAdvisor => {
                self.consultations.iter().any(|c| c.advisor_id == profile_id)
            }
        }
    }

    fn identifier_taken(&self, email: Option<&str>, mobile: Option<&str>, except: &str) -> bool {
        self.users.iter().any(|u| {
            u.id != except
                && ((email.is_some() && u.email.as_deref() == email)
                    || (mobile.is_some() && u.mobile.as_deref() == mobile))
        })
    }

    fn role_name_taken(&self, name: &str, except: &str) -> bool {
        self.roles
            .iter()
            .any(|r| r.id != except && r.name.eq_ignore_ascii_case(name))
    }

    fn add_profile(&mut self, kind: ProfileKind, user_id: &str, name: Option<String>) {
        if self.profile_of(kind, user_id).is_some() {
            return;
        }
        self.profiles.entry(kind).or_default().push(ProfileRow {
            id: new_id(),
            user_id: user_id.to_string(),
            name,
            specialization: None,
        });
    }

    fn remove_profile(&mut self, kind: ProfileKind, user_id: &str) -> StoreResult<()> {
        if let Some(profile) = self.profile_of(kind, user_id) {
            if self.profile_referenced(kind, &profile.id) {
                return Err(StoreError::Conflict(
                    "User still has clinical records under the current role".into(),
                ));
            }
            let profile_id = profile.id.clone();
            if let Some(rows) = self.profiles.get_mut(&kind) {
                rows.retain(|p| p.id != profile_id);
            }
        }
        Ok(())
    }

    fn party_exists(&self, kind: ProfileKind, profile_id: &str) -> StoreResult<()> {
        if self.profile_exists(kind, profile_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("{} not found", kind.label())))
        }
    }
}

fn in_scope(scope: &OwnerScope, doctor: Option<&str>, advisor: Option<&str>, patient: &str) -> bool {
    match scope {
        OwnerScope::All => true,
        OwnerScope::Patient(id) => patient == id,
        OwnerScope::Doctor(id) => doctor == Some(id.as_str()),
        OwnerScope::Advisor(id) => advisor == Some(id.as_str()),
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_identifier(&self, identifier: &str) -> StoreResult<Option<UserRecord>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .find(|u| {
                u.email.as_deref() == Some(identifier) || u.mobile.as_deref() == Some(identifier)
            })
            .map(|u| data.user_record(u)))
    }

    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| data.user_record(u)))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .map(|u| data.user_record(u)))
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        let data = self.data.read().await;
        Ok(data.users.iter().rev().map(|u| data.user_record(u)).collect())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord> {
        let mut data = self.data.write().await;
        let role = data
            .role(&new.role_id)
            .map(|r| Role::from_name(&r.name))
            .ok_or_else(|| StoreError::NotFound("Role not found".into()))?;
        if new.email.is_none() && new.mobile.is_none() {
            return Err(StoreError::Conflict(
                "User needs an email or a mobile number".into(),
            ));
        }
        if data.identifier_taken(new.email.as_deref(), new.mobile.as_deref(), "") {
            return Err(StoreError::Conflict(
                "User with this mobile or email already exists".into(),
            ));
        }

        let row = UserRow {
            id: new_id(),
            email: new.email,
            mobile: new.mobile,
            name: new.name,
            password_hash: new.password_hash,
            role_id: new.role_id,
            created_at: Utc::now(),
        };
        if let Some(kind) = role.profile_kind() {
            data.add_profile(kind, &row.id, row.name.clone());
        }
        let record = data.user_record(&row);
        data.users.push(row);
        Ok(record)
    }

    async fn update_user(&self, user_id: &str, patch: UserPatch) -> StoreResult<Option<UserRecord>> {
        let mut data = self.data.write().await;
        let Some(current) = data.users.iter().find(|u| u.id == user_id).cloned() else {
            return Ok(None);
        };

        let email = patch.email.clone().unwrap_or(current.email.clone());
        let mobile = patch.mobile.clone().or(current.mobile.clone());
        if data.identifier_taken(
            patch.email.as_ref().and(email.as_deref()),
            patch.mobile.as_ref().and(mobile.as_deref()),
            user_id,
        ) {
            return Err(StoreError::Conflict(
                "Email or mobile number already in use by another user".into(),
            ));
        }

        if let Some(role_id) = patch.role_id.as_deref() {
            let new_role = data
                .role(role_id)
                .map(|r| Role::from_name(&r.name))
                .ok_or_else(|| StoreError::NotFound("Role not found".into()))?;
            let old_role = data
                .role(&current.role_id)
                .map(|r| Role::from_name(&r.name))
                .unwrap_or(Role::Other(String::new()));
            let (old_kind, new_kind) = (old_role.profile_kind(), new_role.profile_kind());
            if old_kind != new_kind {
                if let Some(kind) = old_kind {
                    data.remove_profile(kind, user_id)?;
                }
                if let Some(kind) = new_kind {
                    data.add_profile(kind, user_id, current.name.clone());
                }
            }
        }

        let Some(row) = data.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        row.email = email;
        row.mobile = mobile;
        if let Some(hash) = patch.password_hash {
            row.password_hash = Some(hash);
        }
        if let Some(role_id) = patch.role_id {
            row.role_id = role_id;
        }
        let row = row.clone();
        Ok(Some(data.user_record(&row)))
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        if !data.users.iter().any(|u| u.id == user_id) {
            return Ok(false);
        }
        for kind in [ProfileKind::Doctor, ProfileKind::HealthAdvisor, ProfileKind::Patient] {
            if let Some(profile) = data.profile_of(kind, user_id)
                && data.profile_referenced(kind, &profile.id)
            {
                return Err(StoreError::Conflict("User still has clinical records".into()));
            }
        }
        for rows in data.profiles.values_mut() {
            rows.retain(|p| p.user_id != user_id);
        }
        data.sessions.retain(|s| s.user_id != user_id);
        data.users.retain(|u| u.id != user_id);
        Ok(true)
    }
}

// =============================================================================
// Roles
// =============================================================================

#[async_trait]
impl RoleStore for MemoryStore {
    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        let data = self.data.read().await;
        Ok(data.roles.iter().rev().map(|r| data.role_record(r)).collect())
    }

    async fn find_role_by_id(&self, role_id: &str) -> StoreResult<Option<RoleRecord>> {
        let data = self.data.read().await;
        Ok(data.role(role_id).map(|r| data.role_record(r)))
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>> {
        let data = self.data.read().await;
        let name = name.trim();
        Ok(data
            .roles
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .map(|r| data.role_record(r)))
    }

    async fn create_role(&self, name: &str, description: Option<&str>) -> StoreResult<RoleRecord> {
        let mut data = self.data.write().await;
        if data.role_name_taken(name, "") {
            return Err(StoreError::Conflict("Role with this name already exists".into()));
        }
        let row = RoleRow {
            id: new_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        let record = data.role_record(&row);
        data.roles.push(row);
        Ok(record)
    }

    async fn update_role(&self, role_id: &str, patch: RolePatch) -> StoreResult<Option<RoleRecord>> {
        let mut data = self.data.write().await;
        if let Some(name) = patch.name.as_deref()
            && data.role_name_taken(name, role_id)
        {
            return Err(StoreError::Conflict(
                "Another role with this name already exists".into(),
            ));
        }
        let Some(row) = data.roles.iter_mut().find(|r| r.id == role_id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(description) = patch.description {
            row.description = description;
        }
        let row = row.clone();
        Ok(Some(data.role_record(&row)))
    }

    async fn delete_role(&self, role_id: &str) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let Some(row) = data.role(role_id) else {
            return Ok(false);
        };
        let record = data.role_record(row);
        if record.user_count > 0 {
            return Err(StoreError::Conflict(format!(
                "Cannot delete role. {} user(s) are assigned to this role.",
                record.user_count
            )));
        }
        data.roles.retain(|r| r.id != role_id);
        Ok(true)
    }
}

// =============================================================================
// Profiles
// =============================================================================

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile_id(
        &self,
        user_id: &str,
        kind: ProfileKind,
    ) -> StoreResult<Option<String>> {
        let data = self.data.read().await;
        Ok(data.profile_of(kind, user_id).map(|p| p.id.clone()))
    }

    async fn get_profile(
        &self,
        kind: ProfileKind,
        profile_id: &str,
    ) -> StoreResult<Option<Profile>> {
        let data = self.data.read().await;
        Ok(data
            .profiles(kind)
            .iter()
            .find(|p| p.id == profile_id)
            .map(|p| to_profile(&data, p)))
    }

    async fn list_profiles(&self, kind: ProfileKind) -> StoreResult<Vec<Profile>> {
        let data = self.data.read().await;
        Ok(data
            .profiles(kind)
            .iter()
            .rev()
            .map(|p| to_profile(&data, p))
            .collect())
    }
}

fn to_profile(data: &Data, row: &ProfileRow) -> Profile {
    let user = data.users.iter().find(|u| u.id == row.user_id);
    Profile {
        id: row.id.clone(),
        user_id: row.user_id.clone(),
        name: row.name.clone(),
        specialization: row.specialization.clone(),
        email: user.and_then(|u| u.email.clone()),
        mobile: user.and_then(|u| u.mobile.clone()),
    }
}

// =============================================================================
// Clinical resources
// =============================================================================

#[async_trait]
impl ClinicalStore for MemoryStore {
    async fn list_appointments(&self, scope: &OwnerScope) -> StoreResult<Vec<Appointment>> {
        let data = self.data.read().await;
        let mut rows: Vec<Appointment> = data
            .appointments
            .iter()
            .filter(|a| in_scope(scope, Some(a.doctor_id.as_str()), None, &a.patient_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        Ok(rows)
    }

    async fn get_appointment(&self, id: &str) -> StoreResult<Option<Appointment>> {
        let data = self.data.read().await;
        Ok(data.appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn create_appointment(&self, new: &NewAppointment) -> StoreResult<Appointment> {
        let mut data = self.data.write().await;
        data.party_exists(ProfileKind::Doctor, &new.doctor_id)?;
        data.party_exists(ProfileKind::Patient, &new.patient_id)?;
        let row = Appointment {
            id: new_id(),
            doctor_id: new.doctor_id.clone(),
            patient_id: new.patient_id.clone(),
            scheduled_at: new.scheduled_at,
            status: AppointmentStatus::Booked,
            created_at: Utc::now(),
        };
        data.appointments.push(row.clone());
        Ok(row)
    }

    async fn update_appointment(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> StoreResult<Option<Appointment>> {
        let mut data = self.data.write().await;
        let Some(row) = data.appointments.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if patch.expected_status.is_some_and(|expected| expected != row.status) {
            return Err(StoreError::Conflict(STATUS_CHANGED.into()));
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(at) = patch.scheduled_at {
            row.scheduled_at = at;
        }
        Ok(Some(row.clone()))
    }

    async fn delete_appointment(&self, id: &str) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let before = data.appointments.len();
        data.appointments.retain(|a| a.id != id);
        Ok(data.appointments.len() < before)
    }

    async fn list_prescriptions(&self, scope: &OwnerScope) -> StoreResult<Vec<Prescription>> {
        let data = self.data.read().await;
        Ok(data
            .prescriptions
            .iter()
            .rev()
            .filter(|p| in_scope(scope, Some(p.doctor_id.as_str()), None, &p.patient_id))
            .cloned()
            .collect())
    }

    async fn get_prescription(&self, id: &str) -> StoreResult<Option<Prescription>> {
        let data = self.data.read().await;
        Ok(data.prescriptions.iter().find(|p| p.id == id).cloned())
    }

    async fn create_prescription(&self, new: &NewPrescription) -> StoreResult<Prescription> {
        let mut data = self.data.write().await;
        data.party_exists(ProfileKind::Doctor, &new.doctor_id)?;
        data.party_exists(ProfileKind::Patient, &new.patient_id)?;
        let row = Prescription {
            id: new_id(),
            doctor_id: new.doctor_id.clone(),
            patient_id: new.patient_id.clone(),
            diagnosis: new.diagnosis.clone(),
            medicines: new.medicines.clone(),
            created_at: Utc::now(),
        };
        data.prescriptions.push(row.clone());
        Ok(row)
    }

    async fn update_prescription(
        &self,
        id: &str,
        patch: &PrescriptionPatch,
    ) -> StoreResult<Option<Prescription>> {
        let mut data = self.data.write().await;
        let Some(row) = data.prescriptions.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(diagnosis) = &patch.diagnosis {
            row.diagnosis.clone_from(diagnosis);
        }
        if let Some(medicines) = &patch.medicines {
            row.medicines.clone_from(medicines);
        }
        Ok(Some(row.clone()))
    }

    async fn delete_prescription(&self, id: &str) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let before = data.prescriptions.len();
        data.prescriptions.retain(|p| p.id != id);
        Ok(data.prescriptions.len() < before)
    }

    async fn list_consultations(&self, scope: &OwnerScope) -> StoreResult<Vec<Consultation>> {
        let data = self.data.read().await;
        let mut rows: Vec<Consultation> = data
            .consultations
            .iter()
            .filter(|c| in_scope(scope, None, Some(c.advisor_id.as_str()), &c.patient_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.consultation_at.cmp(&a.consultation_at));
        Ok(rows)
    }

    async fn get_consultation(&self, id: &str) -> StoreResult<Option<Consultation>> {
        let data = self.data.read().await;
        Ok(data.consultations.iter().find(|c| c.id == id).cloned())
    }

    async fn create_consultation(&self, new: &NewConsultation) -> StoreResult<Consultation> {
        let mut data = self.data.write().await;
        let advisor_id = new
            .advisor_id
            .clone()
            .ok_or_else(|| StoreError::NotFound("Health advisor not found".into()))?;
        data.party_exists(ProfileKind::HealthAdvisor, &advisor_id)?;
        data.party_exists(ProfileKind::Patient, &new.patient_id)?;
        let row = Consultation {
            id: new_id(),
            advisor_id,
            patient_id: new.patient_id.clone(),
            consultation_at: new.consultation_at,
            notes: new.notes.clone(),
            status: new.status,
            created_at: Utc::now(),
        };
        data.consultations.push(row.clone());
        Ok(row)
    }

    async fn update_consultation(
        &self,
        id: &str,
        patch: &ConsultationPatch,
    ) -> StoreResult<Option<Consultation>> {
        let mut data = self.data.write().await;
        let Some(row) = data.consultations.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(at) = patch.consultation_at {
            row.consultation_at = at;
        }
        if let Some(notes) = &patch.notes {
            row.notes.clone_from(notes);
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        Ok(Some(row.clone()))
    }

    async fn delete_consultation(&self, id: &str) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let before = data.consultations.len();
        data.consultations.retain(|c| c.id != id);
        Ok(data.consultations.len() < before)
    }

    async fn totals(&self) -> StoreResult<Totals> {
        let data = self.data.read().await;
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Ok(Totals {
            users: count(data.users.len()),
            roles: count(data.roles.len()),
            doctors: count(data.profiles(ProfileKind::Doctor).len()),
            health_advisors: count(data.profiles(ProfileKind::HealthAdvisor).len()),
            patients: count(data.profiles(ProfileKind::Patient).len()),
            appointments: count(data.appointments.len()),
        })
    }

    async fn count_consultations(&self, scope: &OwnerScope) -> StoreResult<i64> {
        let data = self.data.read().await;
        let n = data
            .consultations
            .iter()
            .filter(|c| in_scope(scope, None, Some(c.advisor_id.as_str()), &c.patient_id))
            .count();
        Ok(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<SessionRecord> {
        let mut data = self.data.write().await;
        if !data.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::NotFound("User not found".into()));
        }
        let row = SessionRecord {
            id: new_id(),
            user_id: user_id.to_string(),
            expires_at,
            revoked: false,
        };
        data.sessions.push(row.clone());
        Ok(row)
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<SessionRecord>> {
        let data = self.data.read().await;
        Ok(data.sessions.iter().find(|s| s.id == session_id).cloned())
    }

    async fn revoke_session(&self, session_id: &str) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if let Some(session) = data.sessions.iter_mut().find(|s| s.id == session_id) {
            session.revoked = true;
        }
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: &str, keep: Option<&str>) -> StoreResult<()> {
        let mut data = self.data.write().await;
        for session in data
            .sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && Some(s.id.as_str()) != keep)
        {
            session.revoked = true;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_roles() -> (MemoryStore, HashMap<&'static str, String>) {
        let store = MemoryStore::new();
        let mut ids = HashMap::new();
        for name in ["admin", "doctor", "health_advisor", "patient"] {
            let role = store.create_role(name, None).await.unwrap();
            ids.insert(name, role.id);
        }
        (store, ids)
    }

    fn new_user(mobile: &str, role_id: &str) -> NewUser {
        NewUser {
            email: None,
            mobile: Some(mobile.to_string()),
            name: Some("Test".into()),
            password_hash: Some("hash".into()),
            role_id: role_id.to_string(),
        }
    }

    #[tokio::test]
    async fn role_names_are_unique_case_insensitively() {
        let (store, _) = store_with_roles().await;
        let err = store.create_role("Doctor", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn creating_a_doctor_creates_its_profile() {
        let (store, roles) = store_with_roles().await;
        let user = store.create_user(new_user("100", &roles["doctor"])).await.unwrap();
        assert!(store
            .find_profile_id(&user.id, ProfileKind::Doctor)
            .await
            .unwrap()
            .is_some());

        let admin = store.create_user(new_user("101", &roles["admin"])).await.unwrap();
        for kind in [ProfileKind::Doctor, ProfileKind::HealthAdvisor, ProfileKind::Patient] {
            assert!(store.find_profile_id(&admin.id, kind).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn duplicate_mobile_is_a_conflict() {
        let (store, roles) = store_with_roles().await;
        store.create_user(new_user("200", &roles["patient"])).await.unwrap();
        let err = store
            .create_user(new_user("200", &roles["patient"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn referenced_role_cannot_be_deleted() {
        let (store, roles) = store_with_roles().await;
        store.create_user(new_user("300", &roles["patient"])).await.unwrap();

        let err = store.delete_role(&roles["patient"]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.find_role_by_id(&roles["patient"]).await.unwrap().is_some());

        assert!(store.delete_role(&roles["health_advisor"]).await.unwrap());
        assert!(!store.delete_role(&roles["health_advisor"]).await.unwrap());
    }

    #[tokio::test]
    async fn role_change_swaps_profiles() {
        let (store, roles) = store_with_roles().await;
        let user = store.create_user(new_user("400", &roles["patient"])).await.unwrap();

        let patch = UserPatch {
            role_id: Some(roles["doctor"].clone()),
            ..UserPatch::default()
        };
        let updated = store.update_user(&user.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.role(), Role::Doctor);
        assert!(store
            .find_profile_id(&user.id, ProfileKind::Patient)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_profile_id(&user.id, ProfileKind::Doctor)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn scoped_listing_only_returns_owned_rows() {
        let (store, roles) = store_with_roles().await;
        let d1 = store.create_user(new_user("500", &roles["doctor"])).await.unwrap();
        let d2 = store.create_user(new_user("501", &roles["doctor"])).await.unwrap();
        let p = store.create_user(new_user("502", &roles["patient"])).await.unwrap();
        let d1 = store.find_profile_id(&d1.id, ProfileKind::Doctor).await.unwrap().unwrap();
        let d2 = store.find_profile_id(&d2.id, ProfileKind::Doctor).await.unwrap().unwrap();
        let p = store.find_profile_id(&p.id, ProfileKind::Patient).await.unwrap().unwrap();

        for doctor in [&d1, &d2] {
            store
                .create_appointment(&NewAppointment {
                    doctor_id: doctor.clone(),
                    patient_id: p.clone(),
                    scheduled_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let mine = store.list_appointments(&OwnerScope::Doctor(d1.clone())).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].doctor_id, d1);
        let patients = store.list_appointments(&OwnerScope::Patient(p)).await.unwrap();
        assert_eq!(patients.len(), 2);
        let advisors = store
            .list_appointments(&OwnerScope::Advisor(d1))
            .await
            .unwrap();
        assert!(advisors.is_empty());
    }

    #[tokio::test]
    async fn checked_patch_loses_to_an_earlier_status_change() {
        use crate::access::actor::Actor;
        use crate::access::appointment::check_patch;

        let (store, roles) = store_with_roles().await;
        let d = store.create_user(new_user("700", &roles["doctor"])).await.unwrap();
        let p = store.create_user(new_user("701", &roles["patient"])).await.unwrap();
        let d = store.find_profile_id(&d.id, ProfileKind::Doctor).await.unwrap().unwrap();
        let p = store.find_profile_id(&p.id, ProfileKind::Patient).await.unwrap().unwrap();
        let booked = store
            .create_appointment(&NewAppointment {
                doctor_id: d.clone(),
                patient_id: p.clone(),
                scheduled_at: Utc::now(),
            })
            .await
            .unwrap();

        // Both edits pass their checks against the booked row.
        let cancel = check_patch(
            &Actor::Patient { profile_id: p },
            &booked,
            AppointmentPatch::default(),
        )
        .unwrap();
        let complete = check_patch(
            &Actor::Doctor { profile_id: d },
            &booked,
            AppointmentPatch {
                status: Some(AppointmentStatus::Completed),
                ..AppointmentPatch::default()
            },
        )
        .unwrap();

        store.update_appointment(&booked.id, &complete).await.unwrap();
        let err = store.update_appointment(&booked.id, &cancel).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m == STATUS_CHANGED));

        let stored = store.get_appointment(&booked.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Completed);
        assert!(store.update_appointment("missing", &cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoking_user_sessions_keeps_the_current_one() {
        let (store, roles) = store_with_roles().await;
        let user = store.create_user(new_user("600", &roles["patient"])).await.unwrap();
        let expires = Utc::now() + chrono::Duration::hours(1);
        let a = store.create_session(&user.id, expires).await.unwrap();
        let b = store.create_session(&user.id, expires).await.unwrap();

        store.revoke_user_sessions(&user.id, Some(&b.id)).await.unwrap();
        assert!(store.find_session(&a.id).await.unwrap().unwrap().revoked);
        assert!(!store.find_session(&b.id).await.unwrap().unwrap().revoked);
    }
}
