//! PostgreSQL store.
//!
//! Raw SQLx queries against the schema in `medora_core/migrations/`. IDs are
//! parsed app-side; a malformed ID behaves exactly like an unknown one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    ClinicalStore, ProfileStore, RoleStore, STATUS_CHANGED, SessionStore, Store, StoreError,
    StoreResult, UserStore,
};
use crate::models::auth::SessionRecord;
use crate::models::clinical::{
    Appointment, AppointmentPatch, Consultation, ConsultationPatch, NewAppointment,
    NewConsultation, NewPrescription, OwnerScope, Prescription, PrescriptionPatch, Totals,
};
use crate::models::role::{ProfileKind, Role, RolePatch, RoleRecord};
use crate::models::user::{NewUser, Profile, UserPatch, UserRecord};
use crate::uuid::{parse_id, uuidv7};

const USER_SELECT: &str = "\
    SELECT u.id::text AS id, u.email, u.mobile, u.name, u.password_hash, \
           u.role_id::text AS role_id, r.name AS role_name, u.created_at \
    FROM users u JOIN roles r ON r.id = u.role_id";

const ROLE_SELECT: &str = "\
    SELECT r.id::text AS id, r.name, r.description, r.created_at, \
           (SELECT COUNT(*) FROM users u WHERE u.role_id = r.id) AS user_count \
    FROM roles r";

const APPOINTMENT_SELECT: &str = "\
    SELECT id::text AS id, doctor_id::text AS doctor_id, patient_id::text AS patient_id, \
           scheduled_at, status, created_at \
    FROM appointments";

const PRESCRIPTION_SELECT: &str = "\
    SELECT id::text AS id, doctor_id::text AS doctor_id, patient_id::text AS patient_id, \
           diagnosis, medicines, created_at \
    FROM prescriptions";

const CONSULTATION_SELECT: &str = "\
    SELECT id::text AS id, advisor_id::text AS advisor_id, patient_id::text AS patient_id, \
           consultation_at, notes, status, created_at \
    FROM consultations";

const SESSION_COLUMNS: &str = "id::text AS id, user_id::text AS user_id, expires_at, revoked";

/// SQLSTATE codes mapped to domain conflicts.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Translate constraint violations into [`StoreError::Conflict`].
fn conflict_or_db(e: sqlx::Error, unique_msg: &str, reference_msg: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return StoreError::Conflict(unique_msg.to_string()),
            Some(FOREIGN_KEY_VIOLATION) => return StoreError::Conflict(reference_msg.to_string()),
            _ => {}
        }
    }
    StoreError::Db(e)
}

/// Row filter derived from an [`OwnerScope`] for one table.
enum ScopeFilter {
    All,
    Column(&'static str, Uuid),
    /// The scope cannot match anything in this table.
    Nothing,
}

fn scope_filter(
    scope: &OwnerScope,
    doctor_col: Option<&'static str>,
    advisor_col: Option<&'static str>,
) -> ScopeFilter {
    let (col, raw) = match scope {
        OwnerScope::All => return ScopeFilter::All,
        OwnerScope::Patient(id) => (Some("patient_id"), id),
        OwnerScope::Doctor(id) => (doctor_col, id),
        OwnerScope::Advisor(id) => (advisor_col, id),
    };
    match (col, parse_id(raw)) {
        (Some(col), Some(id)) => ScopeFilter::Column(col, id),
        _ => ScopeFilter::Nothing,
    }
}

async fn fetch_scoped<T>(
    pool: &PgPool,
    select: &str,
    order_by: &str,
    filter: ScopeFilter,
) -> StoreResult<Vec<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let rows = match filter {
        ScopeFilter::Nothing => Vec::new(),
        ScopeFilter::All => {
            sqlx::query_as::<_, T>(&format!("{select} ORDER BY {order_by}"))
                .fetch_all(pool)
                .await?
        }
        ScopeFilter::Column(col, id) => {
            sqlx::query_as::<_, T>(&format!("{select} WHERE {col} = $1 ORDER BY {order_by}"))
                .bind(id)
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rows)
}

/// Lock the role row for the rest of the transaction and return its name.
/// `FOR SHARE` blocks a concurrent role delete until commit.
async fn lock_role(tx: &mut Transaction<'_, Postgres>, role_id: &str) -> StoreResult<(Uuid, Role)> {
    let not_found = || StoreError::NotFound("Role not found".into());
    let id = parse_id(role_id).ok_or_else(not_found)?;
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM roles WHERE id = $1 FOR SHARE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(not_found)?;
    Ok((id, Role::from_name(&name)))
}

async fn insert_profile(
    tx: &mut Transaction<'_, Postgres>,
    kind: ProfileKind,
    user_id: Uuid,
    name: Option<&str>,
) -> StoreResult<()> {
    sqlx::query(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(name)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_identifier(&self, identifier: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRecord>(&format!(
            "{USER_SELECT} WHERE u.email = $1 OR u.mobile = $1 LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_user_by_id(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        let Some(id) = parse_id(user_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, UserRecord>(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRecord>(&format!("{USER_SELECT} WHERE u.email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        let rows =
            sqlx::query_as::<_, UserRecord>(&format!("{USER_SELECT} ORDER BY u.created_at DESC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord> {
        let mut tx = self.pool.begin().await?;
        let (role_id, role) = lock_role(&mut tx, &new.role_id).await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (email, mobile, name, password_hash, role_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(new.email.as_deref())
        .bind(new.mobile.as_deref())
        .bind(new.name.as_deref())
        .bind(new.password_hash.as_deref())
        .bind(role_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            conflict_or_db(
                e,
                "User with this mobile or email already exists",
                "Role not found",
            )
        })?;

        if let Some(kind) = role.profile_kind() {
            insert_profile(&mut tx, kind, user_id, new.name.as_deref()).await?;
        }
        tx.commit().await?;

        self.find_user_by_id(&user_id.to_string())
            .await?
            .ok_or_else(|| StoreError::NotFound("User not found".into()))
    }

    async fn update_user(&self, user_id: &str, patch: UserPatch) -> StoreResult<Option<UserRecord>> {
        let Some(id) = parse_id(user_id) else {
            return Ok(None);
        };
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT r.name, u.name FROM users u JOIN roles r ON r.id = u.role_id \
             WHERE u.id = $1 FOR UPDATE OF u",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((old_role_name, display_name)) = current else {
            return Ok(None);
        };

        let new_role = match patch.role_id.as_deref() {
            Some(role_id) => Some(lock_role(&mut tx, role_id).await?),
            None => None,
        };

        sqlx::query(
            "UPDATE users SET \
               email = CASE WHEN $2 THEN $3 ELSE email END, \
               mobile = COALESCE($4, mobile), \
               password_hash = COALESCE($5, password_hash), \
               role_id = COALESCE($6, role_id) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.email.is_some())
        .bind(patch.email.clone().flatten())
        .bind(patch.mobile.as_deref())
        .bind(patch.password_hash.as_deref())
        .bind(new_role.as_ref().map(|(role_id, _)| *role_id))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            conflict_or_db(
                e,
                "Email or mobile number already in use by another user",
                "Role not found",
            )
        })?;

        if let Some((_, role)) = &new_role {
            let old_kind = Role::from_name(&old_role_name).profile_kind();
            let new_kind = role.profile_kind();
            if old_kind != new_kind {
                if let Some(kind) = old_kind {
                    sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", kind.table()))
                        .bind(id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| {
                            conflict_or_db(
                                e,
                                "Profile conflict",
                                "User still has clinical records under the current role",
                            )
                        })?;
                }
                if let Some(kind) = new_kind {
                    insert_profile(&mut tx, kind, id, display_name.as_deref()).await?;
                }
            }
        }
        tx.commit().await?;

        self.find_user_by_id(user_id).await
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let Some(id) = parse_id(user_id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or_db(e, "User conflict", "User still has clinical records"))?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Roles
// =============================================================================

#[async_trait]
impl RoleStore for PgStore {
    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        let rows =
            sqlx::query_as::<_, RoleRecord>(&format!("{ROLE_SELECT} ORDER BY r.created_at DESC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn find_role_by_id(&self, role_id: &str) -> StoreResult<Option<RoleRecord>> {
        let Some(id) = parse_id(role_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, RoleRecord>(&format!("{ROLE_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>> {
        let row = sqlx::query_as::<_, RoleRecord>(&format!(
            "{ROLE_SELECT} WHERE lower(r.name) = lower($1)"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_role(&self, name: &str, description: Option<&str>) -> StoreResult<RoleRecord> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "Role with this name already exists", "Role conflict"))?;

        self.find_role_by_id(&id.to_string())
            .await?
            .ok_or_else(|| StoreError::NotFound("Role not found".into()))
    }

    async fn update_role(&self, role_id: &str, patch: RolePatch) -> StoreResult<Option<RoleRecord>> {
        let Some(id) = parse_id(role_id) else {
            return Ok(None);
        };
        let result = sqlx::query(
            "UPDATE roles SET \
               name = COALESCE($2, name), \
               description = CASE WHEN $3 THEN $4 ELSE description END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.is_some())
        .bind(patch.description.clone().flatten())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_db(e, "Another role with this name already exists", "Role conflict")
        })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_role_by_id(role_id).await
    }

    async fn delete_role(&self, role_id: &str) -> StoreResult<bool> {
        let Some(id) = parse_id(role_id) else {
            return Ok(false);
        };
        // The NOT EXISTS guard and the RESTRICT foreign key are evaluated by
        // the delete itself, so a user inserted concurrently either blocks on
        // the row lock or makes this statement fail.
        let result = sqlx::query(
            "DELETE FROM roles r WHERE r.id = $1 \
               AND NOT EXISTS (SELECT 1 FROM users u WHERE u.role_id = r.id)",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_db(
                e,
                "Role conflict",
                "Cannot delete role. Users are assigned to this role.",
            )
        })?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        match self.find_role_by_id(role_id).await? {
            None => Ok(false),
            Some(role) => Err(StoreError::Conflict(format!(
                "Cannot delete role. {} user(s) are assigned to this role.",
                role.user_count
            ))),
        }
    }
}

// =============================================================================
// Profiles
// =============================================================================

fn profile_select(kind: ProfileKind) -> String {
    let specialization = match kind {
        ProfileKind::Doctor | ProfileKind::HealthAdvisor => "p.specialization",
        ProfileKind::Patient => "NULL::text",
    };
    format!(
        "SELECT p.id::text AS id, p.user_id::text AS user_id, p.name, \
                {specialization} AS specialization, u.email, u.mobile \
         FROM {} p JOIN users u ON u.id = p.user_id",
        kind.table()
    )
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_profile_id(
        &self,
        user_id: &str,
        kind: ProfileKind,
    ) -> StoreResult<Option<String>> {
        let Some(id) = parse_id(user_id) else {
            return Ok(None);
        };
        let row = sqlx::query_scalar::<_, String>(&format!(
            "SELECT id::text FROM {} WHERE user_id = $1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_profile(
        &self,
        kind: ProfileKind,
        profile_id: &str,
    ) -> StoreResult<Option<Profile>> {
        let Some(id) = parse_id(profile_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, Profile>(&format!("{} WHERE p.id = $1", profile_select(kind)))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_profiles(&self, kind: ProfileKind) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, Profile>(&format!(
            "{} ORDER BY p.id DESC",
            profile_select(kind)
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// =============================================================================
// Clinical resources
// =============================================================================

const MISSING_PARTY: &str = "Referenced doctor, advisor or patient no longer exists";

#[async_trait]
impl ClinicalStore for PgStore {
    async fn list_appointments(&self, scope: &OwnerScope) -> StoreResult<Vec<Appointment>> {
        let filter = scope_filter(scope, Some("doctor_id"), None);
        fetch_scoped(&self.pool, APPOINTMENT_SELECT, "scheduled_at DESC", filter).await
    }

    async fn get_appointment(&self, id: &str) -> StoreResult<Option<Appointment>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, Appointment>(&format!("{APPOINTMENT_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_appointment(&self, new: &NewAppointment) -> StoreResult<Appointment> {
        let missing = || StoreError::NotFound(MISSING_PARTY.into());
        let doctor_id = parse_id(&new.doctor_id).ok_or_else(missing)?;
        let patient_id = parse_id(&new.patient_id).ok_or_else(missing)?;
        let row = sqlx::query_as::<_, Appointment>(
            "INSERT INTO appointments (id, doctor_id, patient_id, scheduled_at, status) \
             VALUES ($1, $2, $3, $4, 'booked') \
             RETURNING id::text AS id, doctor_id::text AS doctor_id, \
                       patient_id::text AS patient_id, scheduled_at, status, created_at",
        )
        .bind(uuidv7())
        .bind(doctor_id)
        .bind(patient_id)
        .bind(new.scheduled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "Appointment already exists", MISSING_PARTY))?;
        Ok(row)
    }

    async fn update_appointment(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> StoreResult<Option<Appointment>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET \
               status = COALESCE($2, status), \
               scheduled_at = COALESCE($3, scheduled_at) \
             WHERE id = $1 AND ($4::appointment_status IS NULL OR status = $4) \
             RETURNING id::text AS id, doctor_id::text AS doctor_id, \
                       patient_id::text AS patient_id, scheduled_at, status, created_at",
        )
        .bind(id)
        .bind(patch.status)
        .bind(patch.scheduled_at)
        .bind(patch.expected_status)
        .fetch_optional(&self.pool)
        .await?;
        if row.is_none() && patch.expected_status.is_some() {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM appointments WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?;
            if exists {
                return Err(StoreError::Conflict(STATUS_CHANGED.into()));
            }
        }
        Ok(row)
    }

    async fn delete_appointment(&self, id: &str) -> StoreResult<bool> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_prescriptions(&self, scope: &OwnerScope) -> StoreResult<Vec<Prescription>> {
        let filter = scope_filter(scope, Some("doctor_id"), None);
        fetch_scoped(&self.pool, PRESCRIPTION_SELECT, "created_at DESC", filter).await
    }

    async fn get_prescription(&self, id: &str) -> StoreResult<Option<Prescription>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row =
            sqlx::query_as::<_, Prescription>(&format!("{PRESCRIPTION_SELECT} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn create_prescription(&self, new: &NewPrescription) -> StoreResult<Prescription> {
        let missing = || StoreError::NotFound(MISSING_PARTY.into());
        let doctor_id = parse_id(&new.doctor_id).ok_or_else(missing)?;
        let patient_id = parse_id(&new.patient_id).ok_or_else(missing)?;
        let row = sqlx::query_as::<_, Prescription>(
            "INSERT INTO prescriptions (id, doctor_id, patient_id, diagnosis, medicines) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id::text AS id, doctor_id::text AS doctor_id, \
                       patient_id::text AS patient_id, diagnosis, medicines, created_at",
        )
        .bind(uuidv7())
        .bind(doctor_id)
        .bind(patient_id)
        .bind(&new.diagnosis)
        .bind(&new.medicines)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "Prescription already exists", MISSING_PARTY))?;
        Ok(row)
    }

    async fn update_prescription(
        &self,
        id: &str,
        patch: &PrescriptionPatch,
    ) -> StoreResult<Option<Prescription>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, Prescription>(
            "UPDATE prescriptions SET \
               diagnosis = COALESCE($2, diagnosis), \
               medicines = COALESCE($3, medicines) \
             WHERE id = $1 \
             RETURNING id::text AS id, doctor_id::text AS doctor_id, \
                       patient_id::text AS patient_id, diagnosis, medicines, created_at",
        )
        .bind(id)
        .bind(patch.diagnosis.as_deref())
        .bind(patch.medicines.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_prescription(&self, id: &str) -> StoreResult<bool> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM prescriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_consultations(&self, scope: &OwnerScope) -> StoreResult<Vec<Consultation>> {
        let filter = scope_filter(scope, None, Some("advisor_id"));
        fetch_scoped(&self.pool, CONSULTATION_SELECT, "consultation_at DESC", filter).await
    }

    async fn get_consultation(&self, id: &str) -> StoreResult<Option<Consultation>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row =
            sqlx::query_as::<_, Consultation>(&format!("{CONSULTATION_SELECT} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn create_consultation(&self, new: &NewConsultation) -> StoreResult<Consultation> {
        let missing = || StoreError::NotFound(MISSING_PARTY.into());
        let advisor_id = new
            .advisor_id
            .as_deref()
            .and_then(parse_id)
            .ok_or_else(missing)?;
        let patient_id = parse_id(&new.patient_id).ok_or_else(missing)?;
        let row = sqlx::query_as::<_, Consultation>(
            "INSERT INTO consultations (id, advisor_id, patient_id, consultation_at, notes, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id::text AS id, advisor_id::text AS advisor_id, \
                       patient_id::text AS patient_id, consultation_at, notes, status, created_at",
        )
        .bind(uuidv7())
        .bind(advisor_id)
        .bind(patient_id)
        .bind(new.consultation_at)
        .bind(&new.notes)
        .bind(new.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "Consultation already exists", MISSING_PARTY))?;
        Ok(row)
    }

    async fn update_consultation(
        &self,
        id: &str,
        patch: &ConsultationPatch,
    ) -> StoreResult<Option<Consultation>> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, Consultation>(
            "UPDATE consultations SET \
               consultation_at = COALESCE($2, consultation_at), \
               notes = COALESCE($3, notes), \
               status = COALESCE($4, status) \
             WHERE id = $1 \
             RETURNING id::text AS id, advisor_id::text AS advisor_id, \
                       patient_id::text AS patient_id, consultation_at, notes, status, created_at",
        )
        .bind(id)
        .bind(patch.consultation_at)
        .bind(patch.notes.as_deref())
        .bind(patch.status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_consultation(&self, id: &str) -> StoreResult<bool> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM consultations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn totals(&self) -> StoreResult<Totals> {
        let (users, roles, doctors, health_advisors, patients, appointments) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64)>(
                "SELECT (SELECT COUNT(*) FROM users), \
                        (SELECT COUNT(*) FROM roles), \
                        (SELECT COUNT(*) FROM doctors), \
                        (SELECT COUNT(*) FROM health_advisors), \
                        (SELECT COUNT(*) FROM patients), \
                        (SELECT COUNT(*) FROM appointments)",
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(Totals {
            users,
            roles,
            doctors,
            health_advisors,
            patients,
            appointments,
        })
    }

    async fn count_consultations(&self, scope: &OwnerScope) -> StoreResult<i64> {
        let count = match scope_filter(scope, None, Some("advisor_id")) {
            ScopeFilter::Nothing => 0,
            ScopeFilter::All => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM consultations")
                    .fetch_one(&self.pool)
                    .await?
            }
            ScopeFilter::Column(col, id) => {
                sqlx::query_scalar::<_, i64>(&format!(
                    "SELECT COUNT(*) FROM consultations WHERE {col} = $1"
                ))
                .bind(id)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count)
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<SessionRecord> {
        let user = parse_id(user_id).ok_or_else(|| StoreError::NotFound("User not found".into()))?;
        let row = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(user)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "Session already exists", "User not found"))?;
        Ok(row)
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<SessionRecord>> {
        let Some(id) = parse_id(session_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn revoke_session(&self, session_id: &str) -> StoreResult<()> {
        let Some(id) = parse_id(session_id) else {
            return Ok(());
        };
        sqlx::query("UPDATE sessions SET revoked = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: &str, keep: Option<&str>) -> StoreResult<()> {
        let Some(user) = parse_id(user_id) else {
            return Ok(());
        };
        sqlx::query(
            "UPDATE sessions SET revoked = true \
             WHERE user_id = $1 AND revoked = false AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(user)
        .bind(keep.and_then(parse_id))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
