//! Route table.
//!
//! Every path the API serves is listed here along with whether it sits
//! behind the request guard. `router()` registers handlers against these
//! constants; the integration tests walk [`PROTECTED`] to check that none of
//! them answers without a session proof.

// Public
pub const GET_HEALTH: &str = "/api/health";
pub const POST_AUTH_SIGNUP: &str = "/api/auth/signup";
pub const POST_AUTH_LOGIN: &str = "/api/auth/login";
pub const POST_AUTH_REFRESH: &str = "/api/auth/refresh";
pub const POST_AUTH_SESSION: &str = "/api/auth/session";
pub const POST_AUTH_FEDERATED: &str = "/api/auth/federated";

// Guarded, reachable before a password is set
pub const POST_AUTH_LOGOUT: &str = "/api/auth/logout";
pub const GET_AUTH_ME: &str = "/api/auth/me";
pub const POST_AUTH_SET_PASSWORD: &str = "/api/auth/set-password";
pub const GET_AUTH_VALIDATE_SESSION: &str = "/api/auth/validate-session";
pub const GET_AUTH_DASHBOARD: &str = "/api/auth/dashboard";

// Guarded, password required
pub const APPOINTMENTS: &str = "/api/appointments";
pub const APPOINTMENTS_ID: &str = "/api/appointments/{id}";
pub const PRESCRIPTIONS: &str = "/api/prescriptions";
pub const PRESCRIPTIONS_ID: &str = "/api/prescriptions/{id}";
pub const CONSULTATIONS: &str = "/api/consultations";
pub const CONSULTATIONS_ID: &str = "/api/consultations/{id}";

pub const ADMIN_DASHBOARD: &str = "/api/admin/dashboard";
pub const ADMIN_USERS: &str = "/api/admin/users";
pub const ADMIN_USERS_ID: &str = "/api/admin/users/{id}";
pub const ADMIN_ROLES: &str = "/api/admin/roles";
pub const ADMIN_ROLES_ID: &str = "/api/admin/roles/{id}";
pub const ADMIN_DOCTORS: &str = "/api/admin/doctors";
pub const ADMIN_DOCTORS_ID: &str = "/api/admin/doctors/{id}";
pub const ADMIN_HEALTH_ADVISORS: &str = "/api/admin/health-advisors";
pub const ADMIN_HEALTH_ADVISORS_ID: &str = "/api/admin/health-advisors/{id}";
pub const ADMIN_PATIENTS: &str = "/api/admin/patients";
pub const ADMIN_PATIENTS_ID: &str = "/api/admin/patients/{id}";

pub const HEALTH_ADVISOR_DASHBOARD: &str = "/api/health-advisor/dashboard";
pub const HEALTH_ADVISOR_PATIENTS: &str = "/api/health-advisor/patients";

/// `(method, path)` pairs served without authentication.
pub const PUBLIC: &[(&str, &str)] = &[
    ("GET", GET_HEALTH),
    ("POST", POST_AUTH_SIGNUP),
    ("POST", POST_AUTH_LOGIN),
    ("POST", POST_AUTH_REFRESH),
    ("POST", POST_AUTH_SESSION),
    ("POST", POST_AUTH_FEDERATED),
];

/// `(method, path)` pairs behind the request guard.
pub const PROTECTED: &[(&str, &str)] = &[
    ("POST", POST_AUTH_LOGOUT),
    ("GET", GET_AUTH_ME),
    ("POST", POST_AUTH_SET_PASSWORD),
    ("GET", GET_AUTH_VALIDATE_SESSION),
    ("GET", GET_AUTH_DASHBOARD),
    ("GET", APPOINTMENTS),
    ("POST", APPOINTMENTS),
    ("GET", APPOINTMENTS_ID),
    ("PATCH", APPOINTMENTS_ID),
    ("DELETE", APPOINTMENTS_ID),
    ("GET", PRESCRIPTIONS),
    ("POST", PRESCRIPTIONS),
    ("GET", PRESCRIPTIONS_ID),
    ("PATCH", PRESCRIPTIONS_ID),
    ("DELETE", PRESCRIPTIONS_ID),
    ("GET", CONSULTATIONS),
    ("POST", CONSULTATIONS),
    ("GET", CONSULTATIONS_ID),
    ("PATCH", CONSULTATIONS_ID),
    ("DELETE", CONSULTATIONS_ID),
    ("GET", ADMIN_DASHBOARD),
    ("GET", ADMIN_USERS),
    ("POST", ADMIN_USERS),
    ("GET", ADMIN_USERS_ID),
    ("PATCH", ADMIN_USERS_ID),
    ("DELETE", ADMIN_USERS_ID),
    ("GET", ADMIN_ROLES),
    ("POST", ADMIN_ROLES),
    ("GET", ADMIN_ROLES_ID),
    ("PATCH", ADMIN_ROLES_ID),
    ("DELETE", ADMIN_ROLES_ID),
    ("GET", ADMIN_DOCTORS),
    ("GET", ADMIN_DOCTORS_ID),
    ("GET", ADMIN_HEALTH_ADVISORS),
    ("GET", ADMIN_HEALTH_ADVISORS_ID),
    ("GET", ADMIN_PATIENTS),
    ("GET", ADMIN_PATIENTS_ID),
    ("GET", HEALTH_ADVISOR_DASHBOARD),
    ("GET", HEALTH_ADVISOR_PATIENTS),
];
