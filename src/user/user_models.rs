use chrono::{DateTime, Utc};
use serde::Serialize;

/// An admin-visible user record. The catalog treats users as opaque: id,
/// email, free-form metadata and timestamps, nothing else.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A freshly created user together with its generated temporary password.
/// The password is returned exactly once and never stored in clear.
#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user: AdminUser,
    pub temp_password: String,
}
