use super::user_models::{AdminUser, CreatedUser};
use anyhow::Result;

/// User admin operations, mirroring the shape of a hosted auth admin API.
pub trait UserAdminStore: Send + Sync {
    /// Returns all users.
    fn list_users(&self) -> Result<Vec<AdminUser>>;

    /// Returns the user with the given id, or None if it does not exist.
    fn get_user(&self, id: &str) -> Result<Option<AdminUser>>;

    /// Creates a user with a generated id and temporary password.
    fn create_user(&self, email: &str, metadata: serde_json::Value) -> Result<CreatedUser>;

    /// Updates email and/or metadata. `None` fields are left untouched, so
    /// an all-`None` patch is a no-op. Existence policy is decided by the
    /// callers, as with the catalog store deletes.
    fn update_user(
        &self,
        id: &str,
        email: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Result<()>;

    /// Deletes the identity. Returns the number of records removed; deleting
    /// a missing id removes zero and is not an error at this layer.
    fn delete_user(&self, id: &str) -> Result<usize>;
}
