mod sqlite_user_store;
mod user_models;
mod user_store;

pub use sqlite_user_store::SqliteUserAdminStore;
pub use user_models::{AdminUser, CreatedUser};
pub use user_store::UserAdminStore;
