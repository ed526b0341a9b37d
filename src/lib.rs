//! Catalog Admin Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod blob_store;
pub mod catalog_store;
pub mod config;
pub mod deletion;
pub mod ordering;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use blob_store::{BlobStore, FsBlobStore, AUDIO_BUCKET, IMAGES_BUCKET};
pub use catalog_store::{CatalogStore, SqliteCatalogStore};
pub use deletion::{CascadeDeletionManager, DeletionError, DeletionReport};
pub use ordering::{OrderingError, OrderingManager};
pub use server::{run_server, RequestsLoggingLevel, ServerState};
pub use user::{SqliteUserAdminStore, UserAdminStore};
