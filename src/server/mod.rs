mod http_layers;
#[allow(clippy::module_inception)]
mod server;
mod state;

pub use http_layers::RequestsLoggingLevel;
pub use server::{make_router, run_server};
pub use state::{
    GuardedBlobStore, GuardedCatalogStore, GuardedDeletionManager, GuardedOrderingManager,
    GuardedUserAdminStore, ServerState,
};
