use axum::extract::FromRef;

use crate::blob_store::BlobStore;
use crate::catalog_store::CatalogStore;
use crate::deletion::CascadeDeletionManager;
use crate::ordering::OrderingManager;
use crate::user::UserAdminStore;
use std::sync::Arc;

use super::RequestsLoggingLevel;

pub type GuardedCatalogStore = Arc<dyn CatalogStore>;
pub type GuardedBlobStore = Arc<dyn BlobStore>;
pub type GuardedUserAdminStore = Arc<dyn UserAdminStore>;
pub type GuardedOrderingManager = Arc<OrderingManager>;
pub type GuardedDeletionManager = Arc<CascadeDeletionManager>;

#[derive(Clone)]
pub struct ServerState {
    pub catalog_store: GuardedCatalogStore,
    pub blob_store: GuardedBlobStore,
    pub user_store: GuardedUserAdminStore,
    pub ordering: GuardedOrderingManager,
    pub deletion: GuardedDeletionManager,
    pub logging_level: RequestsLoggingLevel,
}

impl ServerState {
    pub fn new(
        catalog_store: GuardedCatalogStore,
        blob_store: GuardedBlobStore,
        user_store: GuardedUserAdminStore,
        logging_level: RequestsLoggingLevel,
    ) -> Self {
        let ordering = Arc::new(OrderingManager::new(catalog_store.clone()));
        let deletion = Arc::new(CascadeDeletionManager::new(
            catalog_store.clone(),
            blob_store.clone(),
            user_store.clone(),
        ));
        Self {
            catalog_store,
            blob_store,
            user_store,
            ordering,
            deletion,
            logging_level,
        }
    }
}

impl FromRef<ServerState> for GuardedCatalogStore {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_store.clone()
    }
}

impl FromRef<ServerState> for GuardedBlobStore {
    fn from_ref(input: &ServerState) -> Self {
        input.blob_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserAdminStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for GuardedOrderingManager {
    fn from_ref(input: &ServerState) -> Self {
        input.ordering.clone()
    }
}

impl FromRef<ServerState> for GuardedDeletionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.deletion.clone()
    }
}
