use std::sync::Arc;

use storage::catalog::ensure_default_catalog;
use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::config::ServicesConfig;
use crate::error::AppServicesError;
use crate::identity::{IdentityProvider, LocalIdentityProvider};
use crate::registration_service::RegistrationService;
use crate::tracker::ProgressTracker;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    identity: Arc<dyn IdentityProvider>,
    registration: Arc<RegistrationService>,
    seeded_catalog: bool,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or catalogue
    /// seeding fails.
    pub async fn new_sqlite(
        config: &ServicesConfig,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        Self::from_storage(storage, config, clock).await
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if catalogue seeding fails.
    pub async fn in_memory(
        config: &ServicesConfig,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), config, clock).await
    }

    async fn from_storage(
        storage: Storage,
        config: &ServicesConfig,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let seeded_catalog = ensure_default_catalog(&storage).await?;
        if seeded_catalog {
            info!("seeded default course catalogue");
        }

        let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentityProvider::new(
            clock,
            config.session_ttl,
            Arc::clone(&storage.accounts),
        ));
        let registration = Arc::new(RegistrationService::new(
            Arc::clone(&identity),
            Arc::clone(&storage.courses),
            Arc::clone(&storage.learners),
        ));

        Ok(Self {
            storage,
            identity,
            registration,
            seeded_catalog,
        })
    }

    /// Whether the default catalogue was written during startup.
    #[must_use]
    pub fn seeded_catalog(&self) -> bool {
        self.seeded_catalog
    }

    #[must_use]
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.identity)
    }

    #[must_use]
    pub fn registration(&self) -> Arc<RegistrationService> {
        Arc::clone(&self.registration)
    }

    /// A fresh, uninitialized tracker sharing this storage and identity provider.
    #[must_use]
    pub fn tracker(&self) -> ProgressTracker {
        ProgressTracker::from_storage(&self.storage, Arc::clone(&self.identity))
    }
}
