use std::sync::Arc;

use quiz_core::hearts::HeartsSettings;
use storage::catalog_file::CatalogFile;
use storage::repository::{CatalogRepository, Storage};

use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::profile_service::ProfileService;
use crate::progress_service::ProgressService;
use crate::sessions::SessionLoopService;
use crate::Clock;

/// Assembles caller-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    seeded_catalog: bool,
    catalog: Arc<CatalogService>,
    progress: Arc<ProgressService>,
    profiles: Arc<ProfileService>,
    sessions: Arc<SessionLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// An empty catalog is filled from the bundled sample.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or catalog seeding fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        hearts: HeartsSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let seeded_catalog = ensure_catalog(storage.catalog.as_ref()).await?;
        let mut services = Self::from_storage(&storage, clock, hearts);
        services.seeded_catalog = seeded_catalog;
        Ok(services)
    }

    /// Wire services over an already built `Storage`.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, hearts: HeartsSettings) -> Self {
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage.catalog)));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
        ));
        let profiles = Arc::new(ProfileService::new(
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.progress),
        ));
        let sessions = Arc::new(
            SessionLoopService::new(Arc::clone(&catalog), Arc::clone(&progress))
                .with_hearts(hearts),
        );

        Self {
            seeded_catalog: false,
            catalog,
            progress,
            profiles,
            sessions,
        }
    }

    /// True when startup found an empty catalog and imported the sample.
    #[must_use]
    pub fn seeded_catalog(&self) -> bool {
        self.seeded_catalog
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.sessions)
    }
}

async fn ensure_catalog(catalog: &dyn CatalogRepository) -> Result<bool, AppServicesError> {
    if !catalog.list_units().await?.is_empty() {
        return Ok(false);
    }

    CatalogFile::sample()?.import(catalog).await?;
    tracing::info!("catalog was empty; imported bundled sample");
    Ok(true)
}
