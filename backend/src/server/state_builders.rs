//! Builders for the repository bundle and HTTP state.
//!
//! A configured database URL selects the Diesel adapters; otherwise every
//! port is served by one [`InMemoryStore`].

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use loyalty_backend::domain::{Merchant, MerchantId, Repositories};
use loyalty_backend::inbound::http::state::HttpState;
use loyalty_backend::outbound::memory::InMemoryStore;
use loyalty_backend::outbound::persistence::{
    DbPool, DieselCatalogueRepository, DieselCheckpointRepository, DieselCustomerRepository,
    DieselLedgerRepository, DieselMerchantRepository, MigrationError, PoolError,
    run_pending_migrations,
};

use super::settings::AppSettings;

/// Failure preparing the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StateBuildError {
    /// The connection pool could not be built.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// Startup migrations failed.
    #[error(transparent)]
    Migrations(#[from] MigrationError),
}

/// Wire one Diesel adapter per port over a shared pool.
fn diesel_repositories(pool: &DbPool) -> Repositories {
    Repositories {
        merchants: Arc::new(DieselMerchantRepository::new(pool.clone())),
        customers: Arc::new(DieselCustomerRepository::new(pool.clone())),
        ledger: Arc::new(DieselLedgerRepository::new(pool.clone())),
        checkpoints: Arc::new(DieselCheckpointRepository::new(pool.clone())),
        catalogue: Arc::new(DieselCatalogueRepository::new(pool.clone())),
    }
}

/// Build the in-memory store, seeding the optional demo merchant.
async fn memory_repositories(settings: &AppSettings, clock: &Arc<dyn Clock>) -> Repositories {
    let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
    if let Some(name) = settings.demo_merchant.as_deref() {
        let id = MerchantId::random();
        store
            .insert_merchant(Merchant {
                id,
                name: name.to_owned(),
                description: None,
                logo_url: None,
            })
            .await;
        info!(merchant_id = %id, name, "seeded demo merchant");
    }
    Repositories::from_store(store)
}

/// Select and prepare the repositories described by `settings`.
///
/// # Errors
/// Returns [`StateBuildError`] when the pool cannot be built or migrations
/// fail.
pub(crate) async fn build_repositories(
    settings: &AppSettings,
    clock: &Arc<dyn Clock>,
) -> Result<Repositories, StateBuildError> {
    let Some(url) = settings.database_url() else {
        warn!("no database URL configured; using the in-memory store");
        return Ok(memory_repositories(settings, clock).await);
    };
    if settings.run_migrations {
        run_pending_migrations(url).await?;
    }
    let pool = DbPool::new(settings.pool_config(url)).await?;
    info!("connected to PostgreSQL");
    Ok(diesel_repositories(&pool))
}

/// Build the shared handler state.
pub(crate) fn build_http_state(
    repositories: &Repositories,
    clock: &Arc<dyn Clock>,
    history_limit: u32,
) -> web::Data<HttpState> {
    web::Data::new(HttpState::from_repositories(
        repositories,
        clock,
        history_limit,
    ))
}

/// Clock shared by the store and the services.
pub(crate) fn system_clock() -> Arc<dyn Clock> {
    Arc::new(DefaultClock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use loyalty_backend::domain::ports::MerchantRepository;
    use ortho_config::OrthoConfig;
    use rstest::rstest;

    fn settings(demo_merchant: Option<&str>) -> AppSettings {
        let _guard = lock_env([
            ("LOYALTY_DATABASE_URL", None::<String>),
            ("LOYALTY_DEMO_MERCHANT", demo_merchant.map(str::to_owned)),
        ]);
        AppSettings::load_from_iter([OsString::from("loyalty-backend")])
            .expect("config should load")
    }

    #[rstest]
    #[tokio::test]
    async fn memory_store_is_used_without_database() {
        let settings = settings(None);
        let repos = build_repositories(&settings, &system_clock())
            .await
            .expect("memory repositories");
        let merchants = repos.merchants.list_merchants().await.expect("list");
        assert!(merchants.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn demo_merchant_is_seeded() {
        let settings = settings(Some("Corner Cafe"));
        let repos = build_repositories(&settings, &system_clock())
            .await
            .expect("memory repositories");
        let merchants = repos.merchants.list_merchants().await.expect("list");
        let names: Vec<_> = merchants.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Corner Cafe"]);
    }
}
