//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the repository ports backed by PostgreSQL via
//! `diesel-async` with `bb8` pooling.
//!
//! - **Thin adapters**: repositories translate between Diesel rows and domain
//!   types. Business rules stay in the domain services.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Transactions**: cursor moves, redemptions and offer shrinks each run in
//!   one database transaction; the first two are retried on serialization
//!   failures.
//!
//! # Example
//!
//! ```no_run
//! use loyalty_backend::outbound::persistence::{DbPool, DieselLedgerRepository, PoolConfig};
//!
//! # async fn connect() -> Result<(), loyalty_backend::outbound::persistence::PoolError> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/loyalty")).await?;
//! let ledger = DieselLedgerRepository::new(pool);
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_catalogue_repository;
mod diesel_checkpoint_repository;
mod diesel_customer_repository;
mod diesel_ledger_repository;
mod diesel_merchant_repository;
mod migrations;
mod models;
mod pool;
mod retry;
mod schema;

pub use diesel_catalogue_repository::DieselCatalogueRepository;
pub use diesel_checkpoint_repository::DieselCheckpointRepository;
pub use diesel_customer_repository::DieselCustomerRepository;
pub use diesel_ledger_repository::DieselLedgerRepository;
pub use diesel_merchant_repository::DieselMerchantRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
