//! Outbound adapters implementing the repository ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel.
//! - **memory**: a single in-process store implementing every repository,
//!   used when no database is configured and by the test suites.
//!
//! Adapters translate between domain types and storage representations. They
//! contain no business rules.

pub mod memory;
pub mod persistence;
