//! Loyalty backend library modules.
//!
//! The crate follows a hexagonal layout: [`domain`] holds entities, ports and
//! services; [`inbound`] adapts HTTP requests onto the driving ports; and
//! [`outbound`] implements the repository ports for PostgreSQL and memory.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
