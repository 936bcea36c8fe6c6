//! Application settings loaded via OrthoConfig.
//!
//! Values merge from CLI flags, `LOYALTY_*` environment variables and
//! configuration files. Unset options fall back to the defaults exposed by
//! the accessor methods.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use loyalty_backend::domain::ports::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use loyalty_backend::outbound::persistence::PoolConfig;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_MIN_IDLE: u32 = 2;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Configuration values for the loyalty server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LOYALTY")]
pub struct AppSettings {
    /// Interface to bind.
    pub host: Option<IpAddr>,
    /// Port to bind.
    pub port: Option<u16>,
    /// PostgreSQL URL. Without it the in-memory store is used.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub pool_max_size: Option<u32>,
    /// Idle connections kept open.
    pub pool_min_idle: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub connection_timeout_secs: Option<u64>,
    /// Apply pending migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
    /// Rows per history section when a request sets no limit.
    pub history_limit: Option<u32>,
    /// Name of a merchant to create in the in-memory store at startup.
    pub demo_merchant: Option<String>,
}

impl AppSettings {
    /// Socket address to listen on.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.host.unwrap_or(DEFAULT_HOST),
            self.port.unwrap_or(DEFAULT_PORT),
        )
    }

    /// Default history page size, clamped to the maximum.
    pub fn history_limit(&self) -> u32 {
        self.history_limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }

    /// Database URL with surrounding whitespace removed; blank means unset.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Pool configuration for `url`.
    pub fn pool_config(&self, url: &str) -> PoolConfig {
        PoolConfig::new(url)
            .with_max_size(self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE))
            .with_min_idle(Some(self.pool_min_idle.unwrap_or(DEFAULT_POOL_MIN_IDLE)))
            .with_connection_timeout(Duration::from_secs(
                self.connection_timeout_secs
                    .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS),
            ))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 9] = [
        "LOYALTY_HOST",
        "LOYALTY_PORT",
        "LOYALTY_DATABASE_URL",
        "LOYALTY_POOL_MAX_SIZE",
        "LOYALTY_POOL_MIN_IDLE",
        "LOYALTY_CONNECTION_TIMEOUT_SECS",
        "LOYALTY_RUN_MIGRATIONS",
        "LOYALTY_HISTORY_LIMIT",
        "LOYALTY_DEMO_MERCHANT",
    ];

    fn load_with(overrides: &[(&str, &str)]) -> AppSettings {
        let vars = VARS.map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned());
            (name, value)
        });
        let _guard = lock_env(vars);
        AppSettings::load_from_iter([OsString::from("loyalty-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let settings = load_with(&[]);
        assert_eq!(
            settings.bind_addr(),
            SocketAddr::new(DEFAULT_HOST, DEFAULT_PORT)
        );
        assert!(settings.database_url().is_none());
        assert!(settings.run_migrations);
        assert_eq!(settings.history_limit(), DEFAULT_HISTORY_LIMIT);
        assert!(settings.demo_merchant.is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let settings = load_with(&[
            ("LOYALTY_HOST", "127.0.0.1"),
            ("LOYALTY_PORT", "9090"),
            ("LOYALTY_DATABASE_URL", "postgres://loyalty@db/loyalty"),
            ("LOYALTY_POOL_MAX_SIZE", "4"),
            ("LOYALTY_RUN_MIGRATIONS", "false"),
            ("LOYALTY_HISTORY_LIMIT", "20"),
        ]);
        assert_eq!(settings.bind_addr(), "127.0.0.1:9090".parse().expect("addr"));
        assert_eq!(
            settings.database_url(),
            Some("postgres://loyalty@db/loyalty")
        );
        assert!(!settings.run_migrations);
        assert_eq!(settings.history_limit(), 20);
        let pool = settings.pool_config("postgres://loyalty@db/loyalty");
        assert_eq!(pool.max_size(), 4);
    }

    #[rstest]
    #[case("0", 1)]
    #[case("5000", MAX_HISTORY_LIMIT)]
    fn history_limit_is_clamped(#[case] raw: &str, #[case] expected: u32) {
        let settings = load_with(&[("LOYALTY_HISTORY_LIMIT", raw)]);
        assert_eq!(settings.history_limit(), expected);
    }

    #[rstest]
    fn blank_database_url_selects_memory() {
        let settings = load_with(&[("LOYALTY_DATABASE_URL", "  ")]);
        assert!(settings.database_url().is_none());
    }
}
