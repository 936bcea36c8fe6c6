//! Backend entry-point: loads settings, prepares persistence and serves the
//! loyalty REST API.

mod server;

use actix_web::web;
#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetricsBuilder;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use loyalty_backend::inbound::http::health::HealthState;
use server::{
    AppSettings, ServerConfig, build_http_state, build_repositories, create_server, system_clock,
};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        AppSettings::load().map_err(|err| eyre!("failed to load configuration: {err}"))?;
    let clock = system_clock();
    let repositories = build_repositories(&settings, &clock)
        .await
        .wrap_err("failed to prepare persistence")?;
    let http_state = build_http_state(&repositories, &clock, settings.history_limit());

    let bind_addr = settings.bind_addr();
    let config = ServerConfig::new(bind_addr, http_state);
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(make_metrics()?);

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "loyalty backend listening");
    server.await.wrap_err("server terminated with an error")
}

#[cfg(feature = "metrics")]
fn make_metrics() -> Result<actix_web_prom::PrometheusMetrics> {
    PrometheusMetricsBuilder::new("loyalty")
        .endpoint("/metrics")
        .build()
        .map_err(|err| eyre!("failed to configure Prometheus metrics: {err}"))
}
