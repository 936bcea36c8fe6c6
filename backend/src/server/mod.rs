//! Server construction and middleware wiring.

mod config;
mod settings;
mod state_builders;

pub use config::ServerConfig;
pub use settings::AppSettings;
pub(crate) use state_builders::{build_http_state, build_repositories, system_clock};

use actix_cors::Cors;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::{App, HttpServer, web};

use loyalty_backend::Trace;
#[cfg(debug_assertions)]
use loyalty_backend::doc::ApiDoc;
use loyalty_backend::domain::TRACE_ID_HEADER;
use loyalty_backend::inbound::http::configure;
use loyalty_backend::inbound::http::health::{HealthState, live, ready};
use loyalty_backend::inbound::http::merchant::MERCHANT_ID_HEADER;
use loyalty_backend::inbound::http::redemptions::REPLAYED_HEADER;
use loyalty_backend::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Permissive CORS for browser consoles and kiosks on other origins.
fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allow_any_method()
        .allowed_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(MERCHANT_ID_HEADER),
            header::HeaderName::from_static("idempotency-key"),
        ])
        .expose_headers([TRACE_ID_HEADER, REPLAYED_HEADER])
        .max_age(3600)
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(cors())
        .wrap(Trace)
        .configure(configure)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is bound.
/// - `config`: pre-built [`ServerConfig`] with the bind address, handler
///   state and optional metrics middleware.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        bind_addr,
        http_state,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;

    #[cfg(feature = "metrics")]
    let prometheus = prometheus.ok_or_else(|| {
        std::io::Error::other("metrics feature enabled without Prometheus middleware")
    })?;

    let server = HttpServer::new(move || {
        let app = build_app(server_health_state.clone(), http_state.clone());

        #[cfg(feature = "metrics")]
        let app = app.wrap(prometheus.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use loyalty_backend::domain::Repositories;
    use loyalty_backend::outbound::memory::InMemoryStore;
    use std::sync::Arc;

    fn state() -> web::Data<HttpState> {
        let repos = Repositories::from_store(Arc::new(InMemoryStore::new()));
        build_http_state(&repos, &system_clock(), 50)
    }

    #[actix_web::test]
    async fn preflight_allows_the_merchant_header() {
        let app = test::init_service(build_app(web::Data::new(HealthState::new()), state())).await;
        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/tx")
            .insert_header((header::ORIGIN, "https://kiosk.example"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "x-merchant-id"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());
        let origin = res
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("allow origin header");
        assert_eq!(origin, "*");
    }

    #[actix_web::test]
    async fn responses_expose_trace_id() {
        let app = test::init_service(build_app(web::Data::new(HealthState::new()), state())).await;
        let req = test::TestRequest::get()
            .uri("/health/live")
            .insert_header((header::ORIGIN, "https://kiosk.example"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.headers().contains_key(TRACE_ID_HEADER));
        let exposed = res
            .headers()
            .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
            .and_then(|value| value.to_str().ok())
            .expect("exposed headers");
        assert!(exposed.contains(TRACE_ID_HEADER));
    }
}
