use abuseguard_config::AppConfig;
use abuseguard_middleware::auth::AuthMiddlewareFactory;
use abuseguard_observability::{info, init_tracing, observability, TracingConfig};
use abuseguard_security::{configure_routes, AppState};
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize observability with structured logging
    init_tracing(TracingConfig::for_service("security-service"));

    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config).await?;

    info!(
        storage = state.storage_label(),
        burst_per_minute = state.engine.scanner().policy().burst_per_minute,
        "🚀 [Security Service] Starting on port {}",
        config.port
    );

    let auth_middleware = AuthMiddlewareFactory::new();
    let state = web::Data::new(state);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(observability("security-service"))
            .wrap(auth_middleware.clone())
            .configure(configure_routes)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    Ok(())
}

