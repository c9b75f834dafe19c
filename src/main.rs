//! Spacebook backend server
//!
//! Books rentable spaces by the hour, prices them in VES with a USD
//! equivalent, and schedules optional monthly installments.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use spacebook_api::{configure_api, AppState, Repositories};
use spacebook_auth::JwtService;
use spacebook_core::{AppConfig, Clock, SystemClock};
use spacebook_db::{
    create_pool, run_migrations, PgBookingStore, PgInstallmentRepository,
    PgReservationRepository, PgSpaceRepository, PgUserRepository,
};
use spacebook_rates::cache_from_config;
use std::env;
use std::io;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "spacebook={lvl},spacebook_api={lvl},spacebook_services={lvl},spacebook_db={lvl},spacebook_rates={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn startup_error(what: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", what, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", what, err))
}

fn cors(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(spacebook_api::REQUEST_ID_HEADER),
        ])
        .expose_headers(vec![
            header::CONTENT_DISPOSITION,
            header::HeaderName::from_static(spacebook_api::REQUEST_ID_HEADER),
        ])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Spacebook v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| startup_error("Failed to create database pool", e))?;

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .map_err(|e| startup_error("Failed to run migrations", e))?;
    } else {
        warn!("Skipping migrations; run_migrations is disabled");
    }

    let repos = Repositories {
        users: Arc::new(PgUserRepository::new(pool.clone())),
        spaces: Arc::new(PgSpaceRepository::new(pool.clone())),
        reservations: Arc::new(PgReservationRepository::new(pool.clone())),
        installments: Arc::new(PgInstallmentRepository::new(pool.clone())),
        booking: Arc::new(PgBookingStore::new(
            pool.clone(),
            config.database.lock_timeout_ms,
        )),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let rates = cache_from_config(&config.exchange_rate, clock.clone())
        .map_err(|e| startup_error("Failed to build exchange rate provider", e))?;
    info!(
        provider = ?config.exchange_rate.provider,
        fallback = ?config.exchange_rate.fallback,
        ttl_secs = config.exchange_rate.ttl_secs,
        "Exchange rate cache configured"
    );

    let jwt = Arc::new(JwtService::new(
        &config.auth.jwt_secret,
        config.auth.jwt_expiration_secs,
    ));
    info!(
        "JWT service configured with {} second token expiration",
        config.auth.jwt_expiration_secs
    );

    let state = web::Data::new(AppState::new(
        repos,
        Arc::new(rates),
        jwt.clone(),
        &config.booking,
        clock,
    ));
    let jwt = web::Data::from(jwt);

    let bind_addr = config.server_addr();
    let cors_origins = config.server.cors_origins.clone();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(jwt.clone())
            .wrap(cors(&cors_origins))
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_api)
    })
    .workers(config.server.workers)
    .bind(&bind_addr)?
    .run()
    .await
}
