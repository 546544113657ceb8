use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

use mediaflow_relay::config::Config;
use mediaflow_relay::middleware::{PlainTextErrors, VersionHeader, VERSION};
use mediaflow_relay::proxy::{self, UpstreamClient};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
        )
        .try_init()
        .expect("Failed to initialize logging");

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    // Shared upstream client
    let upstream = web::Data::new(
        UpstreamClient::new(&config.proxy).expect("Failed to create upstream client"),
    );

    tracing::info!(
        "Starting relay {} on {}:{}",
        VERSION,
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        // Browser players fetch playlists and segments cross-origin
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(PlainTextErrors)
            .wrap(VersionHeader)
            // FastAPI-style access logs: IP:PORT - "METHOD PATH HTTP/VERSION" STATUS_CODE
            .wrap(Logger::new("%a - \"%r\" %s"))
            .app_data(upstream.clone())
            .configure(proxy::routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
