use std::io::ErrorKind;
use std::net::TcpListener;

use actix_web::{web, App, HttpServer};
use dealroom::config::ServerConfig;
use dealroom::infra::state::build_state;
use dealroom::routes;
use tracing::{error, info, warn};

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    let config = match ServerConfig::from_env_and_args(std::env::args()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let app_state = match build_state()
        .with_config(config.clone())
        .with_redis()
        .build()
        .await
    {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, redis_url = %config.redis_url, "Failed to build application state");
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.dispatcher().bootstrap().await {
        error!(error = %e, room_id = %config.room_id, "Failed to load or create the game room");
        std::process::exit(1);
    }

    let listener = bind_with_fallback(&config)?;
    let addr = listener.local_addr()?;
    info!(%addr, room_id = %config.room_id, "Server listening");

    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .listen(listener)?
    .run()
    .await
}

/// Bind the configured port, moving up one port at a time while it is taken.
fn bind_with_fallback(config: &ServerConfig) -> std::io::Result<TcpListener> {
    let mut last_err = None;
    for port in config.candidate_ports() {
        match TcpListener::bind((config.host.as_str(), port)) {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                warn!(port, "Port in use, trying next one");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::new(ErrorKind::AddrInUse, "no port available")))
}
