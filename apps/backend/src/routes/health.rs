use actix_web::{web, HttpResponse};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    app_version: String,
    room_id: String,
    instance_id: String,
    connections: usize,
    store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_error: Option<String>,
    time: String,
}

async fn health(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let app_version = env!("CARGO_PKG_VERSION").to_string();

    let now = OffsetDateTime::now_utc();
    let time = now
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    let dispatcher = app_state.dispatcher();
    let (store, store_error) = match dispatcher.store().ping().await {
        Ok(()) => ("ok".to_string(), None),
        Err(e) => ("error".to_string(), Some(e.to_string())),
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        app_version,
        room_id: dispatcher.room_id().to_string(),
        instance_id: app_state.broker().instance_id().to_string(),
        connections: app_state.websocket_registry().active_connections_count(),
        store,
        store_error,
        time,
    };

    Ok(HttpResponse::Ok().json(response))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
