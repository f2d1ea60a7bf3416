use actix_web::web;

use crate::ws::session;

pub mod health;

/// Register every HTTP route. Used by `main.rs` and by tests that spin up a
/// real server.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check routes: /health
    cfg.configure(health::configure_routes);

    // Websocket upgrade: /ws
    cfg.route("/ws", web::get().to(session::upgrade));
}
