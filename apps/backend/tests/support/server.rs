// Real HTTP server for websocket tests

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use dealroom::routes;
use dealroom::state::app_state::AppState;
use dealroom::ws::hub::WsRegistry;

pub struct TestServer {
    pub handle: actix_web::dev::ServerHandle,
    pub addr: std::net::SocketAddr,
    pub join: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
        let _ = self.join.await;
    }
}

/// Start the full route table on a random local port.
pub async fn start_test_server(state: AppState) -> Result<TestServer, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let data = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .workers(1)
    .listen(listener)?
    .run();

    let handle = server.handle();
    let join = actix_web::rt::spawn(server);
    Ok(TestServer { handle, addr, join })
}

pub async fn wait_for_connections(
    registry: &Arc<WsRegistry>,
    expected: usize,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = tokio::time::Instant::now();
    loop {
        if registry.active_connections_count() == expected {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(format!(
                "timeout waiting for active_connections_count == {expected} (got {})",
                registry.active_connections_count()
            )
            .into());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
