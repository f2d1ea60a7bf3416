use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::SessionDispatcher;
use crate::state::app_state::AppState;
use crate::ws::hub::{ClientSink, WsRegistry};
use crate::ws::protocol::{ClientMsg, ServerMsg};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(
        Uuid::new_v4(),
        app_state.dispatcher(),
        app_state.websocket_registry(),
    );
    ws::start(session, &req, stream)
}

/// One event for one connection.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Deliver(pub ServerMsg);

/// Hub entry for a session; also the reply channel its commands write to.
struct SessionSink {
    recipient: Recipient<Deliver>,
}

impl ClientSink for SessionSink {
    fn deliver(&self, msg: &ServerMsg) {
        self.recipient.do_send(Deliver(msg.clone()));
    }
}

pub struct WsSession {
    conn_id: Uuid,
    dispatcher: Arc<SessionDispatcher>,
    registry: Arc<WsRegistry>,

    // Commands are queued here and executed one at a time, in arrival order.
    commands: Option<mpsc::UnboundedSender<ClientMsg>>,

    last_heartbeat: Instant,
}

impl WsSession {
    fn new(conn_id: Uuid, dispatcher: Arc<SessionDispatcher>, registry: Arc<WsRegistry>) -> Self {
        Self {
            conn_id,
            dispatcher,
            registry,
            commands: None,
            last_heartbeat: Instant::now(),
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "[WS SESSION] failed to serialize outbound message"),
        }
    }

    /// Reject a frame without closing the socket.
    fn reject_frame(&self, ctx: &mut ws::WebsocketContext<Self>, err: AppError) {
        debug!(conn_id = %self.conn_id, code = %err.code(), error = %err, "[WS SESSION] frame rejected");
        Self::send_json(
            ctx,
            &ServerMsg::Error {
                text: err.client_message(),
            },
        );
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(conn_id = %actor.conn_id, "[WS SESSION] heartbeat timed out");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    /// Worker that drains this connection's command queue sequentially.
    fn start_worker(&mut self, sink: Arc<SessionSink>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ClientMsg>();
        let dispatcher = self.dispatcher.clone();
        let conn_id = self.conn_id;

        actix_web::rt::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                dispatcher.handle(cmd, &*sink).await;
            }
            debug!(conn_id = %conn_id, "[WS SESSION] command worker finished");
        });

        self.commands = Some(tx);
    }

    fn enqueue(&mut self, cmd: ClientMsg, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(commands) = &self.commands else {
            return;
        };
        if commands.send(cmd).is_err() {
            warn!(conn_id = %self.conn_id, "[WS SESSION] command worker gone, closing");
            ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
            ctx.stop();
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "[WS SESSION] started");

        let sink = Arc::new(SessionSink {
            recipient: ctx.address().recipient::<Deliver>(),
        });
        self.registry.register_connection(self.conn_id, sink.clone());
        self.start_worker(sink);
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.registry.unregister_connection(self.conn_id);
        // Dropping the sender lets the worker finish whatever is queued and exit.
        self.commands = None;
        info!(conn_id = %self.conn_id, "[WS SESSION] stopped");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(cmd) => {
                        debug!(conn_id = %self.conn_id, kind = cmd.kind(), "[WS SESSION] command received");
                        self.enqueue(cmd, ctx);
                    }
                    Err(err) => {
                        debug!(conn_id = %self.conn_id, error = %err, "[WS SESSION] malformed message");
                        self.reject_frame(ctx, AppError::bad_request("Malformed message"));
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                self.reject_frame(ctx, AppError::bad_request("Binary not supported"));
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "[WS SESSION] protocol error");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

impl Handler<Deliver> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) -> Self::Result {
        Self::send_json(ctx, &msg.0);
    }
}
