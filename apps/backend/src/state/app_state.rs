use std::sync::Arc;

use crate::services::SessionDispatcher;
use crate::ws::broker::RealtimeBroker;
use crate::ws::hub::WsRegistry;

/// Application state shared by every worker and websocket session.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<SessionDispatcher>,
}

impl AppState {
    pub fn new(dispatcher: SessionDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> Arc<SessionDispatcher> {
        self.dispatcher.clone()
    }

    pub fn broker(&self) -> &Arc<RealtimeBroker> {
        self.dispatcher.broker()
    }

    /// Connections attached to this process.
    pub fn websocket_registry(&self) -> Arc<WsRegistry> {
        self.dispatcher.broker().registry()
    }
}
