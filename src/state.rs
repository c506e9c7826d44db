use std::sync::Arc;

use crate::connections::Connections;

/// Shared application state handed to every handler.
/// Cloning is cheap: the store handles live behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<Connections>,
    pub environment: Arc<str>,
}

impl AppState {
    pub fn new(connections: Connections, environment: impl Into<Arc<str>>) -> Self {
        AppState {
            connections: Arc::new(connections),
            environment: environment.into(),
        }
    }
}
