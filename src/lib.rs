// Library root for the DevOps demo API

pub mod cache;
pub mod config;
pub mod connections;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use connections::{Connections, Unavailable};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
