// Models module

pub mod service;
pub mod user;

// Re-export commonly used types
pub use service::{CounterResponse, HealthResponse, CheckStatus, ReadinessReport, ServiceInfo};
pub use user::{CreateUserRequest, User, UserList};
