use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "DevOps Demo API";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DOCS_PATH: &str = "/docs";

/// Current time as floating-point seconds since the Unix epoch.
pub fn unix_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub docs: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        ServiceInfo {
            message: SERVICE_NAME.to_string(),
            version: SERVICE_VERSION.to_string(),
            docs: DOCS_PATH.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: f64,
    pub environment: String,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy(environment: &str) -> Self {
        HealthResponse {
            status: "healthy".to_string(),
            timestamp: unix_timestamp(),
            environment: environment.to_string(),
            version: SERVICE_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CounterResponse {
    pub counter: i64,
    pub timestamp: f64,
}

impl CounterResponse {
    pub fn new(counter: i64) -> Self {
        CounterResponse {
            counter,
            timestamp: unix_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

impl From<bool> for CheckStatus {
    fn from(ok: bool) -> Self {
        if ok {
            CheckStatus::Ok
        } else {
            CheckStatus::Error
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "not ready")]
    NotReady,
}

/// Per-store outcome of the readiness check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub status: Readiness,
    pub redis: CheckStatus,
    pub postgres: CheckStatus,
}

impl ReadinessReport {
    pub fn new(redis_ok: bool, postgres_ok: bool) -> Self {
        let status = if redis_ok && postgres_ok {
            Readiness::Ready
        } else {
            Readiness::NotReady
        };

        ReadinessReport {
            status,
            redis: redis_ok.into(),
            postgres: postgres_ok.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == Readiness::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_readiness_report() {
        let ready = ReadinessReport::new(true, true);
        assert!(ready.is_ready());
        assert_eq!(
            serde_json::to_value(&ready).unwrap(),
            json!({ "status": "ready", "redis": "ok", "postgres": "ok" })
        );

        let degraded = ReadinessReport::new(true, false);
        assert!(!degraded.is_ready());
        assert_eq!(
            serde_json::to_value(&degraded).unwrap(),
            json!({ "status": "not ready", "redis": "ok", "postgres": "error" })
        );
    }

    #[test]
    fn test_counter_renders_as_integer() {
        let value = serde_json::to_value(CounterResponse::new(3)).unwrap();
        assert_eq!(value["counter"], json!(3));
        assert!(value["counter"].is_i64());
        assert!(value["timestamp"].is_f64());
    }

    #[test]
    fn test_unix_timestamp_is_recent() {
        let ts = unix_timestamp();
        // 2020-01-01T00:00:00Z
        assert!(ts > 1_577_836_800.0);
        assert!(ts.fract() >= 0.0);
    }

    #[test]
    fn test_service_info() {
        let info = ServiceInfo::default();
        assert_eq!(info.message, "DevOps Demo API");
        assert_eq!(info.version, "1.0.0");
        assert_eq!(info.docs, "/docs");
    }
}
