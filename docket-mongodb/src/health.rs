//! Liveness and readiness checks.

use std::time::{Duration, Instant};

use bson::{Bson, Document, doc};
use mongodb::Database;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::MongoClient;
use crate::error::{MongoError, MongoResult};

/// Bound on a single check when the config carries no socket timeout.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Health status of the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Responding to pings.
    Healthy,
    /// Not responding, timed out or closed.
    Unhealthy,
}

/// Diagnostics read from `serverStatus`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerDetails {
    /// Server version string.
    pub version: Option<String>,
    /// Seconds since the server started.
    pub uptime_secs: Option<u64>,
    /// Connections currently open.
    pub connections_current: Option<u64>,
    /// Connections still available.
    pub connections_available: Option<u64>,
}

impl ServerDetails {
    fn from_status(status: &Document) -> Self {
        let connections = status.get_document("connections").ok();
        Self {
            version: status.get_str("version").ok().map(str::to_string),
            uptime_secs: status.get("uptime").and_then(as_u64),
            connections_current: connections.and_then(|c| c.get("current")).and_then(as_u64),
            connections_available: connections
                .and_then(|c| c.get("available"))
                .and_then(as_u64),
        }
    }
}

fn as_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Double(v) if *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Time spent on the ping, in milliseconds.
    pub latency_ms: u64,
    /// Human-readable summary.
    pub message: String,
    /// Server diagnostics, when they could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ServerDetails>,
}

impl HealthReport {
    fn healthy(latency: Duration, details: Option<ServerDetails>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: latency.as_millis() as u64,
            message: "ok".to_string(),
            details,
        }
    }

    fn unhealthy(latency: Duration, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: latency.as_millis() as u64,
            message: message.into(),
            details: None,
        }
    }

    /// Whether the check succeeded.
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Checks the health of a [`MongoClient`].
#[derive(Clone)]
pub struct HealthChecker {
    client: MongoClient,
    timeout: Duration,
}

impl HealthChecker {
    /// Create a checker bounded by the client's socket timeout, or
    /// [`DEFAULT_HEALTH_TIMEOUT`] when none is configured.
    pub fn new(client: MongoClient) -> Self {
        let timeout = client
            .config()
            .socket_timeout
            .unwrap_or(DEFAULT_HEALTH_TIMEOUT);
        Self { client, timeout }
    }

    /// Bound each server call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ping the server and read diagnostics.
    ///
    /// A closed client reports unhealthy without any network call. A failed
    /// `serverStatus` leaves `details` empty but does not fail the check.
    pub async fn check(&self) -> HealthReport {
        self.check_with_cancel(&CancellationToken::new()).await
    }

    /// [`check`](Self::check), abandoned early when `cancel` fires.
    pub async fn check_with_cancel(&self, cancel: &CancellationToken) -> HealthReport {
        let start = Instant::now();
        let database = match self.client.database() {
            Ok(database) => database,
            Err(e) => return HealthReport::unhealthy(start.elapsed(), e.to_string()),
        };

        if let Err(err) = self.bounded(cancel, ping(&database)).await {
            warn!(error = %err, "Health check failed");
            return HealthReport::unhealthy(start.elapsed(), err.to_string());
        }
        let latency = start.elapsed();

        let details = match self.bounded(cancel, server_status(&database)).await {
            Ok(status) => Some(ServerDetails::from_status(&status)),
            Err(err) => {
                debug!(error = %err, "serverStatus unavailable");
                None
            }
        };

        HealthReport::healthy(latency, details)
    }

    /// Whether the server answers a ping.
    pub async fn is_healthy(&self) -> bool {
        self.check().await.is_healthy()
    }

    /// Healthy, and able to list collections.
    pub async fn check_readiness(&self) -> HealthReport {
        let report = self.check().await;
        if !report.is_healthy() {
            return report;
        }

        let database = match self.client.database() {
            Ok(database) => database,
            Err(e) => return HealthReport::unhealthy(Duration::ZERO, e.to_string()),
        };
        let listing = async {
            database.list_collection_names(None).await?;
            Ok(())
        };
        match self.bounded(&CancellationToken::new(), listing).await {
            Ok(()) => report,
            Err(err) => {
                warn!(error = %err, "Readiness check failed");
                HealthReport::unhealthy(
                    Duration::from_millis(report.latency_ms),
                    format!("not ready: {}", err),
                )
            }
        }
    }

    async fn bounded<T, F>(&self, cancel: &CancellationToken, fut: F) -> MongoResult<T>
    where
        F: Future<Output = MongoResult<T>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MongoError::Cancelled("health check")),
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(MongoError::Timeout(self.timeout.as_millis() as u64)),
            },
        }
    }
}

async fn ping(database: &Database) -> MongoResult<()> {
    database.run_command(doc! { "ping": 1 }, None).await?;
    Ok(())
}

async fn server_status(database: &Database) -> MongoResult<Document> {
    Ok(database.run_command(doc! { "serverStatus": 1 }, None).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MongoConfig;
    use pretty_assertions::assert_eq;

    async fn client() -> MongoClient {
        let config = MongoConfig::builder()
            .uri("mongodb://127.0.0.1:1/?directConnection=true")
            .database("docket_test")
            .server_selection_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        MongoClient::unverified(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_closed_client_is_unhealthy_immediately() {
        let client = client().await;
        client.close().await;
        let checker = HealthChecker::new(client);

        let start = Instant::now();
        let report = checker.check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.details.is_none());
        assert!(!checker.is_healthy().await);
        assert!(!checker.check_readiness().await.is_healthy());
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_bounded_by_timeout() {
        let checker = HealthChecker::new(client().await).with_timeout(Duration::from_millis(50));
        let start = Instant::now();
        let report = checker.check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.message.contains("timed out"), "{}", report.message);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_cancelled_check_is_unhealthy() {
        let checker = HealthChecker::new(client().await);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = checker.check_with_cancel(&cancel).await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.message, MongoError::Cancelled("health check").to_string());
    }

    #[tokio::test]
    async fn test_timeout_follows_socket_timeout() {
        let config = MongoConfig::builder()
            .uri("mongodb://127.0.0.1:1/?directConnection=true")
            .database("docket_test")
            .socket_timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        let client = MongoClient::unverified(config).await.unwrap();
        assert_eq!(HealthChecker::new(client.clone()).timeout, Duration::from_millis(250));
        assert_eq!(
            HealthChecker::new(client).with_timeout(Duration::from_secs(1)).timeout,
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_server_details_from_status() {
        let status = doc! {
            "version": "7.0.4",
            "uptime": 3600.5,
            "connections": { "current": 12, "available": 838_848_i64 },
        };
        assert_eq!(
            ServerDetails::from_status(&status),
            ServerDetails {
                version: Some("7.0.4".to_string()),
                uptime_secs: Some(3600),
                connections_current: Some(12),
                connections_available: Some(838_848),
            }
        );
        assert_eq!(ServerDetails::from_status(&doc! {}), ServerDetails::default());
    }

    #[test]
    fn test_report_serializes() {
        let report = HealthReport::healthy(Duration::from_millis(3), None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["latency_ms"], 3);
        assert!(json.get("details").is_none());
    }
}
