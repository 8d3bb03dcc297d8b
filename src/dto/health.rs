use serde::Serialize;
use utoipa::ToSchema;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` while storage is reachable, `degraded` otherwise.
    pub status: HealthStatus,
    /// Buzzer devices currently connected.
    pub buzzers_connected: usize,
}

impl HealthResponse {
    pub fn new(degraded: bool, buzzers_connected: usize) -> Self {
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self {
            status,
            buzzers_connected,
        }
    }
}
