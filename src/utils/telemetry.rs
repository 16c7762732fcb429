// file: src/utils/telemetry.rs
// description: health reporting for the verify command and timing of pipeline passes
// reference: component checks with response times

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn icon(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✓",
            HealthStatus::Degraded => "⚠",
            HealthStatus::Unhealthy => "✗",
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthCheck {
    pub fn healthy(component: &str, response_time: Duration) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms: response_time.as_millis() as u64,
        }
    }

    pub fn degraded(component: &str, message: String, response_time: Duration) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Degraded,
            message: Some(message),
            response_time_ms: response_time.as_millis() as u64,
        }
    }

    pub fn unhealthy(component: &str, message: String, response_time: Duration) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(message),
            response_time_ms: response_time.as_millis() as u64,
        }
    }
}

/// Overall system health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub timestamp: u64,
    pub version: String,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheck>, version: String) -> Self {
        let overall_status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_secs();

        Self {
            overall_status,
            checks,
            timestamp,
            version,
        }
    }

    /// True unless some check failed outright; a degraded report still passes.
    pub fn is_usable(&self) -> bool {
        self.overall_status != HealthStatus::Unhealthy
    }

    pub fn format(&self) -> String {
        let checked_at = chrono::DateTime::from_timestamp(self.timestamp as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let mut output = format!(
            "{} Pipeline health: {:?} (v{}, {})\n",
            self.overall_status.icon(),
            self.overall_status,
            self.version,
            checked_at
        );

        for check in &self.checks {
            output.push_str(&format!(
                "  {} {:<48} {:>6}ms",
                check.status.icon(),
                check.component,
                check.response_time_ms
            ));
            if let Some(message) = &check.message {
                output.push_str(&format!("  {}", message));
            }
            output.push('\n');
        }

        output
    }
}

/// Operation timer for performance tracking
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        info!("Starting operation: {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "Completed operation: {} in {:.2}s",
            self.operation,
            elapsed.as_secs_f64()
        );
        elapsed
    }

    pub fn finish_with_count(self, count: usize) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "Completed operation: {} - {} items in {:.2}s ({:.2} items/sec)",
            self.operation,
            count,
            elapsed.as_secs_f64(),
            if elapsed.as_secs_f64() > 0.0 {
                count as f64 / elapsed.as_secs_f64()
            } else {
                0.0
            }
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_creation() {
        let check = HealthCheck::healthy("opensearch", Duration::from_millis(50));
        assert_eq!(check.component, "opensearch");
        assert_eq!(check.status, HealthStatus::Healthy);
        assert_eq!(check.response_time_ms, 50);
    }

    #[test]
    fn test_health_report_overall_status() {
        let checks = vec![
            HealthCheck::healthy("source index", Duration::from_millis(10)),
            HealthCheck::degraded(
                "destination index",
                "index does not exist yet".to_string(),
                Duration::from_millis(100),
            ),
        ];

        let report = HealthReport::new(checks, "0.1.0".to_string());
        assert_eq!(report.overall_status, HealthStatus::Degraded);
        assert!(report.is_usable());

        let text = report.format();
        assert!(text.contains("destination index"));
        assert!(text.contains("index does not exist yet"));
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("reindex");
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.finish();
        assert!(elapsed >= Duration::from_millis(10));
    }
}
