//! User Alerts
//!
//! Transient notifications shown to the person running an import or
//! exploring data. The binaries log them; the HTTP service keeps the
//! recent ones so a dashboard can display them.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Mutex;

/// How long an alert stays visible
pub const ALERT_DURATION_MS: u64 = 3000;

/// A transient notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub message: String,
    pub duration_ms: u64,
    pub critical: bool,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Critical alert with the default duration
    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration_ms: ALERT_DURATION_MS,
            critical: true,
            created_at: Utc::now(),
        }
    }

    /// Whether the alert is still visible at `now`
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        now < self.created_at + Duration::milliseconds(self.duration_ms as i64)
    }
}

/// Destination for alerts
pub trait AlertSink: Send + Sync {
    fn show(&self, alert: &Alert);
}

/// Writes alerts to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn show(&self, alert: &Alert) {
        if alert.critical {
            tracing::error!(alert = %alert.message, "User alert");
        } else {
            tracing::warn!(alert = %alert.message, "User alert");
        }
    }
}

/// Keeps alerts in memory
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts shown so far
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Alerts still visible now; expired ones are dropped
    pub fn active(&self) -> Vec<Alert> {
        let now = Utc::now();
        let mut alerts = self.alerts.lock().unwrap_or_else(|e| e.into_inner());
        alerts.retain(|a| a.is_visible_at(now));
        alerts.clone()
    }
}

impl AlertSink for MemoryAlertSink {
    fn show(&self, alert: &Alert) {
        TracingAlertSink.show(alert);
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert.clone());
    }
}
