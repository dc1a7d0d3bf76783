//! Notification record types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque notification identifier. Never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToastId(pub(crate) u64);

impl ToastId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// Severity classification, used by renderers for styling only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        f.pad(label)
    }
}

/// A live notification as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: ToastId,
    pub severity: Severity,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Auto-dismiss delay; `0` means the notice stays until dismissed or
    /// evicted.
    pub duration_ms: u64,
}

impl Toast {
    pub fn is_sticky(&self) -> bool {
        self.duration_ms == 0
    }
}

/// Publish arguments in builder form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastOptions {
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` applies the queue's default duration.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl ToastOptions {
    pub fn new(severity: Severity, title: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            description: None,
            duration_ms: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Keep the notice until it is dismissed or evicted.
    pub fn sticky(self) -> Self {
        self.duration_ms(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let opts = ToastOptions::new(Severity::Warning, "Slow network")
            .description("Retrying in the background")
            .sticky();
        assert_eq!(opts.duration_ms, Some(0));
        assert_eq!(opts.description.as_deref(), Some("Retrying in the background"));
    }

    #[test]
    fn test_severity_wire_names() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
        let parsed: Severity = serde_json::from_str("\"success\"").unwrap();
        assert_eq!(parsed, Severity::Success);
    }

    #[test]
    fn test_toast_id_display() {
        assert_eq!(ToastId(12).to_string(), "toast-12");
    }
}
