// ABOUTME: Error types for PageRelay including the ErrorCode enum and PageRelayError struct.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// Error codes representing the failure categories of a collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ConfigLoad,
    Extract,
    Relay,
    Settings,
    Fetch,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ConfigLoad => "config load error",
            ErrorCode::Extract => "extraction error",
            ErrorCode::Relay => "relay error",
            ErrorCode::Settings => "settings error",
            ErrorCode::Fetch => "fetch error",
        };
        write!(f, "{}", s)
    }
}

/// The error type shared by the collector and the relay boundary.
///
/// `target` names what the operation was acting on: a config location, a
/// page URL, a field name, or a backend URL.
#[derive(Debug, thiserror::Error)]
pub struct PageRelayError {
    pub code: ErrorCode,
    pub target: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for PageRelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pagerelay: {} {}: {}", self.op, self.target, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl PageRelayError {
    fn new(
        code: ErrorCode,
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            target: target.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a ConfigLoad error.
    pub fn config_load(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::ConfigLoad, target, op, source)
    }

    /// Create an Extract error.
    pub fn extract(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Extract, target, op, source)
    }

    /// Create a Relay error.
    pub fn relay(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Relay, target, op, source)
    }

    /// Create a Settings error.
    pub fn settings(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Settings, target, op, source)
    }

    /// Create a Fetch error.
    pub fn fetch(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Fetch, target, op, source)
    }

    /// Returns true if this is a ConfigLoad error.
    pub fn is_config_load(&self) -> bool {
        self.code == ErrorCode::ConfigLoad
    }

    /// Returns true if this is an Extract error.
    pub fn is_extract(&self) -> bool {
        self.code == ErrorCode::Extract
    }

    /// Returns true if this is a Relay error.
    pub fn is_relay(&self) -> bool {
        self.code == ErrorCode::Relay
    }

    /// Returns true if this is a Settings error.
    pub fn is_settings(&self) -> bool {
        self.code == ErrorCode::Settings
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }
}
