//! Unified error types for the perfpane workspace.
//!
//! Provider and degenerate-delta errors are recovered inside the sampler;
//! render-surface errors are fatal once layout recomputation cannot help;
//! cancellation unwinds the worker through its stopped state.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum PerfpaneError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A metric source is unavailable, timed out, or produced output that
    /// does not parse to the expected counter shape.
    #[error("metric provider {provider} failed: {message}")]
    Provider {
        /// Name of the failing provider.
        provider: &'static str,
        /// What went wrong.
        message: String,
    },

    /// The summed counter delta of a core was zero on this tick.
    #[error("degenerate counter delta on core {core}")]
    DegenerateDelta {
        /// Index of the core whose counters did not advance.
        core: usize,
    },

    /// The terminal is too small or the surface could not be drawn.
    #[error("render surface error: {message}")]
    RenderSurface {
        /// Description of the surface failure.
        message: String,
    },

    /// An explicit stop request was observed.
    #[error("cancellation requested")]
    CancellationRequested,

    /// Raw provider output could not be decoded with the configured encoding.
    #[error("output is not valid {encoding}")]
    Decode {
        /// Name of the configured text encoding.
        encoding: &'static str,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl PerfpaneError {
    /// Builds a [`PerfpaneError::Provider`] from any displayable cause.
    pub fn provider(provider: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Provider {
            provider,
            message: message.to_string(),
        }
    }

    /// Builds a [`PerfpaneError::RenderSurface`] from any displayable cause.
    pub fn surface(message: impl std::fmt::Display) -> Self {
        Self::RenderSurface {
            message: message.to_string(),
        }
    }

    /// Returns whether the sampler is expected to recover from this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::DegenerateDelta { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PerfpaneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_are_recoverable() {
        let err = PerfpaneError::provider("gpu", "binary missing");
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "metric provider gpu failed: binary missing");
    }

    #[test]
    fn surface_errors_are_fatal() {
        assert!(!PerfpaneError::surface("terminal too small").is_recoverable());
        assert!(!PerfpaneError::CancellationRequested.is_recoverable());
    }
}
