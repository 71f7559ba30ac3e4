//! Unified error handling for the cardio-tracker library.
//!
//! Only caller mistakes surface as errors. Noisy samples, step counter
//! regressions and missing body weight are handled in place (see
//! [`crate::filter::RejectReason`] and [`crate::calories::CalorieEstimate`]).

use thiserror::Error;

use crate::session::SessionState;

/// Unified error type for tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    /// A lifecycle call was made from a state that does not permit it.
    /// The session is left unchanged.
    #[error("Cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },
    /// `start` was called while another session is still live
    #[error("A cardio session is already active (started at {started_at})")]
    SessionAlreadyActive { started_at: i64 },
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl TrackerError {
    /// True for errors the caller can ignore without losing data.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, TrackerError::InvalidTransition { .. })
    }
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackerError::InvalidTransition {
            from: SessionState::Idle,
            action: "pause",
        };
        assert_eq!(err.to_string(), "Cannot pause a session that is idle");
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn test_config_error_display() {
        let err = TrackerError::Config {
            message: "min_interval_ms must be positive".to_string(),
        };
        assert!(err.to_string().contains("min_interval_ms"));
        assert!(!err.is_invalid_transition());
    }
}
