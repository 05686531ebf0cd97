use shared::{error::RemoteFailure, protocol::ActionResponse};

use crate::service::ServiceError;

/// Result of one remote action, kept as data instead of error flow so the
/// coordinator can treat all three cases uniformly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    Success(T),
    Failure(RemoteFailure),
    TransportError(String),
}

impl CallOutcome<ActionResponse> {
    pub fn from_action(result: Result<ActionResponse, ServiceError>) -> Self {
        match result {
            Ok(response) if response.ok => CallOutcome::Success(response),
            Ok(response) => CallOutcome::Failure(RemoteFailure::from(response)),
            Err(err) => CallOutcome::TransportError(err.to_string()),
        }
    }

    /// Text for the log view: the service log, or the stringified transport error.
    pub fn log_text(&self) -> &str {
        match self {
            CallOutcome::Success(response) => response.log_text(),
            CallOutcome::Failure(failure) => &failure.log,
            CallOutcome::TransportError(cause) => cause,
        }
    }
}

impl<T> CallOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }
}
