use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::ActionResponse;

/// Logical failure reported by the service inside an otherwise valid reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("remote operation failed{}", stage_suffix(.stage))]
pub struct RemoteFailure {
    pub log: String,
    pub stage: Option<String>,
}

fn stage_suffix(stage: &Option<String>) -> String {
    stage
        .as_deref()
        .map(|stage| format!(" at stage {stage}"))
        .unwrap_or_default()
}

impl RemoteFailure {
    pub fn new(log: impl Into<String>, stage: Option<String>) -> Self {
        Self {
            log: log.into(),
            stage,
        }
    }
}

impl From<ActionResponse> for RemoteFailure {
    fn from(value: ActionResponse) -> Self {
        Self {
            log: value.log.unwrap_or_default(),
            stage: value.stage.filter(|stage| !stage.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_stage_when_present() {
        let failure = RemoteFailure::new("ERROR pairing", Some("pair".to_string()));
        assert_eq!(failure.to_string(), "remote operation failed at stage pair");
        let failure = RemoteFailure::new("", None);
        assert_eq!(failure.to_string(), "remote operation failed");
    }

    #[test]
    fn empty_stage_from_response_is_dropped() {
        let failure = RemoteFailure::from(ActionResponse {
            ok: false,
            log: None,
            stage: Some(String::new()),
            info: None,
        });
        assert_eq!(failure.stage, None);
        assert_eq!(failure.log, "");
    }
}
