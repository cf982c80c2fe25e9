// Dashboard Events
// Discriminated union of payloads streamed from the backend

use crate::error::EngineResult;

use serde::{Deserialize, Serialize};

/// One payload from the backend event stream, tagged by `type`.
///
/// Only `communication` feeds the overlay. Log records and unknown types
/// belong to other consumers and pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// An agent talked to another agent
    Communication { data: Communication },

    /// Orchestrator log record
    Event(LogRecord),

    /// Any other payload type
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    pub source: String,
    pub target: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub artifact_path: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

fn default_level() -> String {
    "info".to_string()
}

impl DashboardEvent {
    /// Create a communication event
    pub fn communication(
        source: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Communication {
            data: Communication {
                source: source.into(),
                target: target.into(),
                message: message.into(),
            },
        }
    }

    /// Create a log record event
    pub fn log(agent: impl Into<String>, level: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Event(LogRecord {
            timestamp: None,
            project_id: None,
            agent: Some(agent.into()),
            level: level.into(),
            msg: msg.into(),
            artifact_path: None,
            data: None,
        })
    }

    /// Parse a single JSON payload
    pub fn from_json(content: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Wire name of the payload type
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardEvent::Communication { .. } => "communication",
            DashboardEvent::Event(_) => "event",
            DashboardEvent::Unknown => "unknown",
        }
    }

    pub fn as_communication(&self) -> Option<&Communication> {
        match self {
            DashboardEvent::Communication { data } => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_parse_communication() {
        let event = DashboardEvent::from_json(
            r#"{"type": "communication", "data": {"source": "ceo", "target": "Code", "message": "go"}}"#,
        )
        .unwrap();

        assert_eq!(event, DashboardEvent::communication("ceo", "Code", "go"));
        assert_eq!(event.kind(), "communication");
    }

    #[test]
    fn test_parse_backend_log_record() {
        let event = DashboardEvent::from_json(
            r#"{
                "type": "event",
                "timestamp": "2024-05-01T10:00:00+00:00",
                "project_id": "p-1",
                "agent": "developer",
                "level": "warning",
                "msg": "Retrying LLM generation",
                "artifact_path": null,
                "data": {}
            }"#,
        )
        .unwrap();

        let DashboardEvent::Event(record) = &event else {
            panic!("wrong event type");
        };
        assert_eq!(record.agent.as_deref(), Some("developer"));
        assert_eq!(record.level, "warning");
        assert!(event.as_communication().is_none());
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let event = DashboardEvent::from_json(r#"{"type": "status"}"#).unwrap();
        assert_eq!(event, DashboardEvent::Unknown);
    }

    #[test]
    fn test_communication_missing_field_is_rejected() {
        let err = DashboardEvent::from_json(
            r#"{"type": "communication", "data": {"source": "ceo", "message": "go"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
