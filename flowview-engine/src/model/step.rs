// Step Model
// Workflow steps as published by the orchestrator, and copy-on-write snapshots of them

use crate::error::{EngineError, EngineResult};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

/// One unit of work in the visualised workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,

    /// Display label
    #[serde(default)]
    pub name: String,

    /// Owning actor
    #[serde(default)]
    pub agent: String,

    #[serde(default)]
    pub status: StepStatus,

    /// Steps sharing a key run concurrently. `null` and `""` mean ungrouped.
    #[serde(default, deserialize_with = "deserialize_group_key")]
    pub parallel_group: Option<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            agent: agent.into(),
            status: StepStatus::Pending,
            parallel_group: None,
        }
    }

    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        let group = group.into();
        self.parallel_group = (!group.is_empty()).then_some(group);
        self
    }

    /// Key of the execution group this step belongs to. Ungrouped steps
    /// are keyed by their own id so they always form a singleton group.
    pub fn group_key(&self) -> &str {
        match self.parallel_group.as_deref() {
            Some(group) if !group.is_empty() => group,
            _ => &self.id,
        }
    }
}

fn deserialize_group_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|group| !group.is_empty()))
}

/// Execution status of a step.
///
/// Statuses the dashboard does not know are preserved verbatim rather than
/// rejected, so a newer orchestrator never breaks rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Failed,
    Done,
    Unknown(String),
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Failed => "failed",
            StepStatus::Done => "done",
            StepStatus::Unknown(raw) => raw,
        }
    }
}

impl From<String> for StepStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => StepStatus::Pending,
            "running" => StepStatus::Running,
            "failed" => StepStatus::Failed,
            "done" => StepStatus::Done,
            _ => StepStatus::Unknown(value),
        }
    }
}

impl From<&str> for StepStatus {
    fn from(value: &str) -> Self {
        StepStatus::from(value.to_string())
    }
}

impl From<StepStatus> for String {
    fn from(status: StepStatus) -> Self {
        match status {
            StepStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, shared list of steps.
///
/// Any logical change produces a new snapshot, so "rebuild needed" is a
/// pointer comparison rather than a deep equality check.
#[derive(Debug, Clone, Default)]
pub struct StepSnapshot {
    steps: Arc<Vec<Step>>,
}

/// Project status document served by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectStatus {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Steps(Vec<Step>),
    Project(ProjectStatus),
}

impl StepSnapshot {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(steps),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// True when both handles point at the same published snapshot
    pub fn is_same(&self, other: &StepSnapshot) -> bool {
        Arc::ptr_eq(&self.steps, &other.steps)
    }

    /// Publish a new snapshot with one step's status replaced.
    ///
    /// Returns the same snapshot when the id is unknown or the status is
    /// unchanged, so consumers see no identity change.
    pub fn with_status(&self, id: &str, status: StepStatus) -> StepSnapshot {
        let Some(index) = self.steps.iter().position(|step| step.id == id) else {
            return self.clone();
        };
        if self.steps[index].status == status {
            return self.clone();
        }

        let mut steps = self.steps.as_ref().clone();
        steps[index].status = status;
        StepSnapshot::new(steps)
    }

    /// Parse either a bare JSON array of steps or a project status document
    pub fn from_json(content: &str) -> EngineResult<Self> {
        let steps = match serde_json::from_str::<SnapshotDocument>(content)? {
            SnapshotDocument::Steps(steps) => steps,
            SnapshotDocument::Project(project) => project.steps,
        };
        Self::checked(steps)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| EngineError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Build a snapshot after checking the id invariants
    pub fn checked(steps: Vec<Step>) -> EngineResult<Self> {
        let mut seen = HashSet::with_capacity(steps.len());
        for step in &steps {
            if step.id.is_empty() {
                return Err(EngineError::InvalidSnapshot(format!(
                    "step '{}' has an empty id",
                    step.name
                )));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(EngineError::InvalidSnapshot(format!(
                    "duplicate step id '{}'",
                    step.id
                )));
            }
        }
        Ok(Self::new(steps))
    }
}

impl Deref for StepSnapshot {
    type Target = [Step];

    fn deref(&self) -> &Self::Target {
        &self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_falls_back_to_id() {
        let ungrouped = Step::new("s1", "Plan", "ceo");
        let grouped = Step::new("s2", "Code", "dev").with_group("g1");
        let empty = Step::new("s3", "Test", "dev").with_group("");

        assert_eq!(ungrouped.group_key(), "s1");
        assert_eq!(grouped.group_key(), "g1");
        assert_eq!(empty.group_key(), "s3");
    }

    #[test]
    fn test_status_round_trips_unknown_values() {
        let status: StepStatus = serde_json::from_str("\"queued\"").unwrap();
        assert_eq!(status, StepStatus::Unknown("queued".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"queued\"");

        let done: StepStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(done, StepStatus::Done);
    }

    #[test]
    fn test_parse_bare_step_array() {
        let snapshot = StepSnapshot::from_json(
            r#"[
                {"id": "a", "parallel_group": "g1"},
                {"id": "b", "name": "Build", "agent": "dev", "status": "running", "parallel_group": null}
            ]"#,
        )
        .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].parallel_group.as_deref(), Some("g1"));
        assert_eq!(snapshot[0].status, StepStatus::Pending);
        assert_eq!(snapshot[1].parallel_group, None);
        assert_eq!(snapshot[1].status, StepStatus::Running);
    }

    #[test]
    fn test_parse_project_status_document() {
        let snapshot = StepSnapshot::from_json(
            r#"{
                "project_id": "p-1",
                "status": "running",
                "steps": [
                    {"id": "s1", "name": "Plan", "agent": "ceo", "status": "done",
                     "parallel_group": "", "payload": {"files": []}}
                ],
                "artifacts": []
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].parallel_group, None);
        assert_eq!(snapshot[0].status, StepStatus::Done);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = StepSnapshot::from_json(r#"[{"id": "a"}, {"id": "a"}]"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_with_status_changes_identity() {
        let snapshot = StepSnapshot::new(vec![Step::new("s1", "Plan", "ceo")]);

        let updated = snapshot.with_status("s1", StepStatus::Running);
        assert!(!updated.is_same(&snapshot));
        assert_eq!(updated[0].status, StepStatus::Running);
        assert_eq!(snapshot[0].status, StepStatus::Pending);

        let unchanged = snapshot.with_status("missing", StepStatus::Done);
        assert!(unchanged.is_same(&snapshot));

        let same_status = snapshot.with_status("s1", StepStatus::Pending);
        assert!(same_status.is_same(&snapshot));
    }
}
