use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    SharedStep,
    TestCase,
}

impl WorkItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemKind::SharedStep => "shared_step",
            WorkItemKind::TestCase => "test_case",
        }
    }
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItemKind::SharedStep => f.write_str("shared step"),
            WorkItemKind::TestCase => f.write_str("test case"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub title: String,
    #[serde(default)]
    pub expected_result: String,
}

/// One entry of an item's ordered action sequence. Sequence order is the
/// execution order of the item and must survive migration unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Step(StepRecord),
    SharedStepReference { shared_step_id: i64 },
    /// Action kinds introduced after this tool was written deserialize here
    /// and are dropped during migration instead of failing the item.
    #[serde(other)]
    Unknown,
}

/// A work item as returned by a source provider query, for either kind.
/// Test cases may carry `SharedStepReference` actions; shared steps only
/// carry regular steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub iteration_path: String,
    #[serde(default)]
    pub area_path: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}
