pub mod snapshot;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::item::{SourceItem, StepRecord, WorkItemKind};

/// Field values for a destination work item draft. The reflected source URI
/// is only populated for test cases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftFields {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub iteration_path: String,
    pub area_path: String,
    pub state: String,
    pub assigned_to: String,
    pub tags: Vec<String>,
    pub reflected_source_uri: Option<String>,
}

/// Read side of a migration: queries work items of one kind for a project.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn query_items(&self, project: &str, kind: WorkItemKind) -> Result<Vec<SourceItem>>;
}

/// An unsaved destination work item. Saving assigns the destination id;
/// steps cannot be attached to a draft, only to a re-fetched editable item.
#[async_trait]
pub trait DraftItem: Send {
    fn fields_mut(&mut self) -> &mut DraftFields;
    async fn save(&mut self) -> Result<i64>;
}

/// A saved destination work item fetched back for step editing. Appended
/// actions are buffered until `save`.
#[async_trait]
pub trait EditableItem: Send {
    fn append_step(&mut self, step: StepRecord);
    fn append_shared_step_reference(&mut self, shared_step_id: i64);
    async fn save(&mut self) -> Result<()>;
}

/// Write side of a migration: creates, saves, and re-fetches work items.
#[async_trait]
pub trait DestinationProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn create_item(&self, kind: WorkItemKind) -> Result<Box<dyn DraftItem>>;
    async fn fetch_item(&self, kind: WorkItemKind, id: i64) -> Result<Box<dyn EditableItem>>;
}
