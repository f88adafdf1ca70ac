use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{DestinationProvider, DraftFields, DraftItem, EditableItem, SourceProvider};
use crate::error::MigrateError;
use crate::model::item::{Action, SourceItem, StepRecord, WorkItemKind};

/// JSON export of one project's test-management items, used as a migration
/// source when no live tracker is wired up.
#[derive(Debug, Deserialize)]
pub struct SnapshotFile {
    pub project: String,
    #[serde(default)]
    pub shared_steps: Vec<SourceItem>,
    #[serde(default)]
    pub test_cases: Vec<SourceItem>,
}

pub struct SnapshotSource {
    snapshot: SnapshotFile,
}

impl SnapshotSource {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
        let snapshot: SnapshotFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        Ok(Self { snapshot })
    }
}

#[async_trait]
impl SourceProvider for SnapshotSource {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn query_items(&self, project: &str, kind: WorkItemKind) -> Result<Vec<SourceItem>> {
        if project != self.snapshot.project {
            return Ok(Vec::new());
        }
        Ok(match kind {
            WorkItemKind::SharedStep => self.snapshot.shared_steps.clone(),
            WorkItemKind::TestCase => self.snapshot.test_cases.clone(),
        })
    }
}

/// A migrated work item as persisted by the snapshot destination, one JSON
/// file per item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: i64,
    pub kind: WorkItemKind,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflected_source_uri: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Default)]
struct DestState {
    next_id: i64,
    items: HashMap<(WorkItemKind, i64), StoredItem>,
}

/// Writes migrated items into a directory, assigning sequential ids at save
/// time. Ids start at 1 per destination, a numbering space unrelated to the
/// source system's.
pub struct SnapshotDestination {
    dir: PathBuf,
    state: Arc<Mutex<DestState>>,
}

impl SnapshotDestination {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            state: Arc::new(Mutex::new(DestState {
                next_id: 1,
                items: HashMap::new(),
            })),
        })
    }

    /// Returns the stored copy of a saved item, if any.
    pub async fn item(&self, kind: WorkItemKind, id: i64) -> Option<StoredItem> {
        self.state.lock().await.items.get(&(kind, id)).cloned()
    }
}

fn write_item(dir: &Path, item: &StoredItem) -> Result<()> {
    let path = dir.join(format!("{}-{}.json", item.kind.as_str(), item.id));
    let json = serde_json::to_string_pretty(item)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

struct SnapshotDraft {
    kind: WorkItemKind,
    fields: DraftFields,
    dir: PathBuf,
    state: Arc<Mutex<DestState>>,
    saved: Option<i64>,
}

#[async_trait]
impl DraftItem for SnapshotDraft {
    fn fields_mut(&mut self) -> &mut DraftFields {
        &mut self.fields
    }

    async fn save(&mut self) -> Result<i64> {
        if let Some(id) = self.saved {
            return Ok(id);
        }
        if self.fields.title.trim().is_empty() {
            return Err(MigrateError::Save("title must not be empty".into()).into());
        }

        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;

        let item = StoredItem {
            id,
            kind: self.kind,
            title: self.fields.title.clone(),
            description: self.fields.description.clone(),
            priority: self.fields.priority,
            state: self.fields.state.clone(),
            iteration_path: self.fields.iteration_path.clone(),
            area_path: self.fields.area_path.clone(),
            assigned_to: self.fields.assigned_to.clone(),
            tags: self.fields.tags.clone(),
            reflected_source_uri: self.fields.reflected_source_uri.clone(),
            actions: Vec::new(),
        };
        write_item(&self.dir, &item)?;
        state.items.insert((self.kind, id), item);

        self.saved = Some(id);
        Ok(id)
    }
}

struct SnapshotEditable {
    kind: WorkItemKind,
    id: i64,
    dir: PathBuf,
    state: Arc<Mutex<DestState>>,
    pending: Vec<Action>,
}

#[async_trait]
impl EditableItem for SnapshotEditable {
    fn append_step(&mut self, step: StepRecord) {
        self.pending.push(Action::Step(step));
    }

    fn append_shared_step_reference(&mut self, shared_step_id: i64) {
        self.pending.push(Action::SharedStepReference { shared_step_id });
    }

    async fn save(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .get_mut(&(self.kind, self.id))
            .ok_or(MigrateError::NotFound {
                kind: self.kind,
                id: self.id,
            })?;
        item.actions.append(&mut self.pending);
        write_item(&self.dir, item)?;
        Ok(())
    }
}

#[async_trait]
impl DestinationProvider for SnapshotDestination {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn create_item(&self, kind: WorkItemKind) -> Result<Box<dyn DraftItem>> {
        Ok(Box::new(SnapshotDraft {
            kind,
            fields: DraftFields::default(),
            dir: self.dir.clone(),
            state: self.state.clone(),
            saved: None,
        }))
    }

    async fn fetch_item(&self, kind: WorkItemKind, id: i64) -> Result<Box<dyn EditableItem>> {
        let state = self.state.lock().await;
        if !state.items.contains_key(&(kind, id)) {
            return Err(MigrateError::NotFound { kind, id }.into());
        }
        Ok(Box::new(SnapshotEditable {
            kind,
            id,
            dir: self.dir.clone(),
            state: self.state.clone(),
            pending: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot_json() -> &'static str {
        r#"{
            "project": "ProjA",
            "shared_steps": [
                {
                    "id": 100,
                    "title": "Log in",
                    "actions": [
                        {"type": "step", "title": "Open site", "expected_result": "Landing page"},
                        {"type": "step", "title": "Enter credentials", "expected_result": "Signed in"}
                    ]
                }
            ],
            "test_cases": [
                {
                    "id": 200,
                    "title": "Checkout",
                    "actions": [
                        {"type": "step", "title": "Add item to cart", "expected_result": "Cart has 1 item"},
                        {"type": "shared_step_reference", "shared_step_id": 100}
                    ]
                }
            ]
        }"#
    }

    #[tokio::test]
    async fn source_queries_by_kind_and_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, sample_snapshot_json()).unwrap();

        let source = SnapshotSource::load(&path).unwrap();

        let shared = source
            .query_items("ProjA", WorkItemKind::SharedStep)
            .await
            .unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].id, 100);
        assert_eq!(shared[0].actions.len(), 2);

        let cases = source
            .query_items("ProjA", WorkItemKind::TestCase)
            .await
            .unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(
            cases[0].actions[1],
            Action::SharedStepReference { shared_step_id: 100 }
        );

        let other = source
            .query_items("SomeOtherProject", WorkItemKind::TestCase)
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn load_rejects_malformed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SnapshotSource::load(&path).is_err());
    }

    #[tokio::test]
    async fn destination_assigns_sequential_ids_and_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let destination = SnapshotDestination::create(dir.path()).unwrap();

        let mut first = destination
            .create_item(WorkItemKind::SharedStep)
            .await
            .unwrap();
        first.fields_mut().title = "First".into();
        let first_id = first.save().await.unwrap();

        let mut second = destination
            .create_item(WorkItemKind::TestCase)
            .await
            .unwrap();
        second.fields_mut().title = "Second".into();
        let second_id = second.save().await.unwrap();

        assert_eq!(first_id, 1);
        assert_eq!(second_id, 2);
        assert!(dir.path().join("shared_step-1.json").exists());
        assert!(dir.path().join("test_case-2.json").exists());
    }

    #[tokio::test]
    async fn appended_actions_persist_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let destination = SnapshotDestination::create(dir.path()).unwrap();

        let mut draft = destination
            .create_item(WorkItemKind::TestCase)
            .await
            .unwrap();
        draft.fields_mut().title = "Checkout".into();
        let id = draft.save().await.unwrap();

        let mut editable = destination
            .fetch_item(WorkItemKind::TestCase, id)
            .await
            .unwrap();
        editable.append_step(StepRecord {
            title: "Add item".into(),
            expected_result: "Cart updated".into(),
        });
        editable.append_shared_step_reference(7);
        editable.save().await.unwrap();

        let stored = destination.item(WorkItemKind::TestCase, id).await.unwrap();
        assert_eq!(stored.actions.len(), 2);
        assert_eq!(
            stored.actions[1],
            Action::SharedStepReference { shared_step_id: 7 }
        );

        let on_disk = std::fs::read_to_string(dir.path().join(format!("test_case-{id}.json"))).unwrap();
        let reread: StoredItem = serde_json::from_str(&on_disk).unwrap();
        assert_eq!(reread.actions, stored.actions);
    }

    #[tokio::test]
    async fn empty_title_is_a_save_error() {
        let dir = tempfile::tempdir().unwrap();
        let destination = SnapshotDestination::create(dir.path()).unwrap();

        let mut draft = destination
            .create_item(WorkItemKind::SharedStep)
            .await
            .unwrap();
        let err = draft.save().await.unwrap_err();
        assert!(err.to_string().contains("rejected save"));
    }

    #[tokio::test]
    async fn fetch_unknown_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let destination = SnapshotDestination::create(dir.path()).unwrap();
        let err = destination
            .fetch_item(WorkItemKind::SharedStep, 99)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("no shared step with id 99"));
    }
}
