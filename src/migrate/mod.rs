pub mod report;
pub mod shared_steps;
pub mod test_cases;


use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::journal::Journal;
use crate::mapping::{IdentityMap, UserMap};
use crate::model::item::{SourceItem, WorkItemKind};
use crate::providers::{DestinationProvider, DraftFields, SourceProvider};
use self::report::MigrationReport;

/// Progress and completion messages posted to the caller's channel while a
/// run executes. Sends are fire-and-forget; a dropped receiver never stalls
/// the run.
#[derive(Debug, Clone)]
pub enum StatusUpdate {
    Progress {
        kind: WorkItemKind,
        processed: usize,
        failed: usize,
    },
    PhaseComplete {
        kind: WorkItemKind,
        report: MigrationReport,
    },
    /// Posted exactly once, after both phases have finished.
    RunComplete {
        shared_steps: MigrationReport,
        test_cases: MigrationReport,
    },
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusUpdate::Progress {
                kind,
                processed,
                failed,
            } => write!(f, "Processing {kind} {processed} ({failed})"),
            StatusUpdate::PhaseComplete { kind, report } => write!(
                f,
                "Successfully migrated {} of {} {kind}s in {:.1} seconds",
                report.succeeded(),
                report.attempted,
                report.elapsed.as_secs_f64()
            ),
            StatusUpdate::RunComplete {
                shared_steps,
                test_cases,
            } => write!(
                f,
                "{} of {} shared steps, {} of {} test cases migrated. PROCESSING COMPLETE.",
                shared_steps.succeeded(),
                shared_steps.attempted,
                test_cases.succeeded(),
                test_cases.attempted
            ),
        }
    }
}

pub type StatusSender = mpsc::UnboundedSender<StatusUpdate>;

/// Cooperative stop signal, honored between items, never mid-item.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The project pair being migrated, plus the destination collection URI used
/// to stamp migrated test cases with their origin.
#[derive(Debug, Clone)]
pub struct MigrationContext {
    pub source_project: String,
    pub destination_project: String,
    pub collection_base_uri: String,
}

impl MigrationContext {
    /// Rewrites an iteration or area path for the destination project by
    /// literal substring replacement of every occurrence of the source
    /// project name. A path that does not contain the source project name
    /// passes through untouched.
    pub fn rewrite_path(&self, path: &str) -> String {
        path.replace(&self.source_project, &self.destination_project)
    }

    /// Breadcrumb URI recording which source item a migrated test case came
    /// from.
    pub fn reflected_uri(&self, source_id: i64) -> String {
        format!(
            "{}//{}/{}",
            self.collection_base_uri, self.source_project, source_id
        )
    }
}

/// Everything a run needs: the two providers, the user translation table,
/// the journal, the status channel, and the cancel flag. The identity map is
/// created inside `run` and handed to the phases explicitly.
pub struct MigrationRun {
    pub source: Arc<dyn SourceProvider>,
    pub destination: Arc<dyn DestinationProvider>,
    pub users: UserMap,
    pub journal: Journal,
    pub status_tx: StatusSender,
    pub cancel: CancelFlag,
}

/// Per-phase reports for a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub shared_steps: MigrationReport,
    pub test_cases: MigrationReport,
}

impl RunSummary {
    pub fn failed_total(&self) -> usize {
        self.shared_steps.failed + self.test_cases.failed
    }
}

impl MigrationRun {
    /// Migrates one project pair: all shared steps, then all test cases.
    ///
    /// Test cases resolve shared-step references through the identity map,
    /// so the shared-step phase must fully drain before the test-case phase
    /// starts. The map is written by phase one and only read afterwards.
    pub async fn run(&self, ctx: &MigrationContext) -> RunSummary {
        let mut mapping = IdentityMap::new();
        let shared_steps = shared_steps::migrate(self, ctx, &mut mapping).await;
        let test_cases = test_cases::migrate(self, ctx, &mapping).await;

        let summary = RunSummary {
            shared_steps,
            test_cases,
        };
        let _ = self.status_tx.send(StatusUpdate::RunComplete {
            shared_steps: summary.shared_steps.clone(),
            test_cases: summary.test_cases.clone(),
        });
        summary
    }
}

/// Builds the destination field set shared by both item kinds.
pub(crate) fn destination_fields(
    users: &UserMap,
    ctx: &MigrationContext,
    item: &SourceItem,
) -> DraftFields {
    DraftFields {
        title: item.title.clone(),
        description: item.description.clone(),
        priority: item.priority,
        iteration_path: ctx.rewrite_path(&item.iteration_path),
        area_path: ctx.rewrite_path(&item.area_path),
        state: item.state.clone(),
        assigned_to: users.resolve(&item.assigned_to).to_string(),
        tags: item.tags.clone(),
        reflected_source_uri: None,
    }
}
