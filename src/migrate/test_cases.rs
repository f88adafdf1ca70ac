use std::time::Instant;

use anyhow::{Context, Result};

use super::report::MigrationReport;
use super::{destination_fields, MigrationContext, MigrationRun, StatusUpdate};
use crate::journal::new_event;
use crate::mapping::IdentityMap;
use crate::model::item::{Action, SourceItem, StepRecord, WorkItemKind};

const KIND: WorkItemKind = WorkItemKind::TestCase;

/// Migrates every test case of the source project. Must only run once the
/// shared-step phase has fully drained: the identity map is read-only here.
pub async fn migrate(
    run: &MigrationRun,
    ctx: &MigrationContext,
    mapping: &IdentityMap,
) -> MigrationReport {
    let started = Instant::now();
    let mut report = MigrationReport::default();

    let items = match run.source.query_items(&ctx.source_project, KIND).await {
        Ok(items) => items,
        Err(e) => {
            let _ = run.journal.append(&new_event(
                KIND,
                "query_failed",
                None,
                None,
                Some(&format!("{e:#}")),
            ));
            report.elapsed = started.elapsed();
            let _ = run.status_tx.send(StatusUpdate::PhaseComplete {
                kind: KIND,
                report: report.clone(),
            });
            return report;
        }
    };

    for item in &items {
        if run.cancel.is_cancelled() {
            break;
        }
        report.attempted += 1;

        match migrate_one(run, ctx, mapping, item).await {
            Ok(_destination_id) => {
                let _ = run.journal.append(&new_event(
                    KIND,
                    "migrated",
                    Some(item.id),
                    Some(&item.title),
                    None,
                ));
            }
            Err(e) => {
                report.failed += 1;
                let _ = run.journal.append(&new_event(
                    KIND,
                    "item_failed",
                    Some(item.id),
                    Some(&item.title),
                    Some(&format!("{e:#}")),
                ));
            }
        }

        let _ = run.status_tx.send(StatusUpdate::Progress {
            kind: KIND,
            processed: report.attempted,
            failed: report.failed,
        });
    }

    report.elapsed = started.elapsed();
    let _ = run.journal.append(&new_event(
        KIND,
        "phase_complete",
        None,
        None,
        Some(&format!(
            "migrated {} of {} in {:.1}s",
            report.succeeded(),
            report.attempted,
            report.elapsed.as_secs_f64()
        )),
    ));
    let _ = run.status_tx.send(StatusUpdate::PhaseComplete {
        kind: KIND,
        report: report.clone(),
    });
    report
}

async fn migrate_one(
    run: &MigrationRun,
    ctx: &MigrationContext,
    mapping: &IdentityMap,
    item: &SourceItem,
) -> Result<i64> {
    let mut draft = run.destination.create_item(KIND).await?;
    let mut fields = destination_fields(&run.users, ctx, item);
    fields.reflected_source_uri = Some(ctx.reflected_uri(item.id));
    *draft.fields_mut() = fields;
    let destination_id = draft
        .save()
        .await
        .with_context(|| format!("saving test case {}", item.id))?;

    let mut editable = run.destination.fetch_item(KIND, destination_id).await?;
    for action in &item.actions {
        match action {
            Action::Step(step) => editable.append_step(step.clone()),
            Action::SharedStepReference { shared_step_id } => {
                match mapping.get(*shared_step_id) {
                    Some(mapped_id) => editable.append_shared_step_reference(mapped_id),
                    None => {
                        // The referenced shared step never made it across.
                        // Substitute a visible placeholder at the same
                        // position rather than dropping the action or
                        // failing the test case.
                        editable.append_step(placeholder_step(*shared_step_id));
                        let _ = run.journal.append(&new_event(
                            KIND,
                            "placeholder",
                            Some(item.id),
                            Some(&item.title),
                            Some(&format!("unresolved shared step {shared_step_id}")),
                        ));
                    }
                }
            }
            Action::Unknown => {}
        }
    }
    editable
        .save()
        .await
        .with_context(|| format!("saving actions of test case {}", item.id))?;

    Ok(destination_id)
}

pub(crate) fn placeholder_step(source_shared_step_id: i64) -> StepRecord {
    StepRecord {
        title: format!("PLACEHOLDER: Shared Step (original ID:{source_shared_step_id})"),
        expected_result: String::new(),
    }
}
