use std::time::Instant;

use anyhow::{Context, Result};

use super::report::MigrationReport;
use super::{destination_fields, MigrationContext, MigrationRun, StatusUpdate};
use crate::journal::new_event;
use crate::mapping::IdentityMap;
use crate::model::item::{Action, SourceItem, WorkItemKind};

const KIND: WorkItemKind = WorkItemKind::SharedStep;

/// Migrates every shared step of the source project, recording each assigned
/// destination id in the identity map. Failures are isolated per item; a
/// failed item gets no map entry and the run moves on.
pub async fn migrate(
    run: &MigrationRun,
    ctx: &MigrationContext,
    mapping: &mut IdentityMap,
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

        match migrate_one(run, ctx, item).await {
            Ok(destination_id) => match mapping.put(item.id, destination_id) {
                Ok(()) => {
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
                        Some(&e.to_string()),
                    ));
                }
            },
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
    item: &SourceItem,
) -> Result<i64> {
    let mut draft = run.destination.create_item(KIND).await?;
    *draft.fields_mut() = destination_fields(&run.users, ctx, item);
    let destination_id = draft
        .save()
        .await
        .with_context(|| format!("saving shared step {}", item.id))?;

    // Creation hands back no step-editable handle; re-fetch by id.
    let mut editable = run.destination.fetch_item(KIND, destination_id).await?;
    for action in &item.actions {
        if let Action::Step(step) = action {
            editable.append_step(step.clone());
        }
    }
    editable
        .save()
        .await
        .with_context(|| format!("saving steps of shared step {}", item.id))?;

    Ok(destination_id)
}
