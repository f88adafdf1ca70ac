use thiserror::Error;

use crate::model::item::WorkItemKind;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("identity mapping already recorded for source id {0}")]
    DuplicateMapping(i64),

    #[error("destination rejected save: {0}")]
    Save(String),

    #[error("no {kind} with id {id} in destination")]
    NotFound { kind: WorkItemKind, id: i64 },
}
