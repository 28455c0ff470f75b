//! Engine error types

use crm_rules_core::CoreError;
use crm_rules_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid stored rule definition: {0}")]
    RuleDefinition(#[from] CoreError),
}
