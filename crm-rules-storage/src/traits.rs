//! Storage traits defining the interface for persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_rules_core::{ActionTotals, BusinessRule, EntityType, RuleExecution, TriggerFilter};
use uuid::Uuid;

use crate::StorageError;

/// Read side of the rule catalog plus the per-rule stat mutations the
/// engine is allowed to make. Rule authoring (create/update/delete of
/// definitions) lives with the CRUD layer, not here.
#[async_trait]
pub trait RuleCatalog: Send + Sync {
    /// Save a rule definition (seeding and test fixtures)
    async fn save_rule(&self, rule: BusinessRule) -> Result<BusinessRule, StorageError>;

    /// Get a rule by ID
    async fn get_rule(&self, id: Uuid) -> Result<Option<BusinessRule>, StorageError>;

    /// List ACTIVE rules matching an entity type and trigger filter
    async fn list_active_rules(
        &self,
        entity_type: EntityType,
        filter: &TriggerFilter,
    ) -> Result<Vec<BusinessRule>, StorageError>;

    /// Atomically bump a rule's execution counter and stamp the run
    /// time. Must be an in-place increment at the storage layer so
    /// concurrent engine invocations never lose updates.
    async fn increment_execution_count(
        &self,
        rule_id: Uuid,
        executed_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Record the most recent evaluation error for a rule
    async fn record_rule_error(&self, rule_id: Uuid, error: &str) -> Result<(), StorageError>;
}

/// Append-only audit trail of rule evaluations
#[async_trait]
pub trait ExecutionAudit: Send + Sync {
    /// Append one execution row; returns its id
    async fn record(&self, execution: RuleExecution) -> Result<Uuid, StorageError>;

    /// Fill in the created-counts and errors after action dispatch
    async fn update_results(
        &self,
        execution_id: Uuid,
        totals: &ActionTotals,
    ) -> Result<(), StorageError>;

    /// All executions recorded for a rule, oldest first
    async fn list_for_rule(&self, rule_id: Uuid) -> Result<Vec<RuleExecution>, StorageError>;

    /// All executions recorded for an entity, oldest first
    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<RuleExecution>, StorageError>;
}
