//! In-memory storage implementation for development and testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_rules_core::{ActionTotals, BusinessRule, EntityType, RuleExecution, TriggerFilter};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::{ExecutionAudit, RuleCatalog, StorageError};

/// In-memory storage for development and testing
pub struct InMemoryStorage {
    rules: RwLock<HashMap<Uuid, BusinessRule>>,
    executions: RwLock<HashMap<Uuid, RuleExecution>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            executions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleCatalog for InMemoryStorage {
    async fn save_rule(&self, rule: BusinessRule) -> Result<BusinessRule, StorageError> {
        let mut rules = self.rules.write().unwrap();
        rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn get_rule(&self, id: Uuid) -> Result<Option<BusinessRule>, StorageError> {
        let rules = self.rules.read().unwrap();
        Ok(rules.get(&id).cloned())
    }

    async fn list_active_rules(
        &self,
        entity_type: EntityType,
        filter: &TriggerFilter,
    ) -> Result<Vec<BusinessRule>, StorageError> {
        let rules = self.rules.read().unwrap();
        Ok(rules
            .values()
            .filter(|r| r.matches(entity_type, filter))
            .cloned()
            .collect())
    }

    async fn increment_execution_count(
        &self,
        rule_id: Uuid,
        executed_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut rules = self.rules.write().unwrap();
        let rule = rules
            .get_mut(&rule_id)
            .ok_or_else(|| StorageError::NotFound(format!("Rule with id {rule_id} not found")))?;
        // In-place under the write lock; the relational backend does
        // this as a single UPDATE ... SET count = count + 1.
        rule.execution_count += 1;
        rule.last_execution = Some(executed_at);
        Ok(())
    }

    async fn record_rule_error(&self, rule_id: Uuid, error: &str) -> Result<(), StorageError> {
        let mut rules = self.rules.write().unwrap();
        let rule = rules
            .get_mut(&rule_id)
            .ok_or_else(|| StorageError::NotFound(format!("Rule with id {rule_id} not found")))?;
        rule.last_error = Some(error.to_string());
        Ok(())
    }
}

#[async_trait]
impl ExecutionAudit for InMemoryStorage {
    async fn record(&self, execution: RuleExecution) -> Result<Uuid, StorageError> {
        let mut executions = self.executions.write().unwrap();
        let id = execution.id;
        executions.insert(id, execution);
        Ok(id)
    }

    async fn update_results(
        &self,
        execution_id: Uuid,
        totals: &ActionTotals,
    ) -> Result<(), StorageError> {
        let mut executions = self.executions.write().unwrap();
        let execution = executions.get_mut(&execution_id).ok_or_else(|| {
            StorageError::NotFound(format!("Execution with id {execution_id} not found"))
        })?;
        execution.notifications_created = totals.notifications_created;
        execution.tasks_created = totals.tasks_created;
        execution.activities_created = totals.activities_created;
        execution.errors = totals.errors.clone();
        Ok(())
    }

    async fn list_for_rule(&self, rule_id: Uuid) -> Result<Vec<RuleExecution>, StorageError> {
        let executions = self.executions.read().unwrap();
        let mut rows: Vec<_> = executions
            .values()
            .filter(|e| e.rule_id == rule_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.executed_at);
        Ok(rows)
    }

    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<RuleExecution>, StorageError> {
        let executions = self.executions.read().unwrap();
        let mut rows: Vec<_> = executions
            .values()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.executed_at);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_rules_core::{ProcessingContext, RuleStatus, TriggerType};
    use serde_json::json;

    fn deal_rule(name: &str) -> BusinessRule {
        let mut rule = BusinessRule::new(
            name.to_string(),
            EntityType::Deal,
            TriggerType::FieldChange,
        );
        rule.conditions = json!([{"field": "amount", "operator": "IS_NOT_NULL"}]);
        rule.actions = json!([{"type": "NOTIFY_OWNER"}]);
        rule
    }

    fn context() -> ProcessingContext {
        ProcessingContext {
            entity_type: EntityType::Deal,
            entity_id: "deal-1".to_string(),
            trigger_event: "updated".to_string(),
            entity_data: serde_json::Map::new(),
            change_data: None,
            test_mode: false,
        }
    }

    #[tokio::test]
    async fn list_active_filters_status_and_entity() {
        let storage = InMemoryStorage::new();

        let active = deal_rule("active");
        let mut draft = deal_rule("draft");
        draft.status = RuleStatus::Draft;
        let mut lead = deal_rule("lead");
        lead.entity_type = EntityType::Lead;

        storage.save_rule(active.clone()).await.unwrap();
        storage.save_rule(draft).await.unwrap();
        storage.save_rule(lead).await.unwrap();

        let matched = storage
            .list_active_rules(EntityType::Deal, &TriggerFilter::FieldChange)
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, active.id);
    }

    #[tokio::test]
    async fn list_active_discriminates_trigger_events() {
        let storage = InMemoryStorage::new();

        let mut rule = deal_rule("on-created");
        rule.trigger_type = TriggerType::EventBased;
        rule.trigger_events = vec!["created".to_string()];
        storage.save_rule(rule.clone()).await.unwrap();

        let created = storage
            .list_active_rules(EntityType::Deal, &TriggerFilter::Event("created".to_string()))
            .await
            .unwrap();
        assert_eq!(created.len(), 1);

        let deleted = storage
            .list_active_rules(EntityType::Deal, &TriggerFilter::Event("deleted".to_string()))
            .await
            .unwrap();
        assert!(deleted.is_empty());

        let field_change = storage
            .list_active_rules(EntityType::Deal, &TriggerFilter::FieldChange)
            .await
            .unwrap();
        assert!(field_change.is_empty());
    }

    #[tokio::test]
    async fn increment_updates_count_and_timestamp() {
        let storage = InMemoryStorage::new();
        let rule = storage.save_rule(deal_rule("counted")).await.unwrap();

        let at = Utc::now();
        storage.increment_execution_count(rule.id, at).await.unwrap();
        storage.increment_execution_count(rule.id, at).await.unwrap();

        let stored = storage.get_rule(rule.id).await.unwrap().unwrap();
        assert_eq!(stored.execution_count, 2);
        assert_eq!(stored.last_execution, Some(at));
    }

    #[tokio::test]
    async fn record_rule_error_sets_last_error() {
        let storage = InMemoryStorage::new();
        let rule = storage.save_rule(deal_rule("failing")).await.unwrap();

        storage.record_rule_error(rule.id, "boom").await.unwrap();
        let stored = storage.get_rule(rule.id).await.unwrap().unwrap();
        assert_eq!(stored.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn record_and_update_execution_row() {
        let storage = InMemoryStorage::new();
        let rule = deal_rule("audited");
        let ctx = context();

        let execution = RuleExecution::new(&rule, &ctx, true, 3);
        let id = storage.record(execution).await.unwrap();

        let totals = ActionTotals {
            notifications_created: 1,
            tasks_created: 2,
            activities_created: 0,
            errors: vec!["one action failed".to_string()],
        };
        storage.update_results(id, &totals).await.unwrap();

        let rows = storage.list_for_rule(rule.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].conditions_met);
        assert_eq!(rows[0].notifications_created, 1);
        assert_eq!(rows[0].tasks_created, 2);
        assert_eq!(rows[0].errors.len(), 1);

        let by_entity = storage.list_for_entity("deal-1").await.unwrap();
        assert_eq!(by_entity.len(), 1);
    }

    #[tokio::test]
    async fn update_results_unknown_id_is_not_found() {
        let storage = InMemoryStorage::new();
        let err = storage
            .update_results(Uuid::new_v4(), &ActionTotals::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
