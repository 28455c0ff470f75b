//! Rule matching: narrow the catalog to candidates for one change event

use crm_rules_core::{BusinessRule, ProcessingContext};
use crm_rules_storage::{RuleCatalog, StorageError};

/// Select the active rules that are candidates for this change event.
///
/// A change carrying a field-level diff selects FIELD_CHANGE rules for
/// the entity type; otherwise EVENT_BASED rules whose trigger events
/// contain the context's event name. Read-only; callers must not
/// depend on any ordering between the returned rules.
pub async fn match_rules(
    catalog: &dyn RuleCatalog,
    context: &ProcessingContext,
) -> Result<Vec<BusinessRule>, StorageError> {
    let filter = context.trigger_filter();
    let rules = catalog
        .list_active_rules(context.entity_type, &filter)
        .await?;
    tracing::debug!(
        entity_id = %context.entity_id,
        candidates = rules.len(),
        "matched candidate rules"
    );
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_rules_core::{EntityType, TriggerType};
    use crm_rules_storage::InMemoryStorage;
    use serde_json::json;

    fn context(change_data: bool, event: &str) -> ProcessingContext {
        ProcessingContext {
            entity_type: EntityType::Deal,
            entity_id: "deal-1".to_string(),
            trigger_event: event.to_string(),
            entity_data: serde_json::Map::new(),
            change_data: change_data.then(serde_json::Map::new),
            test_mode: false,
        }
    }

    #[tokio::test]
    async fn diff_presence_selects_field_change_rules() {
        let storage = InMemoryStorage::new();

        let mut field_rule = BusinessRule::new(
            "on amount".to_string(),
            EntityType::Deal,
            TriggerType::FieldChange,
        );
        field_rule.conditions = json!([]);
        field_rule.actions = json!([{"type": "NOTIFY_OWNER"}]);
        storage.save_rule(field_rule.clone()).await.unwrap();

        let mut event_rule = BusinessRule::new(
            "on created".to_string(),
            EntityType::Deal,
            TriggerType::EventBased,
        );
        event_rule.trigger_events = vec!["created".to_string()];
        storage.save_rule(event_rule.clone()).await.unwrap();

        let with_diff = match_rules(&storage, &context(true, "updated")).await.unwrap();
        assert_eq!(with_diff.len(), 1);
        assert_eq!(with_diff[0].id, field_rule.id);

        let on_event = match_rules(&storage, &context(false, "created")).await.unwrap();
        assert_eq!(on_event.len(), 1);
        assert_eq!(on_event[0].id, event_rule.id);

        let other_event = match_rules(&storage, &context(false, "deleted")).await.unwrap();
        assert!(other_event.is_empty());
    }
}
