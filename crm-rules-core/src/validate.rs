//! Structural validation of rule definitions.
//!
//! Consumed by the rule-authoring collaborator before a rule is saved;
//! the evaluation path never calls this. Problems are returned as
//! human-readable strings, never raised as errors.

use crate::models::{ActionType, BusinessRule, ConditionOperator, TriggerType};

/// Validate a candidate rule definition.
///
/// Returns an ordered list of validation problems; empty means the
/// definition is structurally sound.
pub fn validate_rule(rule: &BusinessRule) -> Vec<String> {
    let mut errors = Vec::new();

    if rule.name.trim().is_empty() {
        errors.push("Rule name is required".to_string());
    }

    let conditions = match rule.parsed_conditions() {
        Ok(conditions) => conditions,
        Err(e) => {
            errors.push(format!("Conditions are not a valid condition list: {e}"));
            Vec::new()
        }
    };
    let actions = match rule.parsed_actions() {
        Ok(actions) => actions,
        Err(e) => {
            errors.push(format!("Actions are not a valid action list: {e}"));
            Vec::new()
        }
    };

    if rule.conditions.as_array().map_or(true, |a| a.is_empty()) {
        errors.push("At least one condition is required".to_string());
    }
    if rule.actions.as_array().map_or(true, |a| a.is_empty()) {
        errors.push("At least one action is required".to_string());
    }

    match rule.trigger_type {
        TriggerType::EventBased => {
            if rule.trigger_events.is_empty() {
                errors.push("Event-based rules require at least one trigger event".to_string());
            }
        }
        TriggerType::FieldChange => {
            let has_condition_field = conditions.iter().any(|c| !c.field.trim().is_empty());
            if rule.trigger_fields.is_empty() && !has_condition_field {
                errors.push(
                    "Field-change rules require trigger fields or a condition with a field"
                        .to_string(),
                );
            }
        }
    }

    for (i, condition) in conditions.iter().enumerate() {
        let n = i + 1;
        if condition.field.trim().is_empty() {
            errors.push(format!("Condition {n}: field is required"));
        }
        if condition.operator == ConditionOperator::Unknown {
            errors.push(format!("Condition {n}: unknown operator"));
        }
        let value_optional = matches!(
            condition.operator,
            ConditionOperator::IsNull | ConditionOperator::IsNotNull
        );
        if !value_optional && condition.value.trim().is_empty() {
            errors.push(format!("Condition {n}: value is required"));
        }
    }

    for (i, action) in actions.iter().enumerate() {
        let n = i + 1;
        let needs_target = matches!(
            action.action_type,
            ActionType::NotifyUser | ActionType::SendEmail
        );
        if needs_target && action.target.as_deref().map_or(true, |t| t.trim().is_empty()) {
            errors.push(format!("Action {n}: target is required"));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;
    use serde_json::json;

    fn base_rule() -> BusinessRule {
        let mut rule = BusinessRule::new(
            "High value deal".to_string(),
            EntityType::Deal,
            TriggerType::FieldChange,
        );
        rule.trigger_fields = vec!["amount".to_string()];
        rule.conditions = json!([
            {"field": "amount", "operator": "GREATER_THAN", "value": "10000"}
        ]);
        rule.actions = json!([{"type": "NOTIFY_OWNER"}]);
        rule
    }

    #[test]
    fn valid_rule_has_no_errors() {
        assert!(validate_rule(&base_rule()).is_empty());
    }

    #[test]
    fn missing_name_conditions_actions() {
        let mut rule = base_rule();
        rule.name = "  ".to_string();
        rule.conditions = json!([]);
        rule.actions = json!([]);
        let errors = validate_rule(&rule);
        assert!(errors.iter().any(|e| e.contains("name is required")));
        assert!(errors.iter().any(|e| e.contains("one condition")));
        assert!(errors.iter().any(|e| e.contains("one action")));
    }

    #[test]
    fn event_based_requires_trigger_events() {
        let mut rule = base_rule();
        rule.trigger_type = TriggerType::EventBased;
        rule.trigger_events = Vec::new();
        let errors = validate_rule(&rule);
        assert!(errors.iter().any(|e| e.contains("trigger event")));
    }

    #[test]
    fn field_change_accepts_condition_field_in_lieu_of_trigger_fields() {
        let mut rule = base_rule();
        rule.trigger_fields = Vec::new();
        assert!(validate_rule(&rule).is_empty());
    }

    #[test]
    fn null_operators_do_not_require_value() {
        let mut rule = base_rule();
        rule.conditions = json!([{"field": "owner", "operator": "IS_NULL", "value": ""}]);
        assert!(validate_rule(&rule).is_empty());

        rule.conditions = json!([{"field": "owner", "operator": "EQUALS", "value": ""}]);
        let errors = validate_rule(&rule);
        assert!(errors.iter().any(|e| e.contains("value is required")));
    }

    #[test]
    fn notify_user_and_send_email_require_target() {
        let mut rule = base_rule();
        rule.actions = json!([
            {"type": "NOTIFY_USER"},
            {"type": "SEND_EMAIL", "target": ""}
        ]);
        let errors = validate_rule(&rule);
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.contains("target is required"))
                .count(),
            2
        );
    }
}
