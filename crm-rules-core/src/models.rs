//! Core domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Business entity kinds whose changes can trigger rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Deal,
    Lead,
    Task,
    Person,
    Organization,
    Activity,
}

/// What kind of event a rule listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    /// Fires when one of the rule's trigger fields changes value
    FieldChange,
    /// Fires on a named discrete event ("created", "stage_changed", ...)
    EventBased,
}

/// Rule lifecycle status; only ACTIVE rules are ever matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Draft,
    Active,
    Inactive,
}

/// Closed operator set for conditions.
///
/// `Unknown` is the ingestion fallback: operator strings we do not
/// recognize deserialize to it instead of failing the whole rule, and
/// the evaluator treats it as a soft false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    OlderThan,
    NewerThan,
    ChangedFrom,
    ChangedTo,
    #[serde(other)]
    Unknown,
}

/// How a condition combines with the running verdict of its rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// One atomic predicate over an entity snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Field name looked up in the entity snapshot
    pub field: String,
    pub operator: ConditionOperator,
    /// Literal to compare against; numeric/date operators parse it
    #[serde(default)]
    pub value: String,
    #[serde(default, rename = "logicalOperator")]
    pub logical_operator: LogicalOperator,
}

/// Action kinds a rule may perform.
///
/// `SendEmail` exists on the authoring surface (it is validated) but is
/// not dispatched; `Unknown` is the ingestion fallback for types we do
/// not recognize, executed as a logged no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    NotifyUser,
    NotifyOwner,
    CreateTask,
    CreateActivity,
    SendEmail,
    #[serde(other)]
    Unknown,
}

impl ActionType {
    /// Wire-format label, used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::NotifyUser => "NOTIFY_USER",
            ActionType::NotifyOwner => "NOTIFY_OWNER",
            ActionType::CreateTask => "CREATE_TASK",
            ActionType::CreateActivity => "CREATE_ACTIVITY",
            ActionType::SendEmail => "SEND_EMAIL",
            ActionType::Unknown => "UNKNOWN",
        }
    }
}

fn default_priority() -> i32 {
    1
}

/// One side effect to perform when a rule's conditions are satisfied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Target user id; required for NOTIFY_USER
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Trigger discriminator used when matching rules against a change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerFilter {
    /// A field-level diff was supplied with the change
    FieldChange,
    /// A discrete named event occurred
    Event(String),
}

/// A declarative business rule.
///
/// `conditions` and `actions` are held in their stored JSON form and
/// parsed into structured lists at evaluation time, so a malformed rule
/// fails only its own evaluation, never catalog reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRule {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub entity_type: EntityType,
    pub trigger_type: TriggerType,
    /// Discrete event names; relevant only for EVENT_BASED rules
    #[serde(default)]
    pub trigger_events: Vec<String>,
    /// Field names; relevant only for FIELD_CHANGE rules
    #[serde(default)]
    pub trigger_fields: Vec<String>,
    /// Stored JSON array of conditions, evaluated in declaration order
    pub conditions: serde_json::Value,
    /// Stored JSON array of actions, executed in declaration order
    pub actions: serde_json::Value,
    pub status: RuleStatus,
    /// Audit counters, owned exclusively by the storage layer
    #[serde(default)]
    pub execution_count: u64,
    #[serde(default)]
    pub last_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl BusinessRule {
    pub fn new(name: String, entity_type: EntityType, trigger_type: TriggerType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            entity_type,
            trigger_type,
            trigger_events: Vec::new(),
            trigger_fields: Vec::new(),
            conditions: serde_json::Value::Array(Vec::new()),
            actions: serde_json::Value::Array(Vec::new()),
            status: RuleStatus::Active,
            execution_count: 0,
            last_execution: None,
            last_error: None,
        }
    }

    /// Parse the stored JSON conditions into structured form
    pub fn parsed_conditions(&self) -> Result<Vec<Condition>, CoreError> {
        Ok(serde_json::from_value(self.conditions.clone())?)
    }

    /// Parse the stored JSON actions into structured form
    pub fn parsed_actions(&self) -> Result<Vec<Action>, CoreError> {
        Ok(serde_json::from_value(self.actions.clone())?)
    }

    /// Whether this rule is a candidate for the given change event.
    ///
    /// ACTIVE status and entity type must match; a field-level change
    /// selects FIELD_CHANGE rules, a discrete event selects EVENT_BASED
    /// rules whose trigger_events contain the event name.
    pub fn matches(&self, entity_type: EntityType, filter: &TriggerFilter) -> bool {
        if self.status != RuleStatus::Active || self.entity_type != entity_type {
            return false;
        }
        match filter {
            TriggerFilter::FieldChange => self.trigger_type == TriggerType::FieldChange,
            TriggerFilter::Event(event) => {
                self.trigger_type == TriggerType::EventBased
                    && self.trigger_events.iter().any(|e| e == event)
            }
        }
    }
}

/// The unit of work passed into the orchestrator: one entity change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingContext {
    pub entity_type: EntityType,
    pub entity_id: String,
    /// Event name for EVENT_BASED matching ("created", "updated", ...)
    pub trigger_event: String,
    /// Current field snapshot of the entity
    pub entity_data: serde_json::Map<String, serde_json::Value>,
    /// For updates: pre-change values keyed `original_<field>`
    #[serde(default)]
    pub change_data: Option<serde_json::Map<String, serde_json::Value>>,
    /// Preview mode: suppresses persistence of rule stats and errors
    #[serde(default)]
    pub test_mode: bool,
}

impl ProcessingContext {
    /// Trigger discriminator for rule matching
    pub fn trigger_filter(&self) -> TriggerFilter {
        if self.change_data.is_some() {
            TriggerFilter::FieldChange
        } else {
            TriggerFilter::Event(self.trigger_event.clone())
        }
    }
}

/// One audit record of evaluating one rule against one change event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExecution {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub execution_trigger: String,
    pub conditions_met: bool,
    pub notifications_created: u32,
    pub tasks_created: u32,
    pub activities_created: u32,
    pub errors: Vec<String>,
    pub execution_time_ms: u64,
    pub executed_at: DateTime<Utc>,
}

impl RuleExecution {
    pub fn new(
        rule: &BusinessRule,
        context: &ProcessingContext,
        conditions_met: bool,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id: rule.id,
            entity_id: context.entity_id.clone(),
            entity_type: context.entity_type,
            execution_trigger: context.trigger_event.clone(),
            conditions_met,
            notifications_created: 0,
            tasks_created: 0,
            activities_created: 0,
            errors: Vec::new(),
            execution_time_ms,
            executed_at: Utc::now(),
        }
    }
}

/// Per-rule tally of what the dispatcher actually created
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionTotals {
    pub notifications_created: u32,
    pub tasks_created: u32,
    pub activities_created: u32,
    pub errors: Vec<String>,
}

/// Aggregated outcome of one engine invocation across all matched rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub rules_processed: u32,
    pub notifications_created: u32,
    pub tasks_created: u32,
    pub activities_created: u32,
    pub errors: Vec<String>,
}

impl ExecutionResult {
    /// Fold one rule's totals into the batch aggregate
    pub fn absorb(&mut self, totals: ActionTotals) {
        self.notifications_created += totals.notifications_created;
        self.tasks_created += totals.tasks_created;
        self.activities_created += totals.activities_created;
        self.errors.extend(totals.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_operator_deserializes_to_fallback() {
        let cond: Condition =
            serde_json::from_value(json!({"field": "x", "operator": "REGEX_MATCH", "value": "y"}))
                .unwrap();
        assert_eq!(cond.operator, ConditionOperator::Unknown);
        assert_eq!(cond.logical_operator, LogicalOperator::And);
    }

    #[test]
    fn action_defaults() {
        let action: Action = serde_json::from_value(json!({"type": "CREATE_TASK"})).unwrap();
        assert_eq!(action.action_type, ActionType::CreateTask);
        assert_eq!(action.priority, 1);
        assert!(action.target.is_none());
    }

    #[test]
    fn inactive_rule_never_matches() {
        let mut rule = BusinessRule::new(
            "r".to_string(),
            EntityType::Deal,
            TriggerType::FieldChange,
        );
        rule.status = RuleStatus::Inactive;
        assert!(!rule.matches(EntityType::Deal, &TriggerFilter::FieldChange));
        rule.status = RuleStatus::Draft;
        assert!(!rule.matches(EntityType::Deal, &TriggerFilter::FieldChange));
        rule.status = RuleStatus::Active;
        assert!(rule.matches(EntityType::Deal, &TriggerFilter::FieldChange));
    }

    #[test]
    fn event_rule_requires_event_membership() {
        let mut rule =
            BusinessRule::new("r".to_string(), EntityType::Lead, TriggerType::EventBased);
        rule.trigger_events = vec!["created".to_string()];
        assert!(rule.matches(
            EntityType::Lead,
            &TriggerFilter::Event("created".to_string())
        ));
        assert!(!rule.matches(
            EntityType::Lead,
            &TriggerFilter::Event("deleted".to_string())
        ));
        assert!(!rule.matches(EntityType::Lead, &TriggerFilter::FieldChange));
    }

    #[test]
    fn field_change_context_yields_field_change_filter() {
        let ctx = ProcessingContext {
            entity_type: EntityType::Deal,
            entity_id: "d1".to_string(),
            trigger_event: "updated".to_string(),
            entity_data: serde_json::Map::new(),
            change_data: Some(serde_json::Map::new()),
            test_mode: false,
        };
        assert_eq!(ctx.trigger_filter(), TriggerFilter::FieldChange);
    }
}
