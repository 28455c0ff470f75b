//! Action dispatch against the external side-effect collaborators.
//!
//! The engine never creates notifications, tasks, or activities itself;
//! it hands structured requests to collaborators owned by the CRUD
//! layer. Each action in a rule's list runs independently: one failing
//! action must not stop the ones after it.

use std::sync::Arc;

use async_trait::async_trait;
use crm_rules_core::{
    Action, ActionTotals, ActionType, BusinessRule, EntityType, ProcessingContext,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::evaluator::{field_string, Snapshot};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("NOTIFY_USER action has no target user")]
    MissingTarget,

    #[error("entity has no owner field to notify")]
    MissingOwner,

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

/// Request handed to the notification collaborator
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRequest {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub user_id: String,
    pub title: String,
    pub message: Option<String>,
    pub priority: i32,
    pub metadata: serde_json::Map<String, Value>,
}

/// Request handed to the task collaborator
#[derive(Debug, Clone, Serialize)]
pub struct TaskRequest {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub assignee: Option<String>,
    pub subject: String,
    pub notes: Option<String>,
    pub priority: i32,
    pub metadata: serde_json::Map<String, Value>,
}

/// Request handed to the activity collaborator
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRequest {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub subject: String,
    pub notes: Option<String>,
    pub metadata: serde_json::Map<String, Value>,
}

#[async_trait]
pub trait NotificationCreator: Send + Sync {
    async fn create_notification(&self, request: NotificationRequest) -> anyhow::Result<()>;
}

#[async_trait]
pub trait TaskCreator: Send + Sync {
    async fn create_task(&self, request: TaskRequest) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ActivityCreator: Send + Sync {
    async fn create_activity(&self, request: ActivityRequest) -> anyhow::Result<()>;
}

/// Outcome of one action: whether anything was created, plus what
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub created: bool,
    pub data: Option<Value>,
}

impl ActionOutcome {
    fn skipped() -> Self {
        Self {
            created: false,
            data: None,
        }
    }
}

/// Owner resolution order for NOTIFY_OWNER actions
const OWNER_FIELDS: [&str; 3] = ["assigned_to_user_id", "user_id", "created_by_user_id"];

/// Display-name resolution order for notification titles
const DISPLAY_FIELDS: [&str; 3] = ["name", "title", "contact_name"];

fn notification_title(action: &Action, entity: &Snapshot) -> String {
    let template = action
        .template
        .as_deref()
        .unwrap_or("Business Rule Notification");
    let display = DISPLAY_FIELDS
        .iter()
        .find_map(|field| field_string(entity, field))
        .unwrap_or_else(|| "Entity".to_string());
    format!("{template} - {display}")
}

/// Executes a rule's actions against the side-effect collaborators.
pub struct ActionDispatcher {
    notifications: Arc<dyn NotificationCreator>,
    tasks: Arc<dyn TaskCreator>,
    activities: Arc<dyn ActivityCreator>,
}

impl ActionDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationCreator>,
        tasks: Arc<dyn TaskCreator>,
        activities: Arc<dyn ActivityCreator>,
    ) -> Self {
        Self {
            notifications,
            tasks,
            activities,
        }
    }

    /// Execute one action for a satisfied rule.
    pub async fn execute(
        &self,
        action: &Action,
        rule: &BusinessRule,
        context: &ProcessingContext,
    ) -> Result<ActionOutcome, DispatchError> {
        match action.action_type {
            ActionType::NotifyUser => {
                let target = action
                    .target
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(DispatchError::MissingTarget)?;
                self.notify(target.to_string(), action, context).await
            }
            ActionType::NotifyOwner => {
                let owner = OWNER_FIELDS
                    .iter()
                    .find_map(|field| field_string(&context.entity_data, field))
                    .ok_or(DispatchError::MissingOwner)?;
                self.notify(owner, action, context).await
            }
            ActionType::CreateTask => {
                let request = TaskRequest {
                    entity_type: context.entity_type,
                    entity_id: context.entity_id.clone(),
                    assignee: action.target.clone(),
                    subject: action.template.clone().unwrap_or_else(|| rule.name.clone()),
                    notes: action.message.clone(),
                    priority: action.priority,
                    metadata: action.metadata.clone(),
                };
                self.tasks.create_task(request).await?;
                Ok(ActionOutcome {
                    created: true,
                    data: None,
                })
            }
            ActionType::CreateActivity => {
                let request = ActivityRequest {
                    entity_type: context.entity_type,
                    entity_id: context.entity_id.clone(),
                    subject: action.template.clone().unwrap_or_else(|| rule.name.clone()),
                    notes: action.message.clone(),
                    metadata: action.metadata.clone(),
                };
                self.activities.create_activity(request).await?;
                Ok(ActionOutcome {
                    created: true,
                    data: None,
                })
            }
            ActionType::SendEmail | ActionType::Unknown => {
                tracing::warn!(
                    action_type = action.action_type.as_str(),
                    rule = %rule.name,
                    "unsupported action type, skipping"
                );
                Ok(ActionOutcome::skipped())
            }
        }
    }

    /// Run a rule's action list in declaration order, tallying what was
    /// created. Each action's error is caught here so the rest of the
    /// list still runs.
    pub async fn run_actions(
        &self,
        actions: &[Action],
        rule: &BusinessRule,
        context: &ProcessingContext,
    ) -> ActionTotals {
        let mut totals = ActionTotals::default();
        for action in actions {
            match self.execute(action, rule, context).await {
                Ok(outcome) if outcome.created => match action.action_type {
                    ActionType::NotifyUser | ActionType::NotifyOwner => {
                        totals.notifications_created += 1;
                    }
                    ActionType::CreateTask => totals.tasks_created += 1,
                    ActionType::CreateActivity => totals.activities_created += 1,
                    _ => {}
                },
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        action_type = action.action_type.as_str(),
                        rule = %rule.name,
                        error = %e,
                        "action failed"
                    );
                    totals
                        .errors
                        .push(format!("{} action failed: {e}", action.action_type.as_str()));
                }
            }
        }
        totals
    }

    async fn notify(
        &self,
        user_id: String,
        action: &Action,
        context: &ProcessingContext,
    ) -> Result<ActionOutcome, DispatchError> {
        let title = notification_title(action, &context.entity_data);
        let request = NotificationRequest {
            entity_type: context.entity_type,
            entity_id: context.entity_id.clone(),
            user_id: user_id.clone(),
            title: title.clone(),
            message: action.message.clone(),
            priority: action.priority,
            metadata: action.metadata.clone(),
        };
        self.notifications.create_notification(request).await?;
        Ok(ActionOutcome {
            created: true,
            data: Some(serde_json::json!({ "user_id": user_id, "title": title })),
        })
    }
}
