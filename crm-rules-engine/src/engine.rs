//! Top-level orchestration: match, evaluate, act, record.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use crm_rules_core::{
    ActionTotals, BusinessRule, ExecutionResult, ProcessingContext, RuleExecution,
};
use crm_rules_storage::{ExecutionAudit, RuleCatalog};

use crate::dispatcher::ActionDispatcher;
use crate::error::EngineError;
use crate::evaluator::evaluate_conditions;
use crate::matcher::match_rules;

/// The rule execution orchestrator.
///
/// One instance serves the whole process; invocations are independent
/// and share no mutable state beyond the storage-side rule counters.
pub struct RuleEngine {
    catalog: Arc<dyn RuleCatalog>,
    audit: Arc<dyn ExecutionAudit>,
    dispatcher: ActionDispatcher,
}

impl RuleEngine {
    pub fn new(
        catalog: Arc<dyn RuleCatalog>,
        audit: Arc<dyn ExecutionAudit>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            catalog,
            audit,
            dispatcher,
        }
    }

    /// Process one entity change against the active rule catalog.
    ///
    /// Rules run sequentially; a failure in one rule is converted to a
    /// batch error string (and, outside test mode, the rule's
    /// `last_error`) and never aborts the rest. Only catalog-level
    /// failures surface as `Err`.
    pub async fn process_entity_change(
        &self,
        context: &ProcessingContext,
    ) -> Result<ExecutionResult, EngineError> {
        let rules = match_rules(self.catalog.as_ref(), context).await?;

        let mut result = ExecutionResult::default();
        for rule in &rules {
            result.rules_processed += 1;

            match self.process_rule(rule, context).await {
                Ok(totals) => result.absorb(totals),
                Err(e) => {
                    let message = format!("Rule {}: {e}", rule.name);
                    tracing::warn!(rule_id = %rule.id, error = %e, "rule execution failed");
                    if !context.test_mode {
                        if let Err(store_err) =
                            self.catalog.record_rule_error(rule.id, &message).await
                        {
                            tracing::warn!(rule_id = %rule.id, error = %store_err, "failed to persist rule error");
                        }
                    }
                    result.errors.push(message);
                }
            }

            if !context.test_mode {
                if let Err(e) = self
                    .catalog
                    .increment_execution_count(rule.id, Utc::now())
                    .await
                {
                    tracing::warn!(rule_id = %rule.id, error = %e, "failed to update rule stats");
                }
            }
        }

        tracing::info!(
            entity_id = %context.entity_id,
            rules_processed = result.rules_processed,
            notifications = result.notifications_created,
            tasks = result.tasks_created,
            activities = result.activities_created,
            errors = result.errors.len(),
            "entity change processed"
        );
        Ok(result)
    }

    /// Evaluate one rule and, if satisfied, run its actions.
    ///
    /// An audit row is recorded for every evaluated rule, matched or
    /// not, and updated with the actual created counts after dispatch.
    async fn process_rule(
        &self,
        rule: &BusinessRule,
        context: &ProcessingContext,
    ) -> Result<ActionTotals, EngineError> {
        let started = Instant::now();
        let conditions = rule.parsed_conditions()?;
        let actions = rule.parsed_actions()?;

        let conditions_met = evaluate_conditions(
            &conditions,
            &context.entity_data,
            context.change_data.as_ref(),
        );
        let execution_time_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(rule_id = %rule.id, conditions_met, "rule evaluated");

        let execution_id = self
            .audit
            .record(RuleExecution::new(rule, context, conditions_met, execution_time_ms))
            .await?;

        if !conditions_met {
            return Ok(ActionTotals::default());
        }

        let totals = self.dispatcher.run_actions(&actions, rule, context).await;
        self.audit.update_results(execution_id, &totals).await?;
        Ok(totals)
    }
}
