//! Condition evaluation against entity snapshots.
//!
//! A rule's conditions are a flat list combined by per-condition
//! logical operators, not a nested expression tree. Field values come
//! from the entity snapshot supplied by the mutation trigger;
//! pre-change values live in the change snapshot under
//! `original_<field>` keys.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use crm_rules_core::{parse_interval_ms, Condition, ConditionOperator, LogicalOperator};
use serde_json::Value;

/// Field snapshot as handed over by the mutation trigger
pub type Snapshot = serde_json::Map<String, Value>;

/// String cast of a snapshot field; missing and JSON null are both None.
pub(crate) fn field_string(snapshot: &Snapshot, field: &str) -> Option<String> {
    match snapshot.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn field_number(snapshot: &Snapshot, field: &str) -> Option<f64> {
    match snapshot.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Ordering of the numeric-cast field value against the condition
/// literal; None when either side fails to parse.
fn numeric_ordering(snapshot: &Snapshot, condition: &Condition) -> Option<Ordering> {
    let actual = field_number(snapshot, &condition.field)?;
    let limit: f64 = condition.value.trim().parse().ok()?;
    actual.partial_cmp(&limit)
}

/// Milliseconds elapsed since the date-valued field; None when the
/// field is missing or not RFC 3339.
fn field_age_ms(snapshot: &Snapshot, field: &str) -> Option<i64> {
    let raw = field_string(snapshot, field)?;
    let when = DateTime::parse_from_rfc3339(&raw).ok()?;
    Some((Utc::now() - when.with_timezone(&Utc)).num_milliseconds())
}

fn case_insensitive(
    snapshot: &Snapshot,
    condition: &Condition,
    test: impl Fn(&str, &str) -> bool,
) -> bool {
    match field_string(snapshot, &condition.field) {
        Some(actual) => test(
            &actual.to_lowercase(),
            &condition.value.to_lowercase(),
        ),
        None => false,
    }
}

fn list_member(snapshot: &Snapshot, condition: &Condition) -> bool {
    match field_string(snapshot, &condition.field) {
        Some(actual) => condition.value.split(',').any(|entry| entry.trim() == actual),
        None => false,
    }
}

/// Evaluate one condition against the entity and change snapshots.
pub fn evaluate_condition(
    condition: &Condition,
    entity: &Snapshot,
    changes: Option<&Snapshot>,
) -> bool {
    let field_value = field_string(entity, &condition.field);
    let expected = condition.value.as_str();

    match condition.operator {
        ConditionOperator::Equals => field_value.as_deref() == Some(expected),
        ConditionOperator::NotEquals => field_value.as_deref() != Some(expected),

        ConditionOperator::GreaterThan => {
            matches!(numeric_ordering(entity, condition), Some(Ordering::Greater))
        }
        ConditionOperator::LessThan => {
            matches!(numeric_ordering(entity, condition), Some(Ordering::Less))
        }
        ConditionOperator::GreaterEqual => matches!(
            numeric_ordering(entity, condition),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        ConditionOperator::LessEqual => matches!(
            numeric_ordering(entity, condition),
            Some(Ordering::Less | Ordering::Equal)
        ),

        ConditionOperator::Contains => {
            case_insensitive(entity, condition, |actual, value| actual.contains(value))
        }
        ConditionOperator::StartsWith => {
            case_insensitive(entity, condition, |actual, value| actual.starts_with(value))
        }
        ConditionOperator::EndsWith => {
            case_insensitive(entity, condition, |actual, value| actual.ends_with(value))
        }

        ConditionOperator::IsNull => {
            matches!(entity.get(&condition.field), None | Some(Value::Null))
        }
        ConditionOperator::IsNotNull => {
            !matches!(entity.get(&condition.field), None | Some(Value::Null))
        }

        ConditionOperator::In => list_member(entity, condition),
        ConditionOperator::NotIn => !list_member(entity, condition),

        ConditionOperator::OlderThan => match field_age_ms(entity, &condition.field) {
            Some(age_ms) => age_ms > parse_interval_ms(expected),
            None => false,
        },
        ConditionOperator::NewerThan => match field_age_ms(entity, &condition.field) {
            Some(age_ms) => age_ms < parse_interval_ms(expected),
            None => false,
        },

        ConditionOperator::ChangedFrom => {
            let Some(changes) = changes else { return false };
            let original = field_string(changes, &format!("original_{}", condition.field));
            original.as_deref() == Some(expected) && field_value.as_deref() != Some(expected)
        }
        ConditionOperator::ChangedTo => {
            let Some(changes) = changes else { return false };
            let original = field_string(changes, &format!("original_{}", condition.field));
            field_value.as_deref() == Some(expected) && original.as_deref() != Some(expected)
        }

        ConditionOperator::Unknown => {
            tracing::warn!(field = %condition.field, "unknown condition operator, treating as false");
            false
        }
    }
}

/// Combine a rule's condition list into one verdict.
///
/// An empty list is an unconditional match. Otherwise two accumulators
/// run over the list in declaration order: AND-tagged conditions fold
/// into an AND accumulator, OR-tagged ones into an OR accumulator. If
/// any OR-tagged condition exists, the OR accumulator alone decides the
/// verdict and the AND accumulator is discarded. Production rules
/// depend on that exact behavior; it is pinned by test and must not be
/// replaced with conventional precedence without a product decision.
pub fn evaluate_conditions(
    conditions: &[Condition],
    entity: &Snapshot,
    changes: Option<&Snapshot>,
) -> bool {
    if conditions.is_empty() {
        return true;
    }

    let mut and_result = true;
    let mut or_result = false;
    let mut has_or = false;

    for condition in conditions {
        let met = evaluate_condition(condition, entity, changes);
        match condition.logical_operator {
            LogicalOperator::Or => {
                has_or = true;
                or_result = or_result || met;
            }
            LogicalOperator::And => {
                and_result = and_result && met;
            }
        }
    }

    if has_or {
        or_result
    } else {
        and_result
    }
}
