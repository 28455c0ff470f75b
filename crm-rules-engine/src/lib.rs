//! Business rules engine for the CRM platform
//!
//! Given an entity change (a deal, lead, task, person, organization,
//! or activity), matches the active rule catalog, evaluates each
//! matched rule's condition list against the entity snapshot, and for
//! satisfied rules dispatches the declared actions while recording an
//! audit trail: match, evaluate, act, record.

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod matcher;

pub use dispatcher::{
    ActionDispatcher, ActionOutcome, ActivityCreator, ActivityRequest, DispatchError,
    NotificationCreator, NotificationRequest, TaskCreator, TaskRequest,
};
pub use engine::RuleEngine;
pub use error::EngineError;
pub use evaluator::{evaluate_condition, evaluate_conditions, Snapshot};
pub use matcher::match_rules;
