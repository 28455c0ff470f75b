//! Core domain models for the CRM business rules engine
//!
//! This crate contains the shared data structures used across
//! the engine: BusinessRule, Condition, Action, ProcessingContext,
//! and RuleExecution, plus the interval parser and the rule
//! validation surface.

pub mod error;
pub mod interval;
pub mod models;
pub mod validate;

pub use error::CoreError;
pub use interval::parse_interval_ms;
pub use models::*;
pub use validate::validate_rule;
