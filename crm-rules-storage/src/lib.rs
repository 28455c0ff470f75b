//! Storage layer for the CRM business rules engine
//!
//! Provides the persistence boundary for the rule catalog and the
//! execution audit trail. Ships an in-memory backend for development
//! and testing; production deployments supply their own implementation
//! of the traits against the managed relational backend.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StorageError;
pub use memory::InMemoryStorage;
pub use traits::{ExecutionAudit, RuleCatalog};

/// Unified storage trait
#[async_trait::async_trait]
pub trait Storage: RuleCatalog + ExecutionAudit + Send + Sync {}

#[async_trait::async_trait]
impl<T> Storage for T where T: RuleCatalog + ExecutionAudit + Send + Sync {}
