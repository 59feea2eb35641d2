use crate::domain::{Manager, ManagerId, NewManager};
use crate::errors::QueryError;
use std::future::Future;

/// Filter applied to the manager collection.
///
/// `All` is the empty filter and matches every document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerFilter {
    /// Every manager.
    All,
    /// The manager whose document key is this id.
    ById(ManagerId),
}

/// Trait defining the contract for manager document store implementations.
///
/// The document store has no knowledge of the `store` table, so it cannot
/// enforce that a store's manager exists. That check belongs to the core;
/// this trait only answers lookups and accepts inserts.
///
/// Implementations include:
/// - `storekeep-mongodb`: production MongoDB backend
/// - `storekeep-memory`: in-memory backend for testing
pub trait ManagerDirectory {
    /// Managers matching `filter`.
    fn find_managers(
        &self,
        filter: &ManagerFilter,
    ) -> impl Future<Output = Result<Vec<Manager>, QueryError>> + Send;

    /// Insert a manager document.
    ///
    /// A duplicate key is reported as [`QueryError::ConstraintViolation`].
    fn insert_manager(
        &self,
        manager: &NewManager,
    ) -> impl Future<Output = Result<(), QueryError>> + Send;
}

/// Blanket implementation allowing `ManagerDirectory` to work with references.
impl<T: ManagerDirectory + Sync> ManagerDirectory for &T {
    async fn find_managers(&self, filter: &ManagerFilter) -> Result<Vec<Manager>, QueryError> {
        (*self).find_managers(filter).await
    }

    async fn insert_manager(&self, manager: &NewManager) -> Result<(), QueryError> {
        (*self).insert_manager(manager).await
    }
}
