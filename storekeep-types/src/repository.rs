use crate::domain::{ManagerId, ProductId, ProductListing, Store, StoreId, StoreProposal};
use crate::errors::QueryError;
use std::future::Future;

/// Trait defining the contract for relational store implementations.
///
/// Every operation corresponds to one parameterized query against the
/// `store`, `product` and `product_store` tables. Implementations bind values
/// positionally and never interpolate them into query text. Failures are
/// returned unchanged to the caller; implementations do not retry.
///
/// Implementations include:
/// - `storekeep-postgres`: production PostgreSQL backend
/// - `storekeep-memory`: in-memory backend for testing
///
/// Both must reject a second store holding the same manager with
/// [`QueryError::ConstraintViolation`], and must reject deleting a product
/// that still has store links the same way.
pub trait StoreRepository {
    /// List every store, ordered by id.
    fn list_stores(&self) -> impl Future<Output = Result<Vec<Store>, QueryError>> + Send;

    /// Load one store.
    fn find_store(
        &self,
        store_id: StoreId,
    ) -> impl Future<Output = Result<Option<Store>, QueryError>> + Send;

    /// Ids of stores managed by `manager_id`, ignoring `excluding` if given.
    ///
    /// This is the uniqueness probe behind one-manager-per-store: editing a
    /// store passes its own id so the store never conflicts with itself.
    fn stores_managed_by(
        &self,
        manager_id: &ManagerId,
        excluding: Option<StoreId>,
    ) -> impl Future<Output = Result<Vec<StoreId>, QueryError>> + Send;

    /// Insert a store and return its assigned id.
    fn insert_store(
        &self,
        proposal: &StoreProposal,
    ) -> impl Future<Output = Result<StoreId, QueryError>> + Send;

    /// Overwrite location and manager of an existing store.
    ///
    /// Returns `false` when no store has `store_id`.
    fn update_store(
        &self,
        store_id: StoreId,
        proposal: &StoreProposal,
    ) -> impl Future<Output = Result<bool, QueryError>> + Send;

    /// List products joined with the stores selling them, ordered by product id.
    fn list_products(
        &self,
    ) -> impl Future<Output = Result<Vec<ProductListing>, QueryError>> + Send;

    /// Number of `product_store` rows referencing `product_id`.
    fn product_links(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<usize, QueryError>> + Send;

    /// Delete a product row. Returns `false` when no product has `product_id`.
    fn delete_product(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<bool, QueryError>> + Send;
}

/// Blanket implementation allowing `StoreRepository` to work with references.
impl<T: StoreRepository + Sync> StoreRepository for &T {
    async fn list_stores(&self) -> Result<Vec<Store>, QueryError> {
        (*self).list_stores().await
    }

    async fn find_store(&self, store_id: StoreId) -> Result<Option<Store>, QueryError> {
        (*self).find_store(store_id).await
    }

    async fn stores_managed_by(
        &self,
        manager_id: &ManagerId,
        excluding: Option<StoreId>,
    ) -> Result<Vec<StoreId>, QueryError> {
        (*self).stores_managed_by(manager_id, excluding).await
    }

    async fn insert_store(&self, proposal: &StoreProposal) -> Result<StoreId, QueryError> {
        (*self).insert_store(proposal).await
    }

    async fn update_store(
        &self,
        store_id: StoreId,
        proposal: &StoreProposal,
    ) -> Result<bool, QueryError> {
        (*self).update_store(store_id, proposal).await
    }

    async fn list_products(&self) -> Result<Vec<ProductListing>, QueryError> {
        (*self).list_products().await
    }

    async fn product_links(&self, product_id: &ProductId) -> Result<usize, QueryError> {
        (*self).product_links(product_id).await
    }

    async fn delete_product(&self, product_id: &ProductId) -> Result<bool, QueryError> {
        (*self).delete_product(product_id).await
    }
}
