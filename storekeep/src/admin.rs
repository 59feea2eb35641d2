use crate::{ManagerRegistry, ProductCatalog, StoreEditValidator};
use storekeep_types::{
    AdminError, Manager, ManagerDirectory, NewManager, ProductId, ProductListing, Store,
    StoreId, StoreProposal, StoreRepository,
};

/// Entry point for the presentation layer.
///
/// Built once at startup from explicitly constructed adapters and shared
/// across requests. Adapters are cloned into each component, so they should be
/// cheap handles (a connection pool, a database handle, an `Arc`).
#[derive(Debug, Clone)]
pub struct StoreAdmin<R, D> {
    validator: StoreEditValidator<R, D>,
    managers: ManagerRegistry<D>,
    products: ProductCatalog<R>,
}

impl<R: Clone, D: Clone> StoreAdmin<R, D> {
    /// Wire the core components to the given adapters.
    pub fn new(stores: R, managers: D) -> Self {
        Self {
            validator: StoreEditValidator::new(stores.clone(), managers.clone()),
            managers: ManagerRegistry::new(managers),
            products: ProductCatalog::new(stores),
        }
    }
}

impl<R, D> StoreAdmin<R, D>
where
    R: StoreRepository + Sync,
    D: ManagerDirectory + Sync,
{
    /// Every store, ordered by id.
    pub async fn stores(&self) -> Result<Vec<Store>, AdminError> {
        Ok(self.validator.stores().list_stores().await?)
    }

    /// One store, if it exists.
    pub async fn store(&self, store_id: StoreId) -> Result<Option<Store>, AdminError> {
        Ok(self.validator.stores().find_store(store_id).await?)
    }

    /// See [`StoreEditValidator::add_store`].
    pub async fn add_store(&self, proposal: &StoreProposal) -> Result<StoreId, AdminError> {
        self.validator.add_store(proposal).await
    }

    /// See [`StoreEditValidator::edit_store`].
    pub async fn edit_store(
        &self,
        store_id: StoreId,
        proposal: &StoreProposal,
    ) -> Result<(), AdminError> {
        self.validator.edit_store(store_id, proposal).await
    }

    /// See [`ProductCatalog::list`].
    pub async fn products(&self) -> Result<Vec<ProductListing>, AdminError> {
        self.products.list().await
    }

    /// See [`ProductCatalog::delete`].
    pub async fn delete_product(&self, product_id: &ProductId) -> Result<(), AdminError> {
        self.products.delete(product_id).await
    }

    /// See [`ManagerRegistry::list`].
    pub async fn managers(&self) -> Result<Vec<Manager>, AdminError> {
        self.managers.list().await
    }

    /// See [`ManagerRegistry::register`].
    pub async fn add_manager(&self, manager: &NewManager) -> Result<(), AdminError> {
        self.managers.register(manager).await
    }
}
