use storekeep_types::{
    AdminError, ProductId, ProductListing, QueryError, StoreRepository, ValidationError,
};
use tracing::{info, instrument, warn};

/// Lists products and deletes the ones no store sells.
#[derive(Debug, Clone)]
pub struct ProductCatalog<R> {
    stores: R,
}

impl<R> ProductCatalog<R> {
    /// Create a catalog over the given relational adapter.
    pub const fn new(stores: R) -> Self {
        Self { stores }
    }
}

impl<R: StoreRepository + Sync> ProductCatalog<R> {
    /// Products joined with the stores that sell them.
    pub async fn list(&self) -> Result<Vec<ProductListing>, AdminError> {
        Ok(self.stores.list_products().await?)
    }

    /// Delete a product that no store sells.
    ///
    /// A product with any `product_store` link is rejected with
    /// [`ValidationError::ProductStillReferenced`] and left in place.
    #[instrument(name = "products.delete", skip(self))]
    pub async fn delete(&self, product_id: &ProductId) -> Result<(), AdminError> {
        let links = self.stores.product_links(product_id).await?;
        if links > 0 {
            warn!(
                links,
                "[products.still_referenced] refusing to delete product sold in stores"
            );
            return Err(ValidationError::ProductStillReferenced(product_id.clone()).into());
        }

        match self.stores.delete_product(product_id).await {
            Ok(true) => {
                info!("[products.deleted] product removed");
                Ok(())
            }
            Ok(false) => Err(ValidationError::ProductNotFound(product_id.clone()).into()),
            Err(QueryError::ConstraintViolation { .. }) => {
                warn!("[products.still_referenced] product linked to a store concurrently");
                Err(ValidationError::ProductStillReferenced(product_id.clone()).into())
            }
            Err(error) => Err(error.into()),
        }
    }
}
