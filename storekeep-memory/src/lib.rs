//! In-memory adapters for Storekeep
//!
//! This crate provides in-memory implementations of the `StoreRepository` and
//! `ManagerDirectory` traits from `storekeep-types`, useful for testing and
//! development scenarios where no database is available.
//!
//! Both adapters reproduce the constraint behavior of the production schema:
//! a manager can be stored against at most one store, a product with store
//! links cannot be deleted, and manager ids are unique. Violations surface as
//! [`QueryError::ConstraintViolation`], exactly as the real backends report
//! them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use storekeep_types::{
    Manager, ManagerDirectory, ManagerFilter, ManagerId, NewManager, Operation, ProductId,
    ProductListing, QueryError, Store, StoreId, StoreProposal, StoreRepository,
};
use tracing::debug;

/// Constraint name reported when two stores claim the same manager.
pub const STORE_MANAGER_CONSTRAINT: &str = "store_mgrid_key";

/// Constraint name reported when a linked product is deleted.
pub const PRODUCT_LINK_CONSTRAINT: &str = "product_store_pid_fkey";

/// Constraint name reported for a duplicate manager id.
pub const MANAGER_KEY_CONSTRAINT: &str = "_id_";

#[derive(Debug)]
struct StoreRow {
    location: String,
    manager_id: Option<ManagerId>,
}

#[derive(Debug)]
struct ProductRow {
    product_id: ProductId,
    description: String,
}

#[derive(Debug)]
struct LinkRow {
    product_id: ProductId,
    store_id: StoreId,
    price: f64,
}

#[derive(Debug, Default)]
struct Tables {
    stores: BTreeMap<StoreId, StoreRow>,
    // Keyed by the raw product id so listings come out ordered by pid.
    products: BTreeMap<String, ProductRow>,
    links: Vec<LinkRow>,
    last_store_id: i32,
    unavailable: bool,
}

impl Tables {
    fn manager_holder(&self, manager_id: &ManagerId, excluding: Option<StoreId>) -> Vec<StoreId> {
        self.stores
            .iter()
            .filter(|(store_id, row)| {
                Some(**store_id) != excluding && row.manager_id.as_ref() == Some(manager_id)
            })
            .map(|(store_id, _)| *store_id)
            .collect()
    }

    fn check_manager_free(
        &self,
        operation: Operation,
        proposal: &StoreProposal,
        target: Option<StoreId>,
    ) -> Result<(), QueryError> {
        match &proposal.manager_id {
            Some(manager_id) if !self.manager_holder(manager_id, target).is_empty() => {
                Err(QueryError::ConstraintViolation {
                    operation,
                    constraint: STORE_MANAGER_CONSTRAINT.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn to_store(store_id: StoreId, row: &StoreRow) -> Store {
        Store {
            id: store_id,
            location: row.location.clone(),
            manager_id: row.manager_id.clone(),
        }
    }
}

/// Thread-safe in-memory relational store for testing.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoreRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStoreRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a store row directly, bypassing every check.
    pub fn seed_store(
        &self,
        location: impl Into<String>,
        manager_id: Option<ManagerId>,
    ) -> StoreId {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.last_store_id += 1;
        let store_id = StoreId::new(tables.last_store_id);
        let _ = tables.stores.insert(
            store_id,
            StoreRow {
                location: location.into(),
                manager_id,
            },
        );
        store_id
    }

    /// Insert a product row.
    pub fn seed_product(&self, product_id: ProductId, description: impl Into<String>) {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = tables.products.insert(
            product_id.as_ref().to_string(),
            ProductRow {
                product_id,
                description: description.into(),
            },
        );
    }

    /// Record that `store_id` sells `product_id` at `price`.
    pub fn seed_link(&self, product_id: ProductId, store_id: StoreId, price: f64) {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.links.push(LinkRow {
            product_id,
            store_id,
            price,
        });
    }

    /// Make every subsequent operation fail with [`QueryError::StoreFailure`],
    /// or restore normal service.
    pub fn set_unavailable(&self, unavailable: bool) {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.unavailable = unavailable;
    }

    fn with_tables<T>(
        &self,
        operation: Operation,
        f: impl FnOnce(&mut Tables) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| QueryError::StoreFailure { operation })?;
        if tables.unavailable {
            return Err(QueryError::StoreFailure { operation });
        }
        debug!(operation = %operation, "[memory.store] executing");
        f(&mut tables)
    }
}

impl StoreRepository for InMemoryStoreRepository {
    async fn list_stores(&self) -> Result<Vec<Store>, QueryError> {
        self.with_tables(Operation::ListStores, |tables| {
            Ok(tables
                .stores
                .iter()
                .map(|(store_id, row)| Tables::to_store(*store_id, row))
                .collect())
        })
    }

    async fn find_store(&self, store_id: StoreId) -> Result<Option<Store>, QueryError> {
        self.with_tables(Operation::FindStore, |tables| {
            Ok(tables
                .stores
                .get(&store_id)
                .map(|row| Tables::to_store(store_id, row)))
        })
    }

    async fn stores_managed_by(
        &self,
        manager_id: &ManagerId,
        excluding: Option<StoreId>,
    ) -> Result<Vec<StoreId>, QueryError> {
        self.with_tables(Operation::FindAssignedStores, |tables| {
            Ok(tables.manager_holder(manager_id, excluding))
        })
    }

    async fn insert_store(&self, proposal: &StoreProposal) -> Result<StoreId, QueryError> {
        self.with_tables(Operation::InsertStore, |tables| {
            tables.check_manager_free(Operation::InsertStore, proposal, None)?;
            tables.last_store_id += 1;
            let store_id = StoreId::new(tables.last_store_id);
            let _ = tables.stores.insert(
                store_id,
                StoreRow {
                    location: proposal.location.as_ref().to_string(),
                    manager_id: proposal.manager_id.clone(),
                },
            );
            Ok(store_id)
        })
    }

    async fn update_store(
        &self,
        store_id: StoreId,
        proposal: &StoreProposal,
    ) -> Result<bool, QueryError> {
        self.with_tables(Operation::UpdateStore, |tables| {
            if !tables.stores.contains_key(&store_id) {
                return Ok(false);
            }
            tables.check_manager_free(Operation::UpdateStore, proposal, Some(store_id))?;
            let _ = tables.stores.insert(
                store_id,
                StoreRow {
                    location: proposal.location.as_ref().to_string(),
                    manager_id: proposal.manager_id.clone(),
                },
            );
            Ok(true)
        })
    }

    async fn list_products(&self) -> Result<Vec<ProductListing>, QueryError> {
        self.with_tables(Operation::ListProducts, |tables| {
            let mut listings = Vec::new();
            for product in tables.products.values() {
                let mut sold = false;
                for link in tables
                    .links
                    .iter()
                    .filter(|link| link.product_id == product.product_id)
                {
                    sold = true;
                    listings.push(ProductListing {
                        product_id: product.product_id.clone(),
                        description: product.description.clone(),
                        store_id: Some(link.store_id),
                        location: tables
                            .stores
                            .get(&link.store_id)
                            .map(|row| row.location.clone()),
                        price: Some(link.price),
                    });
                }
                if !sold {
                    listings.push(ProductListing {
                        product_id: product.product_id.clone(),
                        description: product.description.clone(),
                        store_id: None,
                        location: None,
                        price: None,
                    });
                }
            }
            Ok(listings)
        })
    }

    async fn product_links(&self, product_id: &ProductId) -> Result<usize, QueryError> {
        self.with_tables(Operation::CountProductLinks, |tables| {
            Ok(tables
                .links
                .iter()
                .filter(|link| &link.product_id == product_id)
                .count())
        })
    }

    async fn delete_product(&self, product_id: &ProductId) -> Result<bool, QueryError> {
        self.with_tables(Operation::DeleteProduct, |tables| {
            if tables
                .links
                .iter()
                .any(|link| &link.product_id == product_id)
            {
                return Err(QueryError::ConstraintViolation {
                    operation: Operation::DeleteProduct,
                    constraint: PRODUCT_LINK_CONSTRAINT.to_string(),
                });
            }
            Ok(tables.products.remove(product_id.as_ref()).is_some())
        })
    }
}

#[derive(Debug, Default)]
struct Collection {
    managers: BTreeMap<ManagerId, Manager>,
    unavailable: bool,
}

/// Thread-safe in-memory manager collection for testing.
///
/// Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryManagerDirectory {
    collection: Arc<Mutex<Collection>>,
}

impl InMemoryManagerDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a manager document directly, replacing any with the same id.
    pub fn seed_manager(&self, manager: Manager) {
        let mut collection = self
            .collection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _ = collection.managers.insert(manager.id.clone(), manager);
    }

    /// Make every subsequent operation fail with [`QueryError::StoreFailure`],
    /// or restore normal service.
    pub fn set_unavailable(&self, unavailable: bool) {
        let mut collection = self
            .collection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        collection.unavailable = unavailable;
    }

    fn with_collection<T>(
        &self,
        operation: Operation,
        f: impl FnOnce(&mut Collection) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        let mut collection = self
            .collection
            .lock()
            .map_err(|_| QueryError::StoreFailure { operation })?;
        if collection.unavailable {
            return Err(QueryError::StoreFailure { operation });
        }
        debug!(operation = %operation, "[memory.directory] executing");
        f(&mut collection)
    }
}

impl ManagerDirectory for InMemoryManagerDirectory {
    async fn find_managers(&self, filter: &ManagerFilter) -> Result<Vec<Manager>, QueryError> {
        self.with_collection(Operation::FindManagers, |collection| {
            Ok(match filter {
                ManagerFilter::All => collection.managers.values().cloned().collect(),
                ManagerFilter::ById(manager_id) => collection
                    .managers
                    .get(manager_id)
                    .cloned()
                    .into_iter()
                    .collect(),
            })
        })
    }

    async fn insert_manager(&self, manager: &NewManager) -> Result<(), QueryError> {
        self.with_collection(Operation::InsertManager, |collection| {
            if collection.managers.contains_key(&manager.id) {
                return Err(QueryError::ConstraintViolation {
                    operation: Operation::InsertManager,
                    constraint: MANAGER_KEY_CONSTRAINT.to_string(),
                });
            }
            let _ = collection.managers.insert(
                manager.id.clone(),
                Manager {
                    id: manager.id.clone(),
                    name: manager.name.as_ref().to_string(),
                    salary: manager.salary,
                },
            );
            Ok(())
        })
    }
}
