//! Storekeep core.
//!
//! Stores and products live in a relational database; managers live in a
//! document database. A store's `mgrid` column points into the manager
//! collection, but neither engine can see the other, so two invariants are
//! enforced here before any write reaches the relational store:
//!
//! 1. every store's manager, if set, exists in the manager collection;
//! 2. a manager runs at most one store at a time.
//!
//! The [`StoreEditValidator`] owns both checks. [`ManagerRegistry`] and
//! [`ProductCatalog`] cover the remaining write paths, and [`StoreAdmin`]
//! bundles all three behind one value built from injected adapters.
//!
//! # Example
//!
//! ```ignore
//! use storekeep::{StoreAdmin, StoreProposal, StoreId};
//!
//! let admin = StoreAdmin::new(postgres_repository, mongo_directory);
//! let proposal = StoreProposal::parse("Galway", "M001")?;
//! admin.edit_store(StoreId::new(1), &proposal).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod admin;
mod managers;
mod products;
mod validator;

pub use admin::StoreAdmin;
pub use managers::ManagerRegistry;
pub use products::ProductCatalog;
pub use validator::StoreEditValidator;

pub use storekeep_types::{
    AdminError, Field, Location, Manager, ManagerDirectory, ManagerFilter, ManagerId,
    ManagerName, NewManager, Operation, ProductId, ProductListing, QueryError, Salary, Store,
    StoreId, StoreProposal, StoreRepository, ValidationError,
};
