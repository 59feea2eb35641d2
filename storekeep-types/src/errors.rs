use crate::domain::{ManagerId, ProductId, StoreId};
use thiserror::Error;

/// Identifies the adapter operation that failed.
///
/// Used by [`QueryError`] to provide strongly-typed identification of which
/// operation encountered an infrastructure failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Listing every store.
    ListStores,
    /// Loading a single store by id.
    FindStore,
    /// Looking up stores that hold a given manager.
    FindAssignedStores,
    /// Inserting a new store.
    InsertStore,
    /// Updating a store's location and manager.
    UpdateStore,
    /// Listing products joined with their stores.
    ListProducts,
    /// Counting the store links of a product.
    CountProductLinks,
    /// Deleting a product.
    DeleteProduct,
    /// Finding manager documents.
    FindManagers,
    /// Inserting a manager document.
    InsertManager,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListStores => write!(f, "list_stores"),
            Self::FindStore => write!(f, "find_store"),
            Self::FindAssignedStores => write!(f, "find_assigned_stores"),
            Self::InsertStore => write!(f, "insert_store"),
            Self::UpdateStore => write!(f, "update_store"),
            Self::ListProducts => write!(f, "list_products"),
            Self::CountProductLinks => write!(f, "count_product_links"),
            Self::DeleteProduct => write!(f, "delete_product"),
            Self::FindManagers => write!(f, "find_managers"),
            Self::InsertManager => write!(f, "insert_manager"),
        }
    }
}

/// Error type returned by adapter operations.
///
/// Adapters never retry and never recover locally; they translate backend
/// failures into one of these variants and hand them to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Infrastructure failure surfaced by the backing store (connection drops,
    /// syntax errors, timeouts acquiring a pooled connection).
    #[error("{operation} operation failed")]
    StoreFailure { operation: Operation },

    /// A uniqueness or foreign-key constraint rejected the write.
    ///
    /// The core maps these back to validation failures: they are the
    /// database-level backstop for checks that already ran in application code.
    #[error("{operation} operation violated constraint {constraint}")]
    ConstraintViolation {
        operation: Operation,
        constraint: String,
    },

    /// A row or document came back in a shape the domain types reject.
    #[error("failed to decode result of {operation}: {detail}")]
    DecodeFailed { operation: Operation, detail: String },
}

/// Form field named in [`ValidationError::InvalidField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Store `location`.
    Location,
    /// Store `mgrid` / manager `managerId`.
    ManagerId,
    /// Manager `name`.
    ManagerName,
    /// Manager `salary`.
    Salary,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Location => write!(f, "location"),
            Self::ManagerId => write!(f, "manager id"),
            Self::ManagerName => write!(f, "name"),
            Self::Salary => write!(f, "salary"),
        }
    }
}

/// Business rule violation detected before any write happened.
///
/// These are recovered by the caller and turned into a message on the page
/// that submitted the request; they never become a server error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The proposed manager has no document in the manager collection.
    #[error("manager {0} not found")]
    ManagerNotFound(ManagerId),

    /// The proposed manager already manages another store.
    #[error("manager {manager_id} already assigned to store {store_id}")]
    ManagerAlreadyAssigned {
        manager_id: ManagerId,
        store_id: StoreId,
    },

    /// A manager document with this id already exists.
    #[error("manager id {0} already taken")]
    ManagerIdTaken(ManagerId),

    /// The product is still linked to at least one store.
    #[error("product {0} still referenced by a store")]
    ProductStillReferenced(ProductId),

    /// No product row has this id.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// No store row has this id.
    #[error("store {0} not found")]
    StoreNotFound(StoreId),

    /// A submitted form field failed domain validation.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: Field, reason: String },
}

/// Error type for every core operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// The request was rejected; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An adapter failed.
    #[error(transparent)]
    Query(#[from] QueryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failure_names_operation() {
        let error = QueryError::StoreFailure {
            operation: Operation::UpdateStore,
        };

        assert_eq!(error.to_string(), "update_store operation failed");
    }

    #[test]
    fn already_assigned_carries_both_ids() {
        let error = ValidationError::ManagerAlreadyAssigned {
            manager_id: ManagerId::try_new("M1").expect("valid manager id"),
            store_id: StoreId::new(2),
        };

        assert_eq!(error.to_string(), "manager M1 already assigned to store 2");
    }

    #[test]
    fn admin_error_is_transparent() {
        let error = AdminError::from(ValidationError::StoreNotFound(StoreId::new(7)));

        assert_eq!(error.to_string(), "store 7 not found");
    }
}
