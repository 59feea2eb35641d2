//! MongoDB adapter for Storekeep
//!
//! Implements [`ManagerDirectory`] over a single `managers` collection whose
//! documents are keyed by the manager id:
//!
//! ```text
//! { "_id": "M001", "name": "Ada Byrne", "salary": 52000 }
//! ```
//!
//! One [`Client`] is created at startup and shared by every request; the
//! driver pools its own connections.

#![forbid(unsafe_code)]

use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Database};
use serde::{Deserialize, Serialize};
use storekeep_types::{
    Manager, ManagerDirectory, ManagerFilter, ManagerId, NewManager, Operation, QueryError,
    Salary,
};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

const DUPLICATE_KEY: i32 = 11000;
const ID_INDEX: &str = "_id_";

/// Startup failures of the MongoDB adapter.
///
/// Query-time failures are reported as [`QueryError`] instead.
#[derive(Debug, Error)]
pub enum MongoDirectoryError {
    /// The connection string was rejected or the client could not be built.
    #[error("failed to create mongodb client")]
    ConnectionFailed(#[source] mongodb::error::Error),

    /// The server did not answer `ping`.
    #[error("mongodb did not answer the startup ping")]
    PingFailed(#[source] mongodb::error::Error),
}

/// Where the manager collection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    /// Database holding the collection.
    pub database: String,
    /// Collection name (default: `managers`).
    pub collection: String,
}

impl MongoConfig {
    /// Point at `database` on `uri`, using the `managers` collection.
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            collection: "managers".to_string(),
        }
    }
}

/// Wire shape of a manager document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ManagerDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    salary: f64,
}

impl From<&NewManager> for ManagerDocument {
    fn from(manager: &NewManager) -> Self {
        Self {
            id: manager.id.to_string(),
            name: manager.name.to_string(),
            salary: manager.salary.into_inner(),
        }
    }
}

impl TryFrom<ManagerDocument> for Manager {
    type Error = QueryError;

    fn try_from(document: ManagerDocument) -> Result<Self, Self::Error> {
        let decode_failed = |detail: String| QueryError::DecodeFailed {
            operation: Operation::FindManagers,
            detail,
        };

        Ok(Self {
            id: ManagerId::try_new(document.id)
                .map_err(|error| decode_failed(error.to_string()))?,
            name: document.name,
            salary: Salary::try_new(document.salary)
                .map_err(|error| decode_failed(error.to_string()))?,
        })
    }
}

/// Translate a directory filter into a query document.
///
/// [`ManagerFilter::All`] becomes the empty filter, which matches every
/// document.
fn filter_for(filter: &ManagerFilter) -> Document {
    match filter {
        ManagerFilter::All => Document::new(),
        ManagerFilter::ById(manager_id) => doc! { "_id": manager_id.as_ref() },
    }
}

/// [`ManagerDirectory`] backed by a MongoDB collection.
///
/// Cloning shares the underlying client.
#[derive(Debug, Clone)]
pub struct MongoManagerDirectory {
    database: Database,
    collection: String,
}

impl MongoManagerDirectory {
    /// Create the client and confirm the server answers a ping.
    #[instrument(name = "mongodb.connect", skip(config), fields(database = %config.database))]
    pub async fn connect(config: MongoConfig) -> Result<Self, MongoDirectoryError> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(MongoDirectoryError::ConnectionFailed)?;
        let directory = Self::from_database(client.database(&config.database), config.collection);
        directory.ping().await?;
        info!("[mongodb.connected] manager collection reachable");
        Ok(directory)
    }

    /// Wrap an existing database handle.
    pub fn from_database(database: Database, collection: impl Into<String>) -> Self {
        Self {
            database,
            collection: collection.into(),
        }
    }

    /// Round-trip a `ping` command to the database.
    pub async fn ping(&self) -> Result<(), MongoDirectoryError> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(MongoDirectoryError::PingFailed)?;
        Ok(())
    }

    /// Run a filtered find against `collection_name`. An empty filter returns
    /// every document.
    async fn find(
        &self,
        collection_name: &str,
        filter: Document,
    ) -> Result<Vec<ManagerDocument>, QueryError> {
        let operation = Operation::FindManagers;
        let cursor = self
            .database
            .collection::<ManagerDocument>(collection_name)
            .find(filter)
            .await
            .map_err(|error| map_mongo_error(&error, operation))?;

        cursor
            .try_collect()
            .await
            .map_err(|error| map_mongo_error(&error, operation))
    }
}

impl ManagerDirectory for MongoManagerDirectory {
    #[instrument(name = "mongodb.find_managers", skip(self))]
    async fn find_managers(&self, filter: &ManagerFilter) -> Result<Vec<Manager>, QueryError> {
        self.find(&self.collection, filter_for(filter))
            .await?
            .into_iter()
            .map(Manager::try_from)
            .collect()
    }

    #[instrument(name = "mongodb.insert_manager", skip(self, manager), fields(manager_id = %manager.id))]
    async fn insert_manager(&self, manager: &NewManager) -> Result<(), QueryError> {
        self.database
            .collection::<ManagerDocument>(&self.collection)
            .insert_one(ManagerDocument::from(manager))
            .await
            .map_err(|error| map_mongo_error(&error, Operation::InsertManager))?;
        Ok(())
    }
}

fn map_mongo_error(error: &mongodb::error::Error, operation: Operation) -> QueryError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = error.kind.as_ref() {
        if write_error.code == DUPLICATE_KEY {
            warn!(
                operation = %operation,
                "[mongodb.duplicate_key] insert rejected by unique index"
            );
            return QueryError::ConstraintViolation {
                operation,
                constraint: ID_INDEX.to_string(),
            };
        }
    }

    if let ErrorKind::BsonDeserialization(detail) = error.kind.as_ref() {
        error!(
            error = %error,
            operation = %operation,
            "[mongodb.decode_error] document did not match the manager shape"
        );
        return QueryError::DecodeFailed {
            operation,
            detail: detail.to_string(),
        };
    }

    error!(
        error = %error,
        operation = %operation,
        "[mongodb.database_error] database operation failed"
    );
    QueryError::StoreFailure { operation }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    #[test]
    fn all_filter_is_empty_document() {
        assert!(filter_for(&ManagerFilter::All).is_empty());
    }

    #[test]
    fn by_id_filter_matches_document_key() {
        let manager_id = ManagerId::try_new("M001").expect("valid manager id");

        let filter = filter_for(&ManagerFilter::ById(manager_id));

        assert_eq!(filter, doc! { "_id": "M001" });
    }

    #[test]
    fn new_manager_serializes_with_document_key() {
        let manager = NewManager::parse("M002", "Ada Byrne", "52000").expect("valid manager");

        let document =
            bson::to_document(&ManagerDocument::from(&manager)).expect("document serializes");

        assert_eq!(
            document,
            doc! { "_id": "M002", "name": "Ada Byrne", "salary": 52000.0 }
        );
    }

    #[test]
    fn integer_salaries_decode() {
        let stored = doc! { "_id": "M003", "name": "Linus", "salary": 41000_i32 };

        let document: ManagerDocument = bson::from_document(stored).expect("document decodes");
        let manager = Manager::try_from(document).expect("valid manager");

        assert_eq!(manager.salary.into_inner(), 41000.0);
    }

    #[test]
    fn negative_stored_salary_is_a_decode_failure() {
        let document = ManagerDocument {
            id: "M004".to_string(),
            name: "Grace".to_string(),
            salary: -1.0,
        };

        assert!(matches!(
            Manager::try_from(document),
            Err(QueryError::DecodeFailed {
                operation: Operation::FindManagers,
                ..
            })
        ));
    }

    #[test]
    fn default_collection_is_managers() {
        let config = MongoConfig::new("mongodb://localhost:27017", "storekeep");

        assert_eq!(config.collection, "managers");
    }
}
