use storekeep_types::{
    AdminError, Manager, ManagerDirectory, ManagerFilter, NewManager, QueryError, ValidationError,
};
use tracing::{info, instrument, warn};

/// Registers and lists managers.
#[derive(Debug, Clone)]
pub struct ManagerRegistry<D> {
    managers: D,
}

impl<D> ManagerRegistry<D> {
    /// Create a registry over the given directory.
    pub const fn new(managers: D) -> Self {
        Self { managers }
    }
}

impl<D: ManagerDirectory + Sync> ManagerRegistry<D> {
    /// Every manager document.
    pub async fn list(&self) -> Result<Vec<Manager>, AdminError> {
        Ok(self.managers.find_managers(&ManagerFilter::All).await?)
    }

    /// Register a manager under a fresh id.
    ///
    /// Rejects with [`ValidationError::ManagerIdTaken`] without writing when the
    /// id is already in use. A duplicate-key failure from a concurrent insert is
    /// reported the same way.
    #[instrument(name = "managers.register", skip(self, manager), fields(manager_id = %manager.id))]
    pub async fn register(&self, manager: &NewManager) -> Result<(), AdminError> {
        let existing = self
            .managers
            .find_managers(&ManagerFilter::ById(manager.id.clone()))
            .await?;

        if !existing.is_empty() {
            warn!("[managers.id_taken] manager id already registered");
            return Err(ValidationError::ManagerIdTaken(manager.id.clone()).into());
        }

        match self.managers.insert_manager(manager).await {
            Ok(()) => {
                info!("[managers.registered] manager added");
                Ok(())
            }
            Err(QueryError::ConstraintViolation { .. }) => {
                warn!("[managers.id_taken] concurrent insert claimed manager id first");
                Err(ValidationError::ManagerIdTaken(manager.id.clone()).into())
            }
            Err(error) => Err(error.into()),
        }
    }
}
