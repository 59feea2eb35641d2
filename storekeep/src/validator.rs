use storekeep_types::{
    AdminError, ManagerDirectory, ManagerFilter, ManagerId, QueryError, StoreId, StoreProposal,
    StoreRepository, ValidationError,
};
use tracing::{info, instrument, warn};

/// Validates store writes against both datastores before committing them.
///
/// For a proposal that names a manager, the validator:
/// 1. looks the manager up in the document store, rejecting with
///    [`ValidationError::ManagerNotFound`] if no document matches;
/// 2. asks the relational store for any *other* store holding that manager,
///    rejecting with [`ValidationError::ManagerAlreadyAssigned`] if one exists;
/// 3. writes the location and manager.
///
/// The same checks run for [`add_store`](Self::add_store) and
/// [`edit_store`](Self::edit_store). A proposal without a manager skips the
/// checks and clears the assignment.
///
/// # Concurrency
///
/// Nothing locks the gap between the checks and the write. Two requests can
/// both pass step 2 for the same manager. The relational schema carries a
/// unique constraint on the manager column, so the slower write fails with
/// [`QueryError::ConstraintViolation`]; the validator then re-runs the
/// uniqueness probe and reports the store that won as
/// [`ValidationError::ManagerAlreadyAssigned`].
#[derive(Debug, Clone)]
pub struct StoreEditValidator<R, D> {
    stores: R,
    managers: D,
}

impl<R, D> StoreEditValidator<R, D> {
    /// Create a validator over the given adapters.
    pub const fn new(stores: R, managers: D) -> Self {
        Self { stores, managers }
    }

    /// The relational adapter this validator writes through.
    pub const fn stores(&self) -> &R {
        &self.stores
    }
}

impl<R, D> StoreEditValidator<R, D>
where
    R: StoreRepository + Sync,
    D: ManagerDirectory + Sync,
{
    /// Check that `manager_id` exists and is free to manage `target`.
    ///
    /// `target` is the store being edited, or `None` when creating a store.
    #[instrument(name = "validator.check_assignment", skip(self))]
    pub async fn check_assignment(
        &self,
        manager_id: &ManagerId,
        target: Option<StoreId>,
    ) -> Result<(), AdminError> {
        let matches = self
            .managers
            .find_managers(&ManagerFilter::ById(manager_id.clone()))
            .await?;

        if matches.is_empty() {
            warn!(
                manager_id = %manager_id,
                "[validator.manager_not_found] rejecting assignment to unknown manager"
            );
            return Err(ValidationError::ManagerNotFound(manager_id.clone()).into());
        }

        let conflicts = self.stores.stores_managed_by(manager_id, target).await?;
        if let Some(&store_id) = conflicts.first() {
            warn!(
                manager_id = %manager_id,
                conflicting_store = %store_id,
                "[validator.manager_already_assigned] manager already runs another store"
            );
            return Err(ValidationError::ManagerAlreadyAssigned {
                manager_id: manager_id.clone(),
                store_id,
            }
            .into());
        }

        Ok(())
    }

    /// Validate and apply an edit to an existing store.
    ///
    /// On success only `location` and `manager_id` change. On rejection nothing
    /// is written.
    #[instrument(
        name = "validator.edit_store",
        skip(self, proposal),
        fields(manager_id = ?proposal.manager_id)
    )]
    pub async fn edit_store(
        &self,
        store_id: StoreId,
        proposal: &StoreProposal,
    ) -> Result<(), AdminError> {
        if let Some(manager_id) = &proposal.manager_id {
            self.check_assignment(manager_id, Some(store_id)).await?;
        }

        match self.stores.update_store(store_id, proposal).await {
            Ok(true) => {
                info!(
                    store_id = %store_id,
                    location = %proposal.location,
                    "[validator.store_updated] store edit committed"
                );
                Ok(())
            }
            Ok(false) => Err(ValidationError::StoreNotFound(store_id).into()),
            Err(error) => Err(self.explain_write_failure(error, proposal, Some(store_id)).await),
        }
    }

    /// Validate and insert a new store, returning its id.
    #[instrument(
        name = "validator.add_store",
        skip(self, proposal),
        fields(manager_id = ?proposal.manager_id)
    )]
    pub async fn add_store(&self, proposal: &StoreProposal) -> Result<StoreId, AdminError> {
        if let Some(manager_id) = &proposal.manager_id {
            self.check_assignment(manager_id, None).await?;
        }

        match self.stores.insert_store(proposal).await {
            Ok(store_id) => {
                info!(
                    store_id = %store_id,
                    location = %proposal.location,
                    "[validator.store_added] store insert committed"
                );
                Ok(store_id)
            }
            Err(error) => Err(self.explain_write_failure(error, proposal, None).await),
        }
    }

    /// Turn a constraint violation caused by a concurrent assignment back into
    /// the rejection the checks would have produced had they run later.
    async fn explain_write_failure(
        &self,
        error: QueryError,
        proposal: &StoreProposal,
        target: Option<StoreId>,
    ) -> AdminError {
        let (QueryError::ConstraintViolation { .. }, Some(manager_id)) =
            (&error, &proposal.manager_id)
        else {
            return error.into();
        };

        match self.stores.stores_managed_by(manager_id, target).await {
            Ok(conflicts) => {
                if let Some(&store_id) = conflicts.first() {
                    warn!(
                        manager_id = %manager_id,
                        conflicting_store = %store_id,
                        "[validator.assignment_race] concurrent write claimed manager first"
                    );
                    return ValidationError::ManagerAlreadyAssigned {
                        manager_id: manager_id.clone(),
                        store_id,
                    }
                    .into();
                }
                error.into()
            }
            Err(lookup_error) => {
                warn!(
                    error = %lookup_error,
                    "[validator.assignment_race] could not resolve conflicting store"
                );
                error.into()
            }
        }
    }
}
