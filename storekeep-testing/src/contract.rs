use std::fmt;

use storekeep_types::{
    Location, ManagerDirectory, ManagerFilter, ManagerId, ManagerName, NewManager, ProductId,
    QueryError, Salary, StoreId, StoreProposal, StoreRepository,
};
use uuid::Uuid;

#[derive(Debug)]
pub struct ContractTestFailure {
    scenario: &'static str,
    detail: String,
}

impl ContractTestFailure {
    fn new(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self {
            scenario,
            detail: detail.into(),
        }
    }

    fn query_error(scenario: &'static str, operation: &'static str, error: QueryError) -> Self {
        Self::new(
            scenario,
            format!("{operation} operation returned unexpected error: {error}"),
        )
    }

    fn assertion(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self::new(scenario, detail)
    }
}

impl fmt::Display for ContractTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scenario, self.detail)
    }
}

impl std::error::Error for ContractTestFailure {}

pub type ContractTestResult = Result<(), ContractTestFailure>;

/// Manager id unique across runs, so suites can share one database.
fn contract_manager_id(
    scenario: &'static str,
    label: &str,
) -> Result<ManagerId, ContractTestFailure> {
    let raw = format!("{label}-{}", Uuid::now_v7().simple());

    ManagerId::try_new(raw.clone()).map_err(|error| {
        ContractTestFailure::assertion(
            scenario,
            format!("unable to construct manager id `{raw}`: {error}"),
        )
    })
}

fn contract_proposal(
    scenario: &'static str,
    location: &str,
    manager_id: Option<&ManagerId>,
) -> Result<StoreProposal, ContractTestFailure> {
    let location = Location::try_new(format!("{scenario} {location}")).map_err(|error| {
        ContractTestFailure::assertion(scenario, format!("unable to construct location: {error}"))
    })?;

    Ok(StoreProposal {
        location,
        manager_id: manager_id.cloned(),
    })
}

fn contract_manager(
    scenario: &'static str,
    manager_id: &ManagerId,
) -> Result<NewManager, ContractTestFailure> {
    let name = ManagerName::try_new("Contract Manager").map_err(|error| {
        ContractTestFailure::assertion(scenario, format!("unable to construct name: {error}"))
    })?;
    let salary = Salary::try_new(31_500.0).map_err(|error| {
        ContractTestFailure::assertion(scenario, format!("unable to construct salary: {error}"))
    })?;

    Ok(NewManager {
        id: manager_id.clone(),
        name,
        salary,
    })
}

pub async fn test_insert_then_find_store<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: StoreRepository + Send + Sync + 'static,
{
    const SCENARIO: &str = "insert_then_find_store";

    let store = make_store();
    let proposal = contract_proposal(SCENARIO, "insert", None)?;

    let store_id = store
        .insert_store(&proposal)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "insert_store", error))?;

    let found = store
        .find_store(store_id)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "find_store", error))?
        .ok_or_else(|| {
            ContractTestFailure::assertion(SCENARIO, format!("store {store_id} not found"))
        })?;

    if found.location != proposal.location.as_ref() || found.manager_id.is_some() {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("inserted store read back as {found:?}"),
        ));
    }

    let listed = store
        .list_stores()
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "list_stores", error))?;

    if !listed.iter().any(|listed| listed.id == store_id) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "list_stores omitted the inserted store",
        ));
    }

    if listed.windows(2).any(|pair| pair[0].id >= pair[1].id) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "list_stores must be ordered by store id",
        ));
    }

    Ok(())
}

pub async fn test_update_overwrites_store<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: StoreRepository + Send + Sync + 'static,
{
    const SCENARIO: &str = "update_overwrites_store";

    let store = make_store();
    let manager_id = contract_manager_id(SCENARIO, "update")?;

    let store_id = store
        .insert_store(&contract_proposal(SCENARIO, "before", None)?)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "insert_store", error))?;

    let proposal = contract_proposal(SCENARIO, "after", Some(&manager_id))?;
    let updated = store
        .update_store(store_id, &proposal)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "update_store", error))?;

    if !updated {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "update_store reported no match for an existing store",
        ));
    }

    let found = store
        .find_store(store_id)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "find_store", error))?;

    match found {
        Some(found)
            if found.location == proposal.location.as_ref()
                && found.manager_id.as_ref() == Some(&manager_id) =>
        {
            Ok(())
        }
        other => Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("updated store read back as {other:?}"),
        )),
    }
}

pub async fn test_update_missing_store<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: StoreRepository + Send + Sync + 'static,
{
    const SCENARIO: &str = "update_missing_store";

    let store = make_store();
    let missing = StoreId::new(i32::MAX);

    let updated = store
        .update_store(missing, &contract_proposal(SCENARIO, "ghost", None)?)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "update_store", error))?;

    if updated {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "update_store reported a match for a store that does not exist",
        ));
    }

    let found = store
        .find_store(missing)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "find_store", error))?;

    if found.is_some() {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "update_store created a row for a missing store",
        ));
    }

    Ok(())
}

pub async fn test_manager_held_by_one_store<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: StoreRepository + Send + Sync + 'static,
{
    const SCENARIO: &str = "manager_held_by_one_store";

    let store = make_store();
    let manager_id = contract_manager_id(SCENARIO, "unique")?;

    let holder = store
        .insert_store(&contract_proposal(SCENARIO, "holder", Some(&manager_id))?)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "insert_store", error))?;

    let held = store
        .stores_managed_by(&manager_id, None)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "stores_managed_by", error))?;
    if held != vec![holder] {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected manager held by [{holder}], observed {held:?}"),
        ));
    }

    let excluding_holder = store
        .stores_managed_by(&manager_id, Some(holder))
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "stores_managed_by", error))?;
    if !excluding_holder.is_empty() {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "stores_managed_by must ignore the excluded store",
        ));
    }

    match store
        .insert_store(&contract_proposal(SCENARIO, "rival", Some(&manager_id))?)
        .await
    {
        Err(QueryError::ConstraintViolation { .. }) => {}
        Err(error) => {
            return Err(ContractTestFailure::query_error(
                SCENARIO,
                "insert_store",
                error,
            ))
        }
        Ok(store_id) => {
            return Err(ContractTestFailure::assertion(
                SCENARIO,
                format!("second store {store_id} was allowed to hold the same manager"),
            ))
        }
    }

    let rival = store
        .insert_store(&contract_proposal(SCENARIO, "rival", None)?)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "insert_store", error))?;

    match store
        .update_store(
            rival,
            &contract_proposal(SCENARIO, "rival", Some(&manager_id))?,
        )
        .await
    {
        Err(QueryError::ConstraintViolation { .. }) => {}
        Err(error) => {
            return Err(ContractTestFailure::query_error(
                SCENARIO,
                "update_store",
                error,
            ))
        }
        Ok(_) => {
            return Err(ContractTestFailure::assertion(
                SCENARIO,
                "update_store allowed a second store to hold the same manager",
            ))
        }
    }

    let rival_row = store
        .find_store(rival)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "find_store", error))?;
    if rival_row.and_then(|row| row.manager_id).is_some() {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "rejected update must leave the store row unchanged",
        ));
    }

    Ok(())
}

pub async fn test_missing_product<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: StoreRepository + Send + Sync + 'static,
{
    const SCENARIO: &str = "missing_product";

    let store = make_store();
    let raw = format!("P{}", &Uuid::now_v7().simple().to_string()[..16]);
    let product_id = ProductId::try_new(raw).map_err(|error| {
        ContractTestFailure::assertion(SCENARIO, format!("unable to construct product id: {error}"))
    })?;

    let links = store
        .product_links(&product_id)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "product_links", error))?;
    if links != 0 {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("unknown product reported {links} links"),
        ));
    }

    let deleted = store
        .delete_product(&product_id)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "delete_product", error))?;
    if deleted {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "delete_product reported deleting an unknown product",
        ));
    }

    Ok(())
}

pub async fn test_insert_then_find_manager<F, D>(make_directory: F) -> ContractTestResult
where
    F: Fn() -> D + Send + Sync + Clone + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    const SCENARIO: &str = "insert_then_find_manager";

    let directory = make_directory();
    let manager_id = contract_manager_id(SCENARIO, "find")?;
    let manager = contract_manager(SCENARIO, &manager_id)?;

    directory
        .insert_manager(&manager)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "insert_manager", error))?;

    let found = directory
        .find_managers(&ManagerFilter::ById(manager_id.clone()))
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "find_managers", error))?;

    match found.as_slice() {
        [only]
            if only.id == manager_id
                && only.name == manager.name.as_ref()
                && only.salary == manager.salary => {}
        other => {
            return Err(ContractTestFailure::assertion(
                SCENARIO,
                format!("expected exactly the inserted manager, observed {other:?}"),
            ))
        }
    }

    let all = directory
        .find_managers(&ManagerFilter::All)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "find_managers", error))?;
    if !all.iter().any(|listed| listed.id == manager_id) {
        return Err(ContractTestFailure::assertion(
            SCENARIO,
            "empty filter must return every manager",
        ));
    }

    Ok(())
}

pub async fn test_duplicate_manager_rejected<F, D>(make_directory: F) -> ContractTestResult
where
    F: Fn() -> D + Send + Sync + Clone + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    const SCENARIO: &str = "duplicate_manager_rejected";

    let directory = make_directory();
    let manager_id = contract_manager_id(SCENARIO, "dup")?;
    let manager = contract_manager(SCENARIO, &manager_id)?;

    directory
        .insert_manager(&manager)
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "insert_manager", error))?;

    match directory.insert_manager(&manager).await {
        Err(QueryError::ConstraintViolation { .. }) => Ok(()),
        Err(error) => Err(ContractTestFailure::query_error(
            SCENARIO,
            "insert_manager",
            error,
        )),
        Ok(()) => Err(ContractTestFailure::assertion(
            SCENARIO,
            "duplicate manager id was accepted",
        )),
    }
}

pub async fn test_unknown_manager_not_found<F, D>(make_directory: F) -> ContractTestResult
where
    F: Fn() -> D + Send + Sync + Clone + 'static,
    D: ManagerDirectory + Send + Sync + 'static,
{
    const SCENARIO: &str = "unknown_manager_not_found";

    let directory = make_directory();
    let manager_id = contract_manager_id(SCENARIO, "ghost")?;

    let found = directory
        .find_managers(&ManagerFilter::ById(manager_id))
        .await
        .map_err(|error| ContractTestFailure::query_error(SCENARIO, "find_managers", error))?;

    if found.is_empty() {
        Ok(())
    } else {
        Err(ContractTestFailure::assertion(
            SCENARIO,
            format!("expected no managers, observed {found:?}"),
        ))
    }
}

#[macro_export]
macro_rules! store_repository_contract_tests {
    (suite = $suite:ident, make_store = $make_store:expr $(,)?) => {
        mod $suite {
            use $crate::contract::{
                test_insert_then_find_store, test_manager_held_by_one_store,
                test_missing_product, test_update_missing_store, test_update_overwrites_store,
            };

            #[tokio::test(flavor = "multi_thread")]
            async fn insert_then_find_store_contract() {
                test_insert_then_find_store($make_store)
                    .await
                    .expect("store repository contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn update_overwrites_store_contract() {
                test_update_overwrites_store($make_store)
                    .await
                    .expect("store repository contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn update_missing_store_contract() {
                test_update_missing_store($make_store)
                    .await
                    .expect("store repository contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn manager_held_by_one_store_contract() {
                test_manager_held_by_one_store($make_store)
                    .await
                    .expect("store repository contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn missing_product_contract() {
                test_missing_product($make_store)
                    .await
                    .expect("store repository contract failed");
            }
        }
    };
}

pub use crate::store_repository_contract_tests;

#[macro_export]
macro_rules! manager_directory_contract_tests {
    (suite = $suite:ident, make_directory = $make_directory:expr $(,)?) => {
        mod $suite {
            use $crate::contract::{
                test_duplicate_manager_rejected, test_insert_then_find_manager,
                test_unknown_manager_not_found,
            };

            #[tokio::test(flavor = "multi_thread")]
            async fn insert_then_find_manager_contract() {
                test_insert_then_find_manager($make_directory)
                    .await
                    .expect("manager directory contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn duplicate_manager_rejected_contract() {
                test_duplicate_manager_rejected($make_directory)
                    .await
                    .expect("manager directory contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn unknown_manager_not_found_contract() {
                test_unknown_manager_not_found($make_directory)
                    .await
                    .expect("manager directory contract failed");
            }
        }
    };
}

pub use crate::manager_directory_contract_tests;
