//! Store add and edit scenarios run against the in-memory adapters.

use std::sync::atomic::{AtomicBool, Ordering};

use storekeep::{
    AdminError, Field, Manager, ManagerId, ProductId, ProductListing, QueryError, Salary,
    Store, StoreAdmin, StoreEditValidator, StoreId, StoreProposal, StoreRepository,
    ValidationError,
};
use storekeep_memory::{InMemoryManagerDirectory, InMemoryStoreRepository};

fn manager_id(raw: &str) -> ManagerId {
    ManagerId::try_new(raw).expect("valid manager id")
}

fn manager(raw: &str, name: &str) -> Manager {
    Manager {
        id: manager_id(raw),
        name: name.to_string(),
        salary: Salary::try_new(48_000.0).expect("valid salary"),
    }
}

fn proposal(location: &str, mgrid: &str) -> StoreProposal {
    StoreProposal::parse(location, mgrid).expect("valid proposal")
}

struct Fixture {
    stores: InMemoryStoreRepository,
    managers: InMemoryManagerDirectory,
    admin: StoreAdmin<InMemoryStoreRepository, InMemoryManagerDirectory>,
}

impl Fixture {
    fn new() -> Self {
        let stores = InMemoryStoreRepository::new();
        let managers = InMemoryManagerDirectory::new();
        let admin = StoreAdmin::new(stores.clone(), managers.clone());
        Self {
            stores,
            managers,
            admin,
        }
    }

    async fn store(&self, store_id: StoreId) -> Store {
        self.stores
            .find_store(store_id)
            .await
            .expect("store lookup succeeds")
            .expect("store exists")
    }
}

#[tokio::test]
async fn edit_assigns_a_free_manager() {
    let fixture = Fixture::new();
    fixture.managers.seed_manager(manager("M1", "Ada"));
    let store_id = fixture.stores.seed_store("A", None);

    fixture
        .admin
        .edit_store(store_id, &proposal("B", "M1"))
        .await
        .expect("edit accepted");

    let store = fixture.store(store_id).await;
    assert_eq!(store.location, "B");
    assert_eq!(store.manager_id, Some(manager_id("M1")));
}

#[tokio::test]
async fn edit_rejects_manager_running_another_store() {
    let fixture = Fixture::new();
    fixture.managers.seed_manager(manager("M1", "Ada"));
    let target = fixture.stores.seed_store("A", None);
    let holder = fixture.stores.seed_store("Cork", Some(manager_id("M1")));

    let error = fixture
        .admin
        .edit_store(target, &proposal("B", "M1"))
        .await
        .expect_err("assignment rejected");

    assert_eq!(
        error,
        AdminError::Validation(ValidationError::ManagerAlreadyAssigned {
            manager_id: manager_id("M1"),
            store_id: holder,
        })
    );
    let store = fixture.store(target).await;
    assert_eq!(store.location, "A");
    assert_eq!(store.manager_id, None);
}

#[tokio::test]
async fn edit_rejects_unknown_manager_without_writing() {
    let fixture = Fixture::new();
    let store_id = fixture.stores.seed_store("A", None);

    let error = fixture
        .admin
        .edit_store(store_id, &proposal("B", "M404"))
        .await
        .expect_err("unknown manager rejected");

    assert_eq!(
        error,
        AdminError::Validation(ValidationError::ManagerNotFound(manager_id("M404")))
    );
    assert_eq!(fixture.store(store_id).await.location, "A");
}

#[tokio::test]
async fn store_may_keep_its_own_manager() {
    let fixture = Fixture::new();
    fixture.managers.seed_manager(manager("M1", "Ada"));
    let store_id = fixture.stores.seed_store("A", Some(manager_id("M1")));

    fixture
        .admin
        .edit_store(store_id, &proposal("A, upstairs", "M1"))
        .await
        .expect("keeping the same manager is allowed");

    let store = fixture.store(store_id).await;
    assert_eq!(store.location, "A, upstairs");
    assert_eq!(store.manager_id, Some(manager_id("M1")));
}

#[tokio::test]
async fn repeating_an_accepted_edit_is_idempotent() {
    let fixture = Fixture::new();
    fixture.managers.seed_manager(manager("M1", "Ada"));
    let store_id = fixture.stores.seed_store("A", None);
    let edit = proposal("B", "M1");

    fixture.admin.edit_store(store_id, &edit).await.expect("first edit");
    let after_first = fixture.store(store_id).await;
    fixture.admin.edit_store(store_id, &edit).await.expect("second edit");

    assert_eq!(fixture.store(store_id).await, after_first);
}

#[tokio::test]
async fn blank_manager_clears_assignment() {
    let fixture = Fixture::new();
    let store_id = fixture.stores.seed_store("A", Some(manager_id("M1")));

    fixture
        .admin
        .edit_store(store_id, &proposal("A", ""))
        .await
        .expect("clearing the manager skips the checks");

    assert_eq!(fixture.store(store_id).await.manager_id, None);
}

#[tokio::test]
async fn edit_of_missing_store_is_rejected() {
    let fixture = Fixture::new();
    fixture.managers.seed_manager(manager("M1", "Ada"));
    let missing = StoreId::new(77);

    let error = fixture
        .admin
        .edit_store(missing, &proposal("B", "M1"))
        .await
        .expect_err("missing store rejected");

    assert_eq!(
        error,
        AdminError::Validation(ValidationError::StoreNotFound(missing))
    );
    assert!(fixture.admin.stores().await.expect("list").is_empty());
}

#[tokio::test]
async fn datastore_failure_propagates_as_query_error() {
    let fixture = Fixture::new();
    let store_id = fixture.stores.seed_store("A", None);
    fixture.managers.seed_manager(manager("M1", "Ada"));
    fixture.managers.set_unavailable(true);

    let error = fixture
        .admin
        .edit_store(store_id, &proposal("B", "M1"))
        .await
        .expect_err("lookup failure surfaces");

    assert!(matches!(
        error,
        AdminError::Query(QueryError::StoreFailure { .. })
    ));
    assert_eq!(fixture.store(store_id).await.location, "A");
}

#[tokio::test]
async fn add_store_runs_the_same_checks() {
    let fixture = Fixture::new();
    fixture.managers.seed_manager(manager("M1", "Ada"));
    let holder = fixture.stores.seed_store("Cork", Some(manager_id("M1")));

    let unknown = fixture
        .admin
        .add_store(&proposal("Galway", "M2"))
        .await
        .expect_err("unknown manager rejected");
    assert_eq!(
        unknown,
        AdminError::Validation(ValidationError::ManagerNotFound(manager_id("M2")))
    );

    let taken = fixture
        .admin
        .add_store(&proposal("Galway", "M1"))
        .await
        .expect_err("assigned manager rejected");
    assert_eq!(
        taken,
        AdminError::Validation(ValidationError::ManagerAlreadyAssigned {
            manager_id: manager_id("M1"),
            store_id: holder,
        })
    );

    let added = fixture
        .admin
        .add_store(&proposal("Galway", ""))
        .await
        .expect("store without manager accepted");
    assert_eq!(fixture.store(added).await.location, "Galway");
    assert_eq!(fixture.admin.stores().await.expect("list").len(), 2);
}

#[test]
fn proposal_parsing_rejects_blank_location() {
    let error = StoreProposal::parse("   ", "M1").expect_err("blank location");

    assert!(matches!(
        error,
        ValidationError::InvalidField {
            field: Field::Location,
            ..
        }
    ));
}

/// Repository whose first uniqueness probe misses a concurrent assignment,
/// as happens when another request commits between the check and the write.
#[derive(Clone)]
struct LateCommitRepository {
    inner: InMemoryStoreRepository,
    probe_missed: std::sync::Arc<AtomicBool>,
}

impl StoreRepository for LateCommitRepository {
    async fn list_stores(&self) -> Result<Vec<Store>, QueryError> {
        self.inner.list_stores().await
    }

    async fn find_store(&self, store_id: StoreId) -> Result<Option<Store>, QueryError> {
        self.inner.find_store(store_id).await
    }

    async fn stores_managed_by(
        &self,
        manager_id: &ManagerId,
        excluding: Option<StoreId>,
    ) -> Result<Vec<StoreId>, QueryError> {
        if !self.probe_missed.swap(true, Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        self.inner.stores_managed_by(manager_id, excluding).await
    }

    async fn insert_store(&self, proposal: &StoreProposal) -> Result<StoreId, QueryError> {
        self.inner.insert_store(proposal).await
    }

    async fn update_store(
        &self,
        store_id: StoreId,
        proposal: &StoreProposal,
    ) -> Result<bool, QueryError> {
        self.inner.update_store(store_id, proposal).await
    }

    async fn list_products(&self) -> Result<Vec<ProductListing>, QueryError> {
        self.inner.list_products().await
    }

    async fn product_links(&self, product_id: &ProductId) -> Result<usize, QueryError> {
        self.inner.product_links(product_id).await
    }

    async fn delete_product(&self, product_id: &ProductId) -> Result<bool, QueryError> {
        self.inner.delete_product(product_id).await
    }
}

#[tokio::test]
async fn constraint_violation_after_passed_checks_is_reported_as_assigned() {
    let inner = InMemoryStoreRepository::new();
    let managers = InMemoryManagerDirectory::new();
    managers.seed_manager(manager("M1", "Ada"));
    let target = inner.seed_store("A", None);
    let winner = inner.seed_store("B", Some(manager_id("M1")));
    let validator = StoreEditValidator::new(
        LateCommitRepository {
            inner: inner.clone(),
            probe_missed: std::sync::Arc::new(AtomicBool::new(false)),
        },
        managers,
    );

    let error = validator
        .edit_store(target, &proposal("A2", "M1"))
        .await
        .expect_err("unique constraint backstops the race");

    assert_eq!(
        error,
        AdminError::Validation(ValidationError::ManagerAlreadyAssigned {
            manager_id: manager_id("M1"),
            store_id: winner,
        })
    );
    let untouched = inner
        .find_store(target)
        .await
        .expect("lookup")
        .expect("store exists");
    assert_eq!(untouched.location, "A");
    assert_eq!(untouched.manager_id, None);
}

#[tokio::test]
async fn concurrent_edits_never_share_a_manager() {
    let fixture = Fixture::new();
    fixture.managers.seed_manager(manager("M1", "Ada"));
    let first = fixture.stores.seed_store("A", None);
    let second = fixture.stores.seed_store("B", None);

    let first_proposal = proposal("A", "M1");
    let second_proposal = proposal("B", "M1");
    let (left, right) = tokio::join!(
        fixture.admin.edit_store(first, &first_proposal),
        fixture.admin.edit_store(second, &second_proposal),
    );

    assert_eq!(
        [left.is_ok(), right.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one edit may claim the manager"
    );
    let holders = fixture
        .stores
        .stores_managed_by(&manager_id("M1"), None)
        .await
        .expect("probe");
    assert_eq!(holders.len(), 1);
}
