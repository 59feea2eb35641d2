use storekeep_testing::contract::{
    manager_directory_contract_tests, store_repository_contract_tests,
};

store_repository_contract_tests! {
    suite = in_memory_store_repository,
    make_store = || storekeep_memory::InMemoryStoreRepository::new(),
}

manager_directory_contract_tests! {
    suite = in_memory_manager_directory,
    make_directory = || storekeep_memory::InMemoryManagerDirectory::new(),
}
