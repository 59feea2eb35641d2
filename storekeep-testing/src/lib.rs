#![forbid(unsafe_code)]

//! Behavioral contract shared by every Storekeep adapter.
//!
//! Adapter crates invoke [`store_repository_contract_tests!`] and
//! [`manager_directory_contract_tests!`] from an integration test to generate
//! one `#[tokio::test]` per scenario. When a scenario is added here, every
//! adapter picks it up without further changes.

pub mod contract;
