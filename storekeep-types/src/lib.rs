#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared vocabulary types and traits for the Storekeep workspace.
//!
//! This crate provides the foundational types that are shared between the core
//! `storekeep` crate and the adapter implementations (`storekeep-postgres`,
//! `storekeep-mongodb`, `storekeep-memory`). Keeping them in a separate crate
//! lets every adapter depend on the contracts without depending on the core.
//!
//! # Overview
//!
//! This crate contains:
//! - Adapter traits: [`StoreRepository`] (relational data) and
//!   [`ManagerDirectory`] (manager documents)
//! - Domain types: [`StoreId`], [`ManagerId`], [`ProductId`], [`Location`],
//!   [`ManagerName`], [`Salary`] and the entities built from them
//! - Errors: [`QueryError`], [`ValidationError`], [`AdminError`], [`Operation`]

mod directory;
mod domain;
mod errors;
mod repository;
mod validation;

pub use directory::{ManagerDirectory, ManagerFilter};
pub use domain::{
    Location, Manager, ManagerId, ManagerName, NewManager, ProductId, ProductListing, Salary,
    Store, StoreId, StoreProposal,
};
pub use errors::{AdminError, Field, Operation, QueryError, ValidationError};
pub use repository::StoreRepository;
