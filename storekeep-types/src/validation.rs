//! Shared validation predicates for domain types.
//!
//! This module contains validation functions used by nutype-based domain types
//! across the storekeep crates.

/// Validation predicate: reject control characters.
///
/// Identifiers and display text end up in HTML pages, redirect URLs and log
/// lines, none of which can carry raw control characters.
pub(crate) fn no_control_characters(s: &str) -> bool {
    !s.chars().any(char::is_control)
}
