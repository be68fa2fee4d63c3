//! Domain model for the person collection.
//!
//! # Responsibility
//! - Define the document shapes shared by collections and the repository.
//!
//! # Invariants
//! - Every stored document is identified by a collection-assigned `PersonId`.
//! - Deletion is a hard delete; there are no tombstones or versions.

pub mod person;
