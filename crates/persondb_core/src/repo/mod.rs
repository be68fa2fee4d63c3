//! Repository layer over the person collection.
//!
//! # Responsibility
//! - Offer use-case level operations without exposing query construction.
//! - Surface collection failures as semantic repository errors.
//!
//! # Invariants
//! - The collection is injected; there is no process-wide database handle.

pub mod person_repo;
