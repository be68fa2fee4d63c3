//! Typed person repository over a document collection.
//! The repository is storage-agnostic; SQLite ships as the bundled backend.

pub mod collection;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use collection::{
    CollectionError, CollectionResult, DeleteSummary, FindOptions, PersonCollection, PersonField,
    PersonFilter, PersonPatch, ReturnDocument, SortDirection, SortSpec, SqlitePersonCollection,
};
pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::person::{NewPerson, Person, PersonId, PersonValidationError};
pub use repo::person_repo::{sample_person, PersonRepository, RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
