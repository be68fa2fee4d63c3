//! Person repository: intention-revealing operations over a collection.
//!
//! # Responsibility
//! - Translate application intents into single collection calls.
//! - Classify collection failures into repository errors.
//!
//! # Invariants
//! - Every call returns exactly one outcome; failures are logged and returned.
//! - No match is `Ok(None)` or an empty list, never an error.
//! - The repository holds no mutable state and performs no retries.
//!
//! `append_food_and_save` reads, modifies and writes in two collection
//! calls without isolation. A concurrent writer between the read and the
//! write loses its change; callers that care must serialize.

use crate::collection::{
    CollectionError, DeleteSummary, FindOptions, PersonCollection, PersonField, PersonFilter,
    PersonPatch, ReturnDocument, SortSpec,
};
use crate::model::person::{NewPerson, Person, PersonId, PersonValidationError};
use log::{error, info, warn};
use std::time::Instant;
use thiserror::Error;

pub const SAMPLE_NAME: &str = "Gatto Grasso";
pub const SAMPLE_AGE: i64 = 10;
pub const SAMPLE_FAVORITE_FOODS: [&str; 2] = ["Skifo", "Sporko"];
/// Food appended by `append_food_and_save`.
pub const FOOD_TO_ADD: &str = "hamburger";
/// Age written by `update_age_by_name`.
pub const AGE_TO_SET: i64 = 20;
pub const NAME_TO_REMOVE: &str = "Mary";
pub const FOOD_TO_SEARCH: &str = "burrito";
pub const QUERY_CHAIN_LIMIT: u32 = 2;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] PersonValidationError),
    #[error("failed to persist person: {0}")]
    Persist(#[source] CollectionError),
    #[error("failed to query people: {0}")]
    Query(#[source] CollectionError),
    #[error("person not found: {0}")]
    NotFound(PersonId),
    #[error("person backend unavailable: {0}")]
    BackendUnavailable(#[source] CollectionError),
}

impl RepoError {
    fn from_write(err: CollectionError) -> Self {
        match err {
            CollectionError::Validation(err) => Self::Validation(err),
            err if err.is_unavailable() => Self::BackendUnavailable(err),
            err => Self::Persist(err),
        }
    }

    fn from_read(err: CollectionError) -> Self {
        match err {
            CollectionError::Validation(err) => Self::Validation(err),
            err if err.is_unavailable() => Self::BackendUnavailable(err),
            err => Self::Query(err),
        }
    }

    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Persist(_) => "persist_failed",
            Self::Query(_) => "query_failed",
            Self::NotFound(_) => "not_found",
            Self::BackendUnavailable(_) => "backend_unavailable",
        }
    }
}

/// Returns the fixed sample person used by `create_one`.
pub fn sample_person() -> NewPerson {
    NewPerson::new(SAMPLE_NAME)
        .with_age(SAMPLE_AGE)
        .with_favorite_foods(SAMPLE_FAVORITE_FOODS)
}

/// Repository over an injected person collection.
pub struct PersonRepository<C: PersonCollection> {
    collection: C,
}

impl<C: PersonCollection> PersonRepository<C> {
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    /// Persists the fixed sample person.
    pub fn create_one(&self) -> RepoResult<Person> {
        self.save(&sample_person())
    }

    /// Persists one person and returns it with its assigned id.
    pub fn save(&self, person: &NewPerson) -> RepoResult<Person> {
        let started_at = Instant::now();
        person.validate().map_err(|err| log_failure("person_save", err.into()))?;

        let saved = self
            .collection
            .insert_one(person)
            .map_err(|err| log_failure("person_save", RepoError::from_write(err)))?;

        info!(
            "event=person_save module=repo status=ok person_id={} duration_ms={}",
            saved.id,
            started_at.elapsed().as_millis()
        );
        Ok(saved)
    }

    /// Persists all people or none; one error covers any failure.
    pub fn create_many(&self, people: &[NewPerson]) -> RepoResult<Vec<Person>> {
        let started_at = Instant::now();
        for person in people {
            person
                .validate()
                .map_err(|err| log_failure("person_create_many", err.into()))?;
        }

        let saved = self
            .collection
            .insert_many(people)
            .map_err(|err| log_failure("person_create_many", RepoError::from_write(err)))?;

        info!(
            "event=person_create_many module=repo status=ok count={} duration_ms={}",
            saved.len(),
            started_at.elapsed().as_millis()
        );
        Ok(saved)
    }

    /// Returns every person whose name equals `name` exactly.
    pub fn find_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        let people = self
            .collection
            .find(&PersonFilter::by_name(name), &FindOptions::default())
            .map_err(|err| log_failure("person_find_by_name", RepoError::from_read(err)))?;

        info!(
            "event=person_find_by_name module=repo status=ok count={}",
            people.len()
        );
        Ok(people)
    }

    /// Returns the first person that lists `food` among favorite foods.
    pub fn find_one_by_favorite_food(&self, food: &str) -> RepoResult<Option<Person>> {
        let person = self
            .collection
            .find_one(&PersonFilter::by_favorite_food(food))
            .map_err(|err| {
                log_failure("person_find_one_by_food", RepoError::from_read(err))
            })?;

        info!(
            "event=person_find_one_by_food module=repo status=ok found={}",
            person.is_some()
        );
        Ok(person)
    }

    pub fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let person = self
            .collection
            .find_by_id(id)
            .map_err(|err| log_failure("person_find_by_id", RepoError::from_read(err)))?;

        info!(
            "event=person_find_by_id module=repo status=ok person_id={} found={}",
            id,
            person.is_some()
        );
        Ok(person)
    }

    /// Loads a person, appends `FOOD_TO_ADD` and writes the document back.
    ///
    /// # Errors
    /// - `NotFound` when `id` has no document, or it vanished before the write.
    /// - A failed read never reaches the write step.
    pub fn append_food_and_save(&self, id: PersonId) -> RepoResult<Person> {
        let started_at = Instant::now();
        let mut person = self
            .collection
            .find_by_id(id)
            .map_err(|err| log_failure("person_append_food", RepoError::from_read(err)))?
            .ok_or_else(|| log_failure("person_append_food", RepoError::NotFound(id)))?;

        person.push_favorite_food(FOOD_TO_ADD);

        let saved = self
            .collection
            .replace_one(&person)
            .map_err(|err| log_failure("person_append_food", RepoError::from_write(err)))?
            .ok_or_else(|| log_failure("person_append_food", RepoError::NotFound(id)))?;

        info!(
            "event=person_append_food module=repo status=ok person_id={} food_count={} duration_ms={}",
            id,
            saved.favorite_foods.len(),
            started_at.elapsed().as_millis()
        );
        Ok(saved)
    }

    /// Sets `age` to `AGE_TO_SET` on the first person named `name`.
    ///
    /// Returns the post-update document, or `None` when nobody matched.
    pub fn update_age_by_name(&self, name: &str) -> RepoResult<Option<Person>> {
        let updated = self
            .collection
            .find_one_and_update(
                &PersonFilter::by_name(name),
                &PersonPatch::set_age(AGE_TO_SET),
                ReturnDocument::After,
            )
            .map_err(|err| log_failure("person_update_age", RepoError::from_write(err)))?;

        info!(
            "event=person_update_age module=repo status=ok found={}",
            updated.is_some()
        );
        Ok(updated)
    }

    /// Removes one person and returns the removed document.
    ///
    /// Deleting an unknown id is `Ok(None)`.
    pub fn delete_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let removed = self
            .collection
            .delete_one(id)
            .map_err(|err| log_failure("person_delete_by_id", RepoError::from_write(err)))?;

        info!(
            "event=person_delete_by_id module=repo status=ok person_id={} removed={}",
            id,
            removed.is_some()
        );
        Ok(removed)
    }

    /// Removes every person named `name`.
    pub fn delete_many_by_name(&self, name: &str) -> RepoResult<DeleteSummary> {
        let summary = self
            .collection
            .delete_many(&PersonFilter::by_name(name))
            .map_err(|err| log_failure("person_delete_many", RepoError::from_write(err)))?;

        info!(
            "event=person_delete_many module=repo status=ok deleted_count={}",
            summary.deleted_count
        );
        Ok(summary)
    }

    /// Chained query: people who like `food`, by name ascending, at most
    /// `QUERY_CHAIN_LIMIT`, without `age`.
    pub fn query_favorite_food_sorted_limited(&self, food: &str) -> RepoResult<Vec<Person>> {
        let options = FindOptions::default()
            .sort(SortSpec::ascending(PersonField::Name))
            .limit(QUERY_CHAIN_LIMIT)
            .exclude(PersonField::Age);

        let people = self
            .collection
            .find(&PersonFilter::by_favorite_food(food), &options)
            .map_err(|err| log_failure("person_query_chain", RepoError::from_read(err)))?;

        info!(
            "event=person_query_chain module=repo status=ok count={}",
            people.len()
        );
        Ok(people)
    }
}

fn log_failure(event: &str, err: RepoError) -> RepoError {
    match &err {
        RepoError::Validation(_) | RepoError::NotFound(_) => warn!(
            "event={event} module=repo status=error error_code={} error={err}",
            err.code()
        ),
        _ => error!(
            "event={event} module=repo status=error error_code={} error={err}",
            err.code()
        ),
    }
    err
}
