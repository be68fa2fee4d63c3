//! Document collection contract for person storage.
//!
//! # Responsibility
//! - Describe the storage operations the repository is allowed to use.
//! - Provide the predicate, patch and query-option vocabulary.
//!
//! # Invariants
//! - Write paths validate documents before touching storage.
//! - "No match" is `None` or an empty result, never an error.
//! - `insert_many` is all-or-nothing.

use crate::db::DbError;
use crate::model::person::{NewPerson, Person, PersonId, PersonValidationError};
use thiserror::Error;

pub mod sqlite;

pub use sqlite::SqlitePersonCollection;

pub type CollectionResult<T> = Result<T, CollectionError>;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error(transparent)]
    Validation(#[from] PersonValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid persisted person data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for CollectionError {
    fn from(value: rusqlite::Error) -> Self {
        if is_unavailable(&value) {
            return Self::Unavailable(value.to_string());
        }
        Self::Db(DbError::Sqlite(value))
    }
}

impl CollectionError {
    /// Returns whether the failure is a connectivity problem rather than a
    /// rejected request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Db(DbError::Sqlite(err)) => is_unavailable(err),
            _ => false,
        }
    }
}

fn is_unavailable(err: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode;

    matches!(
        err.sqlite_error_code(),
        Some(
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::NotADatabase
        )
    )
}

/// Document fields addressable by sort and projection options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonField {
    Name,
    Age,
    FavoriteFoods,
}

impl PersonField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Age => "age",
            Self::FavoriteFoods => "favoriteFoods",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: PersonField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: PersonField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: PersonField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }
}

/// Conjunctive predicate over person documents.
///
/// `name` is an exact match; `favorite_food` matches when the value appears
/// anywhere in `favorite_foods`. The default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    pub name: Option<String>,
    pub favorite_food: Option<String>,
}

impl PersonFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn by_favorite_food(food: impl Into<String>) -> Self {
        Self {
            favorite_food: Some(food.into()),
            ..Self::default()
        }
    }
}

/// Sort, pagination and projection options for `find`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<SortSpec>,
    pub skip: u32,
    pub limit: Option<u32>,
    /// Fields left out of every result. `Name` cannot be excluded.
    pub exclude: Vec<PersonField>,
}

impl FindOptions {
    pub fn sort(mut self, spec: SortSpec) -> Self {
        self.sort = Some(spec);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn exclude(mut self, field: PersonField) -> Self {
        if !self.exclude.contains(&field) {
            self.exclude.push(field);
        }
        self
    }

    pub fn excludes(&self, field: PersonField) -> bool {
        self.exclude.contains(&field)
    }

    /// Rejects option combinations no backend can honor.
    pub fn validate(&self) -> CollectionResult<()> {
        if self.excludes(PersonField::Name) {
            return Err(CollectionError::InvalidQuery(
                "`name` is required and cannot be excluded".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies the projection to an already loaded document.
    pub fn project(&self, mut person: Person) -> Person {
        if self.excludes(PersonField::Age) {
            person.age = None;
        }
        if self.excludes(PersonField::FavoriteFoods) {
            person.favorite_foods.clear();
        }
        person
    }
}

/// Field updates applied by `find_one_and_update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    /// Appended to the end of `favorite_foods`, in order.
    pub push_favorite_foods: Vec<String>,
}

impl PersonPatch {
    pub fn set_age(age: i64) -> Self {
        Self {
            age: Some(age),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.push_favorite_foods.is_empty()
    }

    pub fn validate(&self) -> Result<(), PersonValidationError> {
        match self.name.as_deref() {
            Some(name) => crate::model::person::validate_name(name),
            None => Ok(()),
        }
    }

    /// Applies the patch to an in-memory document.
    pub fn apply(&self, person: &mut Person) {
        if let Some(name) = &self.name {
            person.name = name.clone();
        }
        if let Some(age) = self.age {
            person.age = Some(age);
        }
        person
            .favorite_foods
            .extend(self.push_favorite_foods.iter().cloned());
    }
}

/// Which document state `find_one_and_update` hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnDocument {
    Before,
    #[default]
    After,
}

/// Outcome of a bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_count: u64,
}

/// Storage contract for the person collection.
///
/// Implementations own query evaluation; the repository only composes calls.
pub trait PersonCollection {
    fn insert_one(&self, person: &NewPerson) -> CollectionResult<Person>;
    fn insert_many(&self, people: &[NewPerson]) -> CollectionResult<Vec<Person>>;
    fn find(&self, filter: &PersonFilter, options: &FindOptions) -> CollectionResult<Vec<Person>>;
    /// First match in insertion order.
    fn find_one(&self, filter: &PersonFilter) -> CollectionResult<Option<Person>>;
    fn find_by_id(&self, id: PersonId) -> CollectionResult<Option<Person>>;
    /// Replaces the stored document with the same id; `None` if it is gone.
    fn replace_one(&self, person: &Person) -> CollectionResult<Option<Person>>;
    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        patch: &PersonPatch,
        return_document: ReturnDocument,
    ) -> CollectionResult<Option<Person>>;
    /// Returns the removed document, or `None` when nothing matched.
    fn delete_one(&self, id: PersonId) -> CollectionResult<Option<Person>>;
    fn delete_many(&self, filter: &PersonFilter) -> CollectionResult<DeleteSummary>;
}

impl<C: PersonCollection + ?Sized> PersonCollection for &C {
    fn insert_one(&self, person: &NewPerson) -> CollectionResult<Person> {
        (**self).insert_one(person)
    }

    fn insert_many(&self, people: &[NewPerson]) -> CollectionResult<Vec<Person>> {
        (**self).insert_many(people)
    }

    fn find(&self, filter: &PersonFilter, options: &FindOptions) -> CollectionResult<Vec<Person>> {
        (**self).find(filter, options)
    }

    fn find_one(&self, filter: &PersonFilter) -> CollectionResult<Option<Person>> {
        (**self).find_one(filter)
    }

    fn find_by_id(&self, id: PersonId) -> CollectionResult<Option<Person>> {
        (**self).find_by_id(id)
    }

    fn replace_one(&self, person: &Person) -> CollectionResult<Option<Person>> {
        (**self).replace_one(person)
    }

    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        patch: &PersonPatch,
        return_document: ReturnDocument,
    ) -> CollectionResult<Option<Person>> {
        (**self).find_one_and_update(filter, patch, return_document)
    }

    fn delete_one(&self, id: PersonId) -> CollectionResult<Option<Person>> {
        (**self).delete_one(id)
    }

    fn delete_many(&self, filter: &PersonFilter) -> CollectionResult<DeleteSummary> {
        (**self).delete_many(filter)
    }
}
