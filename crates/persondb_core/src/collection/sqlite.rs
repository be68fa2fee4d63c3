//! SQLite-backed person collection.
//!
//! # Responsibility
//! - Evaluate filters, sorting, pagination and projection in SQL.
//! - Keep favorite food order in the `person_foods` child table.
//!
//! # Invariants
//! - Multi-statement writes run inside a single transaction.
//! - Ties in any ordering fall back to insertion order (`seq`).
//! - Rows that fail validation on read are reported, not repaired.

use super::{
    CollectionError, CollectionResult, DeleteSummary, FindOptions, PersonCollection, PersonField,
    PersonFilter, PersonPatch, ReturnDocument, SortDirection,
};
use crate::db::migrations::latest_version;
use crate::db::{schema_version, table_exists, DbError};
use crate::model::person::{NewPerson, Person, PersonId};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const PERSON_SELECT_SQL: &str = "SELECT id, name, age FROM people";
const REQUIRED_TABLES: [&str; 2] = ["people", "person_foods"];

/// Person collection over a borrowed, migrated SQLite connection.
pub struct SqlitePersonCollection<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonCollection<'conn> {
    /// Wraps a connection after checking it carries the current schema.
    pub fn try_new(conn: &'conn Connection) -> CollectionResult<Self> {
        let expected_version = latest_version();
        let actual_version = schema_version(conn)?;
        if actual_version != expected_version {
            return Err(DbError::Uninitialized {
                expected_version,
                actual_version,
            }
            .into());
        }

        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(DbError::MissingTable(table).into());
            }
        }

        Ok(Self { conn })
    }
}

impl PersonCollection for SqlitePersonCollection<'_> {
    fn insert_one(&self, person: &NewPerson) -> CollectionResult<Person> {
        person.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let inserted = insert_person(&tx, person)?;
        tx.commit()?;

        Ok(inserted)
    }

    fn insert_many(&self, people: &[NewPerson]) -> CollectionResult<Vec<Person>> {
        for person in people {
            person.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = Vec::with_capacity(people.len());
        for person in people {
            inserted.push(insert_person(&tx, person)?);
        }
        tx.commit()?;

        debug!(
            "event=collection_insert_many module=collection status=ok count={}",
            inserted.len()
        );
        Ok(inserted)
    }

    fn find(&self, filter: &PersonFilter, options: &FindOptions) -> CollectionResult<Vec<Person>> {
        options.validate()?;

        let (where_sql, mut bind_values) = build_where(filter);
        let mut sql = format!("{PERSON_SELECT_SQL}{where_sql}");

        sql.push_str(" ORDER BY ");
        if let Some(spec) = options.sort {
            let column = match spec.field {
                PersonField::Name => "name",
                PersonField::Age => "age",
                PersonField::FavoriteFoods => {
                    return Err(CollectionError::InvalidQuery(
                        "sorting by `favoriteFoods` is not supported".to_string(),
                    ));
                }
            };
            let direction = match spec.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            sql.push_str(&format!("{column} {direction}, "));
        }
        sql.push_str("seq ASC");

        // A zero limit means "no limit", as in document stores.
        match options.limit.filter(|limit| *limit > 0) {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                if options.skip > 0 {
                    sql.push_str(" OFFSET ?");
                    bind_values.push(Value::Integer(i64::from(options.skip)));
                }
            }
            None if options.skip > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(i64::from(options.skip)));
            }
            None => {}
        }

        let load_foods = !options.excludes(PersonField::FavoriteFoods);
        let people = query_people(self.conn, &sql, bind_values, load_foods)?;
        Ok(people
            .into_iter()
            .map(|person| options.project(person))
            .collect())
    }

    fn find_one(&self, filter: &PersonFilter) -> CollectionResult<Option<Person>> {
        first_match(self.conn, filter)
    }

    fn find_by_id(&self, id: PersonId) -> CollectionResult<Option<Person>> {
        load_person(self.conn, id)
    }

    fn replace_one(&self, person: &Person) -> CollectionResult<Option<Person>> {
        person.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE people SET name = ?2, age = ?3 WHERE id = ?1;",
            params![person.id.to_string(), person.name.as_str(), person.age],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        write_foods(&tx, person.id, &person.favorite_foods)?;
        tx.commit()?;

        Ok(Some(person.clone()))
    }

    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        patch: &PersonPatch,
        return_document: ReturnDocument,
    ) -> CollectionResult<Option<Person>> {
        patch.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let Some(before) = first_match(&tx, filter)? else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(before));
        }

        let mut after = before.clone();
        patch.apply(&mut after);
        if patch.name.is_some() || patch.age.is_some() {
            tx.execute(
                "UPDATE people SET name = ?2, age = ?3 WHERE id = ?1;",
                params![after.id.to_string(), after.name.as_str(), after.age],
            )?;
        }
        if !patch.push_favorite_foods.is_empty() {
            write_foods(&tx, after.id, &after.favorite_foods)?;
        }
        tx.commit()?;

        Ok(Some(match return_document {
            ReturnDocument::Before => before,
            ReturnDocument::After => after,
        }))
    }

    fn delete_one(&self, id: PersonId) -> CollectionResult<Option<Person>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(existing) = load_person(&tx, id)? else {
            return Ok(None);
        };

        let id_text = id.to_string();
        tx.execute(
            "DELETE FROM person_foods WHERE person_id = ?1;",
            [id_text.as_str()],
        )?;
        tx.execute("DELETE FROM people WHERE id = ?1;", [id_text.as_str()])?;
        tx.commit()?;

        Ok(Some(existing))
    }

    fn delete_many(&self, filter: &PersonFilter) -> CollectionResult<DeleteSummary> {
        let (where_sql, bind_values) = build_where(filter);

        let tx = self.conn.unchecked_transaction()?;
        // Resolve matches first: the food predicate reads `person_foods`.
        let ids = {
            let mut stmt = tx.prepare(&format!("SELECT id FROM people{where_sql};"))?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get::<_, String>(0)?);
            }
            ids
        };

        let mut deleted: u64 = 0;
        for id in &ids {
            tx.execute("DELETE FROM person_foods WHERE person_id = ?1;", [id.as_str()])?;
            deleted += tx.execute("DELETE FROM people WHERE id = ?1;", [id.as_str()])? as u64;
        }
        tx.commit()?;

        debug!(
            "event=collection_delete_many module=collection status=ok deleted_count={deleted}"
        );
        Ok(DeleteSummary {
            deleted_count: deleted,
        })
    }
}

fn build_where(filter: &PersonFilter) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE 1 = 1");
    let mut bind_values = Vec::new();

    if let Some(name) = &filter.name {
        sql.push_str(" AND name = ?");
        bind_values.push(Value::Text(name.clone()));
    }

    if let Some(food) = &filter.favorite_food {
        sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM person_foods pf
                WHERE pf.person_id = people.id
                  AND pf.food = ?
            )",
        );
        bind_values.push(Value::Text(food.clone()));
    }

    (sql, bind_values)
}

fn first_match(conn: &Connection, filter: &PersonFilter) -> CollectionResult<Option<Person>> {
    let (where_sql, bind_values) = build_where(filter);
    let sql = format!("{PERSON_SELECT_SQL}{where_sql} ORDER BY seq ASC LIMIT 1");
    Ok(query_people(conn, &sql, bind_values, true)?.into_iter().next())
}

fn load_person(conn: &Connection, id: PersonId) -> CollectionResult<Option<Person>> {
    let sql = format!("{PERSON_SELECT_SQL} WHERE id = ?");
    let bind_values = vec![Value::Text(id.to_string())];
    Ok(query_people(conn, &sql, bind_values, true)?.into_iter().next())
}

fn query_people(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
    load_foods: bool,
) -> CollectionResult<Vec<Person>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut people = Vec::new();

    while let Some(row) = rows.next()? {
        let mut person = parse_person_row(row)?;
        if load_foods {
            person.favorite_foods = load_foods_for(conn, person.id)?;
        }
        people.push(person);
    }

    Ok(people)
}

fn parse_person_row(row: &Row<'_>) -> CollectionResult<Person> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        CollectionError::InvalidData(format!("invalid uuid value `{id_text}` in people.id"))
    })?;

    let person = Person {
        id,
        name: row.get("name")?,
        age: row.get("age")?,
        favorite_foods: Vec::new(),
    };
    person
        .validate()
        .map_err(|err| CollectionError::InvalidData(format!("row {id_text}: {err}")))?;
    Ok(person)
}

fn load_foods_for(conn: &Connection, id: PersonId) -> CollectionResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT food
         FROM person_foods
         WHERE person_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut foods = Vec::new();
    while let Some(row) = rows.next()? {
        foods.push(row.get(0)?);
    }
    Ok(foods)
}

fn insert_person(conn: &Connection, person: &NewPerson) -> CollectionResult<Person> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO people (id, seq, name, age)
         VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM people), ?2, ?3);",
        params![id.to_string(), person.name.as_str(), person.age],
    )?;
    write_foods(conn, id, &person.favorite_foods)?;
    Ok(person.clone().into_person(id))
}

fn write_foods(conn: &Connection, id: PersonId, foods: &[String]) -> CollectionResult<()> {
    let id_text = id.to_string();
    conn.execute(
        "DELETE FROM person_foods WHERE person_id = ?1;",
        [id_text.as_str()],
    )?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO person_foods (person_id, position, food) VALUES (?1, ?2, ?3);",
    )?;
    for (position, food) in foods.iter().enumerate() {
        stmt.execute(params![id_text.as_str(), position as i64, food.as_str()])?;
    }
    Ok(())
}
