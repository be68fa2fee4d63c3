use persondb_core::{NewPerson, Person, PersonValidationError};
use uuid::Uuid;

#[test]
fn new_person_defaults_to_no_age_and_no_foods() {
    let draft = NewPerson::new("Mary");

    assert_eq!(draft.name, "Mary");
    assert_eq!(draft.age, None);
    assert!(draft.favorite_foods.is_empty());
    assert!(draft.validate().is_ok());
}

#[test]
fn missing_name_fails_validation() {
    let err = NewPerson::new("").with_age(3).validate().unwrap_err();
    assert_eq!(err, PersonValidationError::MissingName);
}

#[test]
fn person_serialization_uses_document_field_names() {
    let id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
    let person = NewPerson::new("Gatto Grasso")
        .with_age(10)
        .with_favorite_foods(["Skifo", "Sporko"])
        .into_person(id);

    let json = serde_json::to_value(&person).unwrap();
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["name"], "Gatto Grasso");
    assert_eq!(json["age"], 10);
    assert_eq!(json["favoriteFoods"], serde_json::json!(["Skifo", "Sporko"]));

    let decoded: Person = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, person);
}

#[test]
fn absent_age_is_left_out_of_json() {
    let person = NewPerson::new("Ada").into_person(Uuid::new_v4());
    let json = serde_json::to_value(&person).unwrap();
    assert!(json.get("age").is_none());
}

#[test]
fn deserialize_rejects_empty_name() {
    let value = serde_json::json!({
        "name": "",
        "age": 4,
        "favoriteFoods": ["burrito"]
    });

    let err = serde_json::from_value::<NewPerson>(value).unwrap_err();
    assert!(
        err.to_string().contains("`name` is required"),
        "unexpected error: {err}"
    );
}

#[test]
fn deserialize_fills_missing_optional_fields() {
    let draft: NewPerson = serde_json::from_value(serde_json::json!({ "name": "Mary" })).unwrap();
    assert_eq!(draft, NewPerson::new("Mary"));
}
