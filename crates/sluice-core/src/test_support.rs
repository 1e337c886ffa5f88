//! Shared fixtures for unit tests.

use crate::{field::Field, traits::Entity, value::Value};

///
/// Person
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct Person {
    pub id: u64,
    pub name: String,
    pub age: Option<i64>,
}

impl Entity for Person {
    const ENTITY_NAME: &'static str = "Person";

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Uint(self.id)),
            "name" => Some(Value::Text(self.name.clone())),
            "age" => Some(self.age.map_or(Value::Null, Value::Int)),
            _ => None,
        }
    }
}

pub(crate) const ID: Field<Person, u64> = Field::new("id");
pub(crate) const NAME: Field<Person, String> = Field::new("name");
pub(crate) const AGE: Field<Person, i64> = Field::new("age");

pub(crate) fn person(id: u64, name: &str, age: Option<i64>) -> Person {
    Person {
        id,
        name: name.to_string(),
        age,
    }
}

/// Eight people: five named "A" older than 18, three that are not.
pub(crate) fn people() -> Vec<Person> {
    vec![
        person(1, "A", Some(30)),
        person(2, "B", Some(40)),
        person(3, "A", Some(19)),
        person(4, "A", Some(12)),
        person(5, "A", Some(55)),
        person(6, "A", Some(21)),
        person(7, "C", None),
        person(8, "A", Some(67)),
    ]
}
