use crate::{error::Error, traits::Entity, value::Value};
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

///
/// NullOrder
///
/// Absolute null placement; not flipped by the sort direction.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum NullOrder {
    First,
    #[default]
    Last,
}

///
/// FieldOrdering
///
/// One sort key: a field, a direction and a null placement.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct FieldOrdering {
    pub field: String,
    pub direction: OrderDirection,
    pub nulls: NullOrder,
}

impl FieldOrdering {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
            nulls: NullOrder::Last,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
            nulls: NullOrder::Last,
        }
    }

    #[must_use]
    pub fn nulls(mut self, nulls: NullOrder) -> Self {
        self.nulls = nulls;
        self
    }

    /// Compare two extracted field values under this sort key.
    #[must_use]
    pub fn compare_values(&self, left: &Value, right: &Value) -> Ordering {
        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => match self.nulls {
                NullOrder::First => Ordering::Less,
                NullOrder::Last => Ordering::Greater,
            },
            (false, true) => match self.nulls {
                NullOrder::First => Ordering::Greater,
                NullOrder::Last => Ordering::Less,
            },
            (false, false) => {
                let ordering = left.canonical_cmp(right);
                match self.direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                }
            }
        }
    }

    #[must_use]
    pub fn compare<E: Entity>(&self, left: &E, right: &E) -> Ordering {
        let left = left.field_value(&self.field).unwrap_or(Value::Null);
        let right = right.field_value(&self.field).unwrap_or(Value::Null);

        self.compare_values(&left, &right)
    }
}

///
/// FieldComparator
///
/// Non-empty, prioritized list of sort keys.
/// Pushable into a native ordering clause and evaluable in process.
///

#[derive(Clone, Debug, Deref, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "Vec<FieldOrdering>")]
pub struct FieldComparator(Vec<FieldOrdering>);

impl FieldComparator {
    #[must_use]
    pub fn new(first: FieldOrdering) -> Self {
        Self(vec![first])
    }

    /// Append a lower-priority sort key.
    #[must_use]
    pub fn then(mut self, next: FieldOrdering) -> Self {
        self.0.push(next);
        self
    }

    /// Append every key of `other` as lower priority.
    #[must_use]
    pub fn then_comparing(mut self, other: Self) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Flip the direction of every key; null placement is kept.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|ordering| FieldOrdering {
                    field: ordering.field.clone(),
                    direction: ordering.direction.reverse(),
                    nulls: ordering.nulls,
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn orderings(&self) -> &[FieldOrdering] {
        &self.0
    }

    #[must_use]
    pub fn compare<E: Entity>(&self, left: &E, right: &E) -> Ordering {
        self.0
            .iter()
            .map(|ordering| ordering.compare(left, right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl TryFrom<Vec<FieldOrdering>> for FieldComparator {
    type Error = Error;

    fn try_from(orderings: Vec<FieldOrdering>) -> Result<Self, Self::Error> {
        if orderings.is_empty() {
            return Err(Error::predicate_shape(
                "field comparator requires at least one ordering",
            ));
        }

        Ok(Self(orderings))
    }
}

impl From<FieldOrdering> for FieldComparator {
    fn from(ordering: FieldOrdering) -> Self {
        Self::new(ordering)
    }
}

///
/// TESTS
///
