//! In-process predicate evaluation.
//!
//! Evaluation is three-valued: a null or missing field, or operands from
//! different value families, yield `None` (unknown). A filter keeps an element
//! only when its predicate evaluates to `Some(true)`, which matches how native
//! engines treat nulls and keeps negation exact: `negate(p)` evaluates to the
//! logical complement of `p` on every input, unknown staying unknown.

use crate::{
    predicate::{
        ComparisonOp, FieldPredicate, Inclusion, LogicalKind, Operand, Predicate, PredicateKind,
    },
    traits::Entity,
    value::Value,
};
use std::cmp::Ordering;

impl Predicate {
    /// Three-valued evaluation against one entity.
    #[must_use]
    pub fn evaluate<E: Entity>(&self, entity: &E) -> Option<bool> {
        match self {
            Self::Field(field) => field.evaluate(entity),
            Self::Combined(combined) => {
                let results = combined
                    .children()
                    .iter()
                    .map(|child| child.evaluate(entity));

                match combined.kind() {
                    LogicalKind::And => kleene_and(results),
                    LogicalKind::Or => kleene_or(results),
                }
            }
        }
    }

    /// True only when the predicate definitely holds.
    #[must_use]
    pub fn test<E: Entity>(&self, entity: &E) -> bool {
        self.evaluate(entity) == Some(true)
    }
}

impl FieldPredicate {
    #[must_use]
    pub fn evaluate<E: Entity>(&self, entity: &E) -> Option<bool> {
        let actual = entity.field_value(self.field()).unwrap_or(Value::Null);

        self.evaluate_value(&actual)
    }

    /// Evaluate against an already extracted field value.
    #[must_use]
    pub fn evaluate_value(&self, actual: &Value) -> Option<bool> {
        match (self.kind(), self.operand()) {
            (kind, Operand::Value(operand)) => {
                let op = kind.comparison_op()?;
                eval_comparison(actual, op, operand)
            }
            (kind, Operand::Range {
                start,
                end,
                inclusion,
            }) => {
                let inside = eval_range(actual, start, end, *inclusion);
                if kind == PredicateKind::NotBetween {
                    inside.map(|held| !held)
                } else {
                    inside
                }
            }
            (kind, Operand::Set(values)) => {
                let member = eval_membership(actual, values);
                if kind == PredicateKind::NotIn {
                    member.map(|held| !held)
                } else {
                    member
                }
            }
        }
    }
}

pub(crate) fn eval_comparison(actual: &Value, op: ComparisonOp, operand: &Value) -> Option<bool> {
    actual.compare(operand).map(|ordering| op.holds(ordering))
}

pub(crate) fn eval_range(
    actual: &Value,
    start: &Value,
    end: &Value,
    inclusion: Inclusion,
) -> Option<bool> {
    let lower = actual.compare(start)?;
    let upper = actual.compare(end)?;

    let above_start = if inclusion.start_inclusive() {
        lower != Ordering::Less
    } else {
        lower == Ordering::Greater
    };
    let below_end = if inclusion.end_inclusive() {
        upper != Ordering::Greater
    } else {
        upper == Ordering::Less
    };

    Some(above_start && below_end)
}

pub(crate) fn eval_membership(actual: &Value, values: &[Value]) -> Option<bool> {
    if actual.is_null() {
        return None;
    }

    let mut unknown = false;
    for candidate in values {
        match actual.compare(candidate) {
            Some(Ordering::Equal) => return Some(true),
            Some(_) => {}
            None => unknown = true,
        }
    }

    if unknown { None } else { Some(false) }
}

pub(crate) fn kleene_and(results: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for result in results {
        match result {
            Some(false) => return Some(false),
            Some(true) => {}
            None => unknown = true,
        }
    }

    if unknown { None } else { Some(true) }
}

pub(crate) fn kleene_or(results: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for result in results {
        match result {
            Some(true) => return Some(true),
            Some(false) => {}
            None => unknown = true,
        }
    }

    if unknown { None } else { Some(false) }
}
