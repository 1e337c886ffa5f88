use crate::{
    order::{FieldComparator, FieldOrdering, NullOrder},
    predicate::{ComparisonOp, FieldPredicate, Inclusion, Predicate},
    traits::Entity,
    value::FieldValue,
};
use std::{fmt, marker::PhantomData};

///
/// Field
///
/// Typed reference to one field of entity `E` holding values of type `V`.
/// Builds field predicates and comparators; no schema lookup occurs here.
///

pub struct Field<E, V> {
    name: &'static str,
    _marker: PhantomData<fn(&E) -> V>,
}

impl<E, V> Field<E, V> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<E, V> Clone for Field<E, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, V> Copy for Field<E, V> {}

impl<E, V> fmt::Debug for Field<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

impl<E: Entity, V: FieldValue> Field<E, V> {
    /// Field equals `value`.
    #[must_use]
    pub fn equal(&self, value: impl Into<V>) -> Predicate {
        self.compare(ComparisonOp::Eq, value.into())
    }

    /// Field differs from `value`.
    #[must_use]
    pub fn not_equal(&self, value: impl Into<V>) -> Predicate {
        self.compare(ComparisonOp::Ne, value.into())
    }

    #[must_use]
    pub fn greater_than(&self, value: impl Into<V>) -> Predicate {
        self.compare(ComparisonOp::Gt, value.into())
    }

    #[must_use]
    pub fn greater_or_equal(&self, value: impl Into<V>) -> Predicate {
        self.compare(ComparisonOp::Ge, value.into())
    }

    #[must_use]
    pub fn less_than(&self, value: impl Into<V>) -> Predicate {
        self.compare(ComparisonOp::Lt, value.into())
    }

    #[must_use]
    pub fn less_or_equal(&self, value: impl Into<V>) -> Predicate {
        self.compare(ComparisonOp::Le, value.into())
    }

    /// Field lies in `[start, end)`.
    #[must_use]
    pub fn between(&self, start: impl Into<V>, end: impl Into<V>) -> Predicate {
        self.between_with(start, end, Inclusion::StartInclusiveEndExclusive)
    }

    #[must_use]
    pub fn between_with(
        &self,
        start: impl Into<V>,
        end: impl Into<V>,
        inclusion: Inclusion,
    ) -> Predicate {
        self.range(false, start.into(), end.into(), inclusion)
    }

    /// Field lies outside `[start, end)`.
    #[must_use]
    pub fn not_between(&self, start: impl Into<V>, end: impl Into<V>) -> Predicate {
        self.not_between_with(start, end, Inclusion::StartInclusiveEndExclusive)
    }

    #[must_use]
    pub fn not_between_with(
        &self,
        start: impl Into<V>,
        end: impl Into<V>,
        inclusion: Inclusion,
    ) -> Predicate {
        self.range(true, start.into(), end.into(), inclusion)
    }

    /// Membership test against a fixed list; list order is preserved.
    #[must_use]
    pub fn in_values<I>(&self, values: I) -> Predicate
    where
        I: IntoIterator,
        I::Item: Into<V>,
    {
        self.set(false, values)
    }

    #[must_use]
    pub fn not_in<I>(&self, values: I) -> Predicate
    where
        I: IntoIterator,
        I::Item: Into<V>,
    {
        self.set(true, values)
    }

    /// Ascending comparator, nulls last.
    #[must_use]
    pub fn comparator(&self) -> FieldComparator {
        FieldComparator::new(FieldOrdering::asc(self.name))
    }

    /// Ascending comparator, nulls first.
    #[must_use]
    pub fn comparator_nulls_first(&self) -> FieldComparator {
        FieldComparator::new(FieldOrdering::asc(self.name).nulls(NullOrder::First))
    }

    /// Descending comparator, nulls last.
    #[must_use]
    pub fn reversed(&self) -> FieldComparator {
        FieldComparator::new(FieldOrdering::desc(self.name))
    }

    fn compare(&self, op: ComparisonOp, value: V) -> Predicate {
        Predicate::Field(FieldPredicate::compare(self.name, op, value.to_value()))
    }

    fn range(&self, negated: bool, start: V, end: V, inclusion: Inclusion) -> Predicate {
        Predicate::Field(FieldPredicate::range(
            self.name,
            negated,
            start.to_value(),
            end.to_value(),
            inclusion,
        ))
    }

    fn set<I>(&self, negated: bool, values: I) -> Predicate
    where
        I: IntoIterator,
        I::Item: Into<V>,
    {
        let values = values
            .into_iter()
            .map(|value| value.into().to_value())
            .collect();

        Predicate::Field(FieldPredicate::set(self.name, negated, values))
    }
}
