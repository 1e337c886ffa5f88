//! In-process application of the operations left after merging.
//!
//! Standard lazy sequence semantics: stages run in pipeline order, `SORTED`
//! is a stable barrier evaluated on first pull, `DISTINCT` keeps the first
//! occurrence.

use crate::{
    error::Error,
    pipeline::{Element, ElementCmp, Elements, Filter, IntermediateOperation, Sort},
    traits::Entity,
};
use std::{cmp::Ordering, rc::Rc};

/// Chain `operations` onto `source`, in order.
///
/// Field predicates and field comparators see the root entity `E`; an element
/// of another type never satisfies a field predicate and compares equal.
pub(crate) fn apply_residual<E: Entity>(
    source: Elements,
    operations: &[IntermediateOperation],
) -> Result<Elements, Error> {
    operations
        .iter()
        .try_fold(source, |elements, operation| {
            apply_operation::<E>(elements, operation.clone())
        })
}

fn apply_operation<E: Entity>(
    elements: Elements,
    operation: IntermediateOperation,
) -> Result<Elements, Error> {
    let elements: Elements = match operation {
        IntermediateOperation::Filter(Filter::Predicate(predicate)) => {
            Box::new(elements.filter(move |element| {
                element
                    .downcast_ref::<E>()
                    .is_some_and(|entity| predicate.test(entity))
            }))
        }
        IntermediateOperation::Filter(Filter::Closure(test)) => {
            Box::new(elements.filter(move |element| test(element)))
        }
        IntermediateOperation::Map(map) => Box::new(elements.map(move |element| map(element))),
        IntermediateOperation::FlatMap(map) => {
            Box::new(elements.flat_map(move |element| map(element)))
        }
        IntermediateOperation::MapToNumeric(kind, _) => {
            return Err(Error::unsupported_operation(kind.operation_name()));
        }
        IntermediateOperation::Distinct(factory) => {
            let mut first_seen = factory();
            Box::new(elements.filter(move |element| first_seen(element)))
        }
        IntermediateOperation::Sorted(sort) => sorted(elements, element_comparator::<E>(sort)),
        IntermediateOperation::Peek(action) => Box::new(elements.map(move |element| {
            (*action.borrow_mut())(&element);
            element
        })),
        IntermediateOperation::Limit(count) => Box::new(elements.take(saturating_usize(count))),
        IntermediateOperation::Skip(count) => Box::new(elements.skip(saturating_usize(count))),
        IntermediateOperation::Unordered => elements,
    };

    Ok(elements)
}

fn element_comparator<E: Entity>(sort: Sort) -> ElementCmp {
    match sort {
        Sort::Natural(cmp) | Sort::Custom(cmp) => cmp,
        Sort::Fields(comparator) => Rc::new(move |left: &Element, right: &Element| {
            match (left.downcast_ref::<E>(), right.downcast_ref::<E>()) {
                (Some(left), Some(right)) => comparator.compare(left, right),
                _ => Ordering::Equal,
            }
        }),
    }
}

fn sorted(elements: Elements, cmp: ElementCmp) -> Elements {
    let mut upstream = Some(elements);
    let mut buffered: Option<std::vec::IntoIter<Element>> = None;

    Box::new(std::iter::from_fn(move || {
        if let Some(upstream) = upstream.take() {
            let mut all: Vec<Element> = upstream.collect();
            all.sort_by(|left, right| cmp(left, right));
            buffered = Some(all.into_iter());
        }

        buffered.as_mut()?.next()
    }))
}

fn saturating_usize(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}
