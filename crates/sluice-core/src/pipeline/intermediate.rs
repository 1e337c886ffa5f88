use crate::{
    order::FieldComparator,
    pipeline::element::{
        DistinctFactory, ElementAction, ElementCmp, ElementFlatMap, ElementFn, ElementTest,
    },
    predicate::Predicate,
};
use std::fmt;

///
/// IntermediateKind
///
/// Discriminant of an [`IntermediateOperation`], used for diagnostics.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IntermediateKind {
    Filter,
    Map,
    FlatMap,
    MapToNumeric,
    Distinct,
    Sorted,
    Peek,
    Limit,
    Skip,
    Unordered,
}

impl IntermediateKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filter => "FILTER",
            Self::Map => "MAP",
            Self::FlatMap => "FLAT_MAP",
            Self::MapToNumeric => "MAP_TO_NUMERIC",
            Self::Distinct => "DISTINCT",
            Self::Sorted => "SORTED",
            Self::Peek => "PEEK",
            Self::Limit => "LIMIT",
            Self::Skip => "SKIP",
            Self::Unordered => "UNORDERED",
        }
    }
}

impl fmt::Display for IntermediateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// NumericKind
///
/// Target of a numeric specialization (`map_to_i32`, `flat_map_to_f64`
/// and friends).
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NumericKind {
    I32,
    I64,
    F64,
    FlatI32,
    FlatI64,
    FlatF64,
}

impl NumericKind {
    #[must_use]
    pub const fn operation_name(self) -> &'static str {
        match self {
            Self::I32 => "map_to_i32",
            Self::I64 => "map_to_i64",
            Self::F64 => "map_to_f64",
            Self::FlatI32 => "flat_map_to_i32",
            Self::FlatI64 => "flat_map_to_i64",
            Self::FlatF64 => "flat_map_to_f64",
        }
    }
}

///
/// Filter
///
/// A pushable predicate over the root entity, or an opaque closure that can
/// only run in process.
///

#[derive(Clone)]
pub enum Filter {
    Predicate(Predicate),
    Closure(ElementTest),
}

///
/// Sort
///

#[derive(Clone)]
pub enum Sort {
    /// Natural order of the element type; never pushed.
    Natural(ElementCmp),

    /// Field comparator over the root entity; pushable.
    Fields(FieldComparator),

    /// Opaque comparator; never pushed.
    Custom(ElementCmp),
}

///
/// IntermediateOperation
///
/// One lazy pipeline stage. Immutable once appended.
///

#[derive(Clone)]
pub enum IntermediateOperation {
    Filter(Filter),
    Map(ElementFn),
    FlatMap(ElementFlatMap),
    MapToNumeric(NumericKind, ElementFn),
    Distinct(DistinctFactory),
    Sorted(Sort),
    Peek(ElementAction),
    Limit(u64),
    Skip(u64),
    Unordered,
}

impl IntermediateOperation {
    #[must_use]
    pub const fn kind(&self) -> IntermediateKind {
        match self {
            Self::Filter(_) => IntermediateKind::Filter,
            Self::Map(_) => IntermediateKind::Map,
            Self::FlatMap(_) => IntermediateKind::FlatMap,
            Self::MapToNumeric(..) => IntermediateKind::MapToNumeric,
            Self::Distinct(_) => IntermediateKind::Distinct,
            Self::Sorted(_) => IntermediateKind::Sorted,
            Self::Peek(_) => IntermediateKind::Peek,
            Self::Limit(_) => IntermediateKind::Limit,
            Self::Skip(_) => IntermediateKind::Skip,
            Self::Unordered => IntermediateKind::Unordered,
        }
    }

    /// Pushable predicate carried by a `FILTER`, if any.
    #[must_use]
    pub const fn filter_predicate(&self) -> Option<&Predicate> {
        match self {
            Self::Filter(Filter::Predicate(predicate)) => Some(predicate),
            _ => None,
        }
    }

    /// Pushable field comparator carried by a `SORTED`, if any.
    #[must_use]
    pub const fn sort_comparator(&self) -> Option<&FieldComparator> {
        match self {
            Self::Sorted(Sort::Fields(comparator)) => Some(comparator),
            _ => None,
        }
    }
}

impl fmt::Debug for IntermediateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(Filter::Predicate(predicate)) => {
                f.debug_tuple("Filter").field(predicate).finish()
            }
            Self::Filter(Filter::Closure(_)) => f.write_str("Filter(<closure>)"),
            Self::Map(_) => f.write_str("Map(<closure>)"),
            Self::FlatMap(_) => f.write_str("FlatMap(<closure>)"),
            Self::MapToNumeric(kind, _) => f.debug_tuple("MapToNumeric").field(kind).finish(),
            Self::Distinct(_) => f.write_str("Distinct"),
            Self::Sorted(Sort::Natural(_)) => f.write_str("Sorted(Natural)"),
            Self::Sorted(Sort::Fields(comparator)) => {
                f.debug_tuple("Sorted").field(comparator).finish()
            }
            Self::Sorted(Sort::Custom(_)) => f.write_str("Sorted(<closure>)"),
            Self::Peek(_) => f.write_str("Peek(<closure>)"),
            Self::Limit(count) => f.debug_tuple("Limit").field(count).finish(),
            Self::Skip(count) => f.debug_tuple("Skip").field(count).finish(),
            Self::Unordered => f.write_str("Unordered"),
        }
    }
}
