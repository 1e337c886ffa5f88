//! Module: engine
//! Responsibility: the boundary to a native query backend.
//! Does not own: connection management or query execution strategy.
//!
//! A backend supplies three things: predicate node constructors, a mutable
//! native query, and `execute`. Any constructor may return `None` to signal
//! that the backend cannot express that predicate.

pub mod memory;

use crate::{
    error::BoxError,
    order::FieldOrdering,
    predicate::{ComparisonOp, Inclusion, LogicalKind},
    traits::Entity,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::{fmt, marker::PhantomData};

///
/// PredicateNodes
///
/// Native predicate node constructors, one per predicate shape.
///

pub trait PredicateNodes {
    type Node: Clone + fmt::Debug;

    fn comparison(&self, field: &str, op: ComparisonOp, value: &Value) -> Option<Self::Node>;

    fn range(
        &self,
        field: &str,
        start: &Value,
        end: &Value,
        inclusion: Inclusion,
        negated: bool,
    ) -> Option<Self::Node>;

    fn membership(&self, field: &str, values: &[Value], negated: bool) -> Option<Self::Node>;

    /// Logical combination of already lowered children, in order.
    fn combine(&self, kind: LogicalKind, children: Vec<Self::Node>) -> Option<Self::Node>;
}

///
/// QueryBounds
///
/// Offset and optional limit of a native query.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct QueryBounds {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl QueryBounds {
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.offset > 0 || self.limit.is_some()
    }

    /// Bounds equivalent to applying these bounds and then skipping `count`.
    #[must_use]
    pub const fn then_skip(self, count: u64) -> Self {
        Self {
            offset: self.offset.saturating_add(count),
            limit: match self.limit {
                Some(limit) => Some(limit.saturating_sub(count)),
                None => None,
            },
        }
    }

    /// Bounds equivalent to applying these bounds and then keeping `count`.
    #[must_use]
    pub const fn then_limit(self, count: u64) -> Self {
        Self {
            offset: self.offset,
            limit: match self.limit {
                Some(limit) if limit < count => Some(limit),
                _ => Some(count),
            },
        }
    }
}

///
/// NativeQuery
///
/// Backend query under construction. Merge strategies only ever add to it.
///

pub trait NativeQuery: Clone + fmt::Debug {
    type Node;

    /// Conjoin `node` with any condition already present.
    fn add_condition(&mut self, node: Self::Node);

    /// Append a lower-priority ordering key.
    fn add_ordering(&mut self, ordering: &FieldOrdering);

    fn has_ordering(&self) -> bool;

    fn set_bounds(&mut self, bounds: QueryBounds);

    fn bounds(&self) -> QueryBounds;

    /// Ask the backend to return a count aggregate instead of rows.
    /// Returns `false` when the backend cannot.
    fn project_count(&mut self) -> bool;

    fn is_count_projection(&self) -> bool;
}

///
/// QueryRows
///
/// Result of executing a native query.
///

pub enum QueryRows<E> {
    Entities(Box<dyn Iterator<Item = E>>),

    /// Count aggregate values; summed by the renderer.
    Counts(Vec<u64>),
}

impl<E> fmt::Debug for QueryRows<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entities(_) => f.write_str("Entities(..)"),
            Self::Counts(counts) => f.debug_tuple("Counts").field(counts).finish(),
        }
    }
}

///
/// QueryEngine
///

pub trait QueryEngine<E: Entity> {
    type Nodes: PredicateNodes;
    type Query: NativeQuery<Node = <Self::Nodes as PredicateNodes>::Node>;

    fn new_query(&self, configuration: &StreamConfiguration<E>) -> Self::Query;

    fn nodes(&self) -> &Self::Nodes;

    /// Run the query. Failures are passed to the caller unchanged.
    fn execute(&self, query: Self::Query) -> Result<QueryRows<E>, BoxError>;
}

///
/// StreamConfiguration
///
/// Root entity of a stream plus the relations the backend should fetch
/// eagerly.
///

pub struct StreamConfiguration<E> {
    joins: Vec<String>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> StreamConfiguration<E> {
    #[must_use]
    pub const fn of() -> Self {
        Self {
            joins: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Fetch `field` together with the root entity.
    #[must_use]
    pub fn joining(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.joins.contains(&field) {
            self.joins.push(field);
        }
        self
    }

    #[must_use]
    pub fn joins(&self) -> &[String] {
        &self.joins
    }

    #[must_use]
    pub const fn root_name(&self) -> &'static str {
        E::ENTITY_NAME
    }
}

impl<E> Clone for StreamConfiguration<E> {
    fn clone(&self) -> Self {
        Self {
            joins: self.joins.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> Default for StreamConfiguration<E> {
    fn default() -> Self {
        Self::of()
    }
}

impl<E: Entity> fmt::Debug for StreamConfiguration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfiguration")
            .field("root", &E::ENTITY_NAME)
            .field("joins", &self.joins)
            .finish()
    }
}
