//! In-process reference backend.
//!
//! Executes native queries over a fixed row set with the same three-valued
//! predicate semantics as in-process evaluation. Used by tests and as
//! executable documentation of the engine traits.

use crate::{
    engine::{
        NativeQuery, PredicateNodes, QueryBounds, QueryEngine, QueryRows, StreamConfiguration,
    },
    error::BoxError,
    order::FieldOrdering,
    predicate::{
        ComparisonOp, Inclusion, LogicalKind, eval_comparison, eval_membership, eval_range,
        kleene_and, kleene_or,
    },
    traits::Entity,
    value::Value,
};
use std::{cell::Cell, cmp::Ordering};
use thiserror::Error as ThisError;
use tracing::debug;

///
/// MemoryEngineError
///

#[derive(Debug, ThisError)]
#[error("memory engine failure: {0}")]
pub struct MemoryEngineError(pub String);

///
/// MemoryNode
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemoryNode {
    Compare {
        field: String,
        op: ComparisonOp,
        value: Value,
    },
    Range {
        field: String,
        start: Value,
        end: Value,
        inclusion: Inclusion,
        negated: bool,
    },
    Membership {
        field: String,
        values: Vec<Value>,
        negated: bool,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
}

impl MemoryNode {
    #[must_use]
    pub fn evaluate<E: Entity>(&self, row: &E) -> Option<bool> {
        let field_value = |field: &str| row.field_value(field).unwrap_or(Value::Null);

        match self {
            Self::Compare { field, op, value } => eval_comparison(&field_value(field), *op, value),
            Self::Range {
                field,
                start,
                end,
                inclusion,
                negated,
            } => eval_range(&field_value(field), start, end, *inclusion)
                .map(|inside| inside != *negated),
            Self::Membership {
                field,
                values,
                negated,
            } => eval_membership(&field_value(field), values).map(|member| member != *negated),
            Self::And(children) => kleene_and(children.iter().map(|child| child.evaluate(row))),
            Self::Or(children) => kleene_or(children.iter().map(|child| child.evaluate(row))),
        }
    }
}

///
/// MemoryNodes
///
/// Node constructors. Combinators can be switched off to model a backend
/// that cannot express them.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemoryNodes {
    and: bool,
    or: bool,
}

impl Default for MemoryNodes {
    fn default() -> Self {
        Self { and: true, or: true }
    }
}

impl PredicateNodes for MemoryNodes {
    type Node = MemoryNode;

    fn comparison(&self, field: &str, op: ComparisonOp, value: &Value) -> Option<Self::Node> {
        Some(MemoryNode::Compare {
            field: field.to_string(),
            op,
            value: value.clone(),
        })
    }

    fn range(
        &self,
        field: &str,
        start: &Value,
        end: &Value,
        inclusion: Inclusion,
        negated: bool,
    ) -> Option<Self::Node> {
        Some(MemoryNode::Range {
            field: field.to_string(),
            start: start.clone(),
            end: end.clone(),
            inclusion,
            negated,
        })
    }

    fn membership(&self, field: &str, values: &[Value], negated: bool) -> Option<Self::Node> {
        Some(MemoryNode::Membership {
            field: field.to_string(),
            values: values.to_vec(),
            negated,
        })
    }

    fn combine(&self, kind: LogicalKind, children: Vec<Self::Node>) -> Option<Self::Node> {
        match kind {
            LogicalKind::And if self.and => Some(MemoryNode::And(children)),
            LogicalKind::Or if self.or => Some(MemoryNode::Or(children)),
            LogicalKind::And | LogicalKind::Or => None,
        }
    }
}

///
/// MemoryQuery
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryQuery {
    pub root: &'static str,
    pub joins: Vec<String>,
    pub conditions: Vec<MemoryNode>,
    pub orderings: Vec<FieldOrdering>,
    pub bounds: QueryBounds,
    pub count: bool,
    count_supported: bool,
}

impl MemoryQuery {
    fn matches<E: Entity>(&self, row: &E) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.evaluate(row) == Some(true))
    }

    fn compare<E: Entity>(&self, left: &E, right: &E) -> Ordering {
        self.orderings
            .iter()
            .map(|ordering| ordering.compare(left, right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl NativeQuery for MemoryQuery {
    type Node = MemoryNode;

    fn add_condition(&mut self, node: Self::Node) {
        self.conditions.push(node);
    }

    fn add_ordering(&mut self, ordering: &FieldOrdering) {
        self.orderings.push(ordering.clone());
    }

    fn has_ordering(&self) -> bool {
        !self.orderings.is_empty()
    }

    fn set_bounds(&mut self, bounds: QueryBounds) {
        self.bounds = bounds;
    }

    fn bounds(&self) -> QueryBounds {
        self.bounds
    }

    fn project_count(&mut self) -> bool {
        if self.count_supported {
            self.count = true;
        }
        self.count
    }

    fn is_count_projection(&self) -> bool {
        self.count
    }
}

///
/// MemoryEngine
///

#[derive(Debug)]
pub struct MemoryEngine<E> {
    rows: Vec<E>,
    nodes: MemoryNodes,
    count_projection: bool,
    failure: Option<String>,
    executions: Cell<u64>,
}

impl<E: Entity + Clone> MemoryEngine<E> {
    #[must_use]
    pub fn new(rows: Vec<E>) -> Self {
        Self {
            rows,
            nodes: MemoryNodes::default(),
            count_projection: true,
            failure: None,
            executions: Cell::new(0),
        }
    }

    /// Backend without the OR combinator.
    #[must_use]
    pub fn without_or(mut self) -> Self {
        self.nodes.or = false;
        self
    }

    /// Backend without the AND combinator.
    #[must_use]
    pub fn without_and(mut self) -> Self {
        self.nodes.and = false;
        self
    }

    /// Backend that refuses count projections.
    #[must_use]
    pub fn without_count_projection(mut self) -> Self {
        self.count_projection = false;
        self
    }

    /// Backend whose every execution fails with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of `execute` calls so far.
    #[must_use]
    pub fn executions(&self) -> u64 {
        self.executions.get()
    }
}

impl<E: Entity + Clone> QueryEngine<E> for MemoryEngine<E> {
    type Nodes = MemoryNodes;
    type Query = MemoryQuery;

    fn new_query(&self, configuration: &StreamConfiguration<E>) -> Self::Query {
        MemoryQuery {
            root: configuration.root_name(),
            joins: configuration.joins().to_vec(),
            conditions: Vec::new(),
            orderings: Vec::new(),
            bounds: QueryBounds::default(),
            count: false,
            count_supported: self.count_projection,
        }
    }

    fn nodes(&self) -> &Self::Nodes {
        &self.nodes
    }

    fn execute(&self, query: Self::Query) -> Result<QueryRows<E>, BoxError> {
        self.executions.set(self.executions.get() + 1);

        if let Some(message) = &self.failure {
            return Err(Box::new(MemoryEngineError(message.clone())));
        }

        let mut rows: Vec<E> = self
            .rows
            .iter()
            .filter(|row| query.matches(*row))
            .cloned()
            .collect();
        rows.sort_by(|left, right| query.compare(left, right));

        let offset = usize::try_from(query.bounds.offset).unwrap_or(usize::MAX);
        let limit = query
            .bounds
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        let rows: Vec<E> = rows.into_iter().skip(offset).take(limit).collect();

        debug!(
            root = query.root,
            conditions = query.conditions.len(),
            rows = rows.len(),
            count = query.count,
            "memory query executed"
        );

        if query.count {
            Ok(QueryRows::Counts(vec![rows.len() as u64]))
        } else {
            Ok(QueryRows::Entities(Box::new(rows.into_iter())))
        }
    }
}

///
/// TESTS
///
