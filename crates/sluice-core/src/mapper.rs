//! Module: mapper
//! Responsibility: lower predicate trees into native predicate nodes.
//! Does not own: deciding which filters are pushable (see `merge`).

use crate::{
    engine::PredicateNodes,
    error::Error,
    predicate::{FieldPredicate, Operand, Predicate, PredicateKind},
};
use tracing::debug;

/// Lower `predicate` into a native node.
///
/// Children are lowered in order before their combinator. A constructor the
/// backend cannot provide fails the whole lowering with an
/// unsupported-predicate error naming the offending kind.
pub fn map_predicate<N>(nodes: &N, predicate: &Predicate) -> Result<N::Node, Error>
where
    N: PredicateNodes + ?Sized,
{
    match predicate {
        Predicate::Field(field) => map_field(nodes, field),
        Predicate::Combined(combined) => {
            let children = combined
                .children()
                .iter()
                .map(|child| map_predicate(nodes, child))
                .collect::<Result<Vec<_>, _>>()?;

            nodes
                .combine(combined.kind(), children)
                .ok_or_else(|| unsupported(combined.kind().as_str()))
        }
    }
}

fn map_field<N>(nodes: &N, predicate: &FieldPredicate) -> Result<N::Node, Error>
where
    N: PredicateNodes + ?Sized,
{
    let field = predicate.field();
    let kind = predicate.kind();

    let node = match (kind, predicate.operand()) {
        (
            PredicateKind::Equal
            | PredicateKind::NotEqual
            | PredicateKind::GreaterThan
            | PredicateKind::GreaterOrEqual
            | PredicateKind::LessThan
            | PredicateKind::LessOrEqual,
            Operand::Value(value),
        ) => kind
            .comparison_op()
            .and_then(|op| nodes.comparison(field, op, value)),
        (
            PredicateKind::Between | PredicateKind::NotBetween,
            Operand::Range {
                start,
                end,
                inclusion,
            },
        ) => nodes.range(
            field,
            start,
            end,
            *inclusion,
            kind == PredicateKind::NotBetween,
        ),
        (PredicateKind::In | PredicateKind::NotIn, Operand::Set(values)) => {
            nodes.membership(field, values, kind == PredicateKind::NotIn)
        }
        (kind, operand) => {
            return Err(Error::predicate_shape(format!(
                "predicate kind {kind} cannot carry a {:?} operand",
                operand.shape()
            )));
        }
    };

    node.ok_or_else(|| unsupported(kind.as_str()))
}

fn unsupported(kind: &str) -> Error {
    debug!(kind, "native engine cannot express predicate");

    Error::unsupported_predicate(kind)
}

///
/// TESTS
///
