//! Module: predicate
//! Responsibility: field predicates, logical combinators, negation laws and
//! in-process evaluation.
//! Does not own: lowering into native predicate nodes (see `mapper`).

mod ast;
mod eval;

#[cfg(test)]
mod tests;

pub use ast::{
    CombinedPredicate, ComparisonOp, FieldPredicate, Inclusion, LogicalKind, Operand,
    OperandShape, Predicate, PredicateKind,
};
pub(crate) use eval::{eval_comparison, eval_membership, eval_range, kleene_and, kleene_or};
