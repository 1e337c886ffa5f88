//! Module: merge
//! Responsibility: push a pipeline's leading operations into a native query.
//! Does not own: predicate lowering (see `mapper`) or execution (see `render`).

mod strategy;

#[cfg(test)]
mod tests;

use crate::{
    engine::{NativeQuery, PredicateNodes},
    error::Error,
    pipeline::Pipeline,
};
use tracing::debug;

// re-exports
pub use strategy::{
    CountStrategy, FilterStrategy, MergeStrategy, MergeStrategyKind, SliceStrategy, SortStrategy,
};

///
/// MergeResult
///
/// Reduced pipeline plus the query holding everything that was pushed.
/// Owned; never aliases the inputs of a merge.
///

#[derive(Clone, Debug)]
pub struct MergeResult<E, Q> {
    pub pipeline: Pipeline<E>,
    pub query: Q,
}

impl<E, Q> MergeResult<E, Q> {
    #[must_use]
    pub const fn new(pipeline: Pipeline<E>, query: Q) -> Self {
        Self { pipeline, query }
    }

    #[must_use]
    pub fn into_parts(self) -> (Pipeline<E>, Q) {
        (self.pipeline, self.query)
    }
}

///
/// Merger
///
/// Fixed, ordered chain of merge strategies.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Merger {
    strategies: Vec<MergeStrategyKind>,
}

impl Merger {
    #[must_use]
    pub const fn new(strategies: Vec<MergeStrategyKind>) -> Self {
        Self { strategies }
    }

    #[must_use]
    pub fn strategies(&self) -> &[MergeStrategyKind] {
        &self.strategies
    }

    /// Fold every strategy over copies of `pipeline` and `query`.
    ///
    /// Any translation failure aborts the merge; the inputs are never
    /// modified either way.
    pub fn merge<E, N, Q>(
        &self,
        nodes: &N,
        pipeline: &Pipeline<E>,
        query: &Q,
    ) -> Result<MergeResult<E, Q>, Error>
    where
        N: PredicateNodes + ?Sized,
        Q: NativeQuery<Node = N::Node>,
    {
        let initial = MergeResult::new(pipeline.clone(), query.clone());

        self.strategies
            .iter()
            .try_fold(initial, |result, strategy| {
                let before = result.pipeline.operations().len();
                let result = strategy.run(nodes, result).inspect_err(|err| {
                    debug!(strategy = %strategy, error = %err, "merge strategy failed");
                })?;
                debug!(
                    strategy = %strategy,
                    pushed = before - result.pipeline.operations().len(),
                    "merge strategy applied"
                );

                Ok(result)
            })
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(MergeStrategyKind::DEFAULT_ORDER.to_vec())
    }
}
