//! Module: optimize
//! Responsibility: pure pipeline-to-pipeline rewrites run before merging.
//! Does not own: push-down into native queries (see `merge`).
//!
//! Every pass only deletes or locally fuses operations, never moves one
//! across an ordering-sensitive stage, and is idempotent.


use crate::pipeline::{IntermediateOperation, Pipeline};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

///
/// PreOptimizer
///

pub trait PreOptimizer {
    fn kind(&self) -> PreOptimizerKind;

    fn optimize<E>(&self, pipeline: Pipeline<E>) -> Pipeline<E>;
}

///
/// RemovePeek
///
/// Drops every `PEEK`. Observing elements is not part of the result.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct RemovePeek;

impl PreOptimizer for RemovePeek {
    fn kind(&self) -> PreOptimizerKind {
        PreOptimizerKind::RemovePeek
    }

    fn optimize<E>(&self, mut pipeline: Pipeline<E>) -> Pipeline<E> {
        pipeline
            .operations_mut()
            .retain(|operation| !matches!(operation, IntermediateOperation::Peek(_)));

        pipeline
    }
}

///
/// FoldUnordered
///
/// Drops `UNORDERED` stages and records the relaxation on the pipeline flag.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct FoldUnordered;

impl PreOptimizer for FoldUnordered {
    fn kind(&self) -> PreOptimizerKind {
        PreOptimizerKind::FoldUnordered
    }

    fn optimize<E>(&self, mut pipeline: Pipeline<E>) -> Pipeline<E> {
        let before = pipeline.operations().len();
        pipeline
            .operations_mut()
            .retain(|operation| !matches!(operation, IntermediateOperation::Unordered));

        if pipeline.operations().len() != before {
            pipeline.set_ordered(false);
        }

        pipeline
    }
}

///
/// CollapseSlices
///
/// Fuses adjacent `LIMIT`s into the smallest and adjacent `SKIP`s into their
/// saturating sum.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct CollapseSlices;

impl PreOptimizer for CollapseSlices {
    fn kind(&self) -> PreOptimizerKind {
        PreOptimizerKind::CollapseSlices
    }

    fn optimize<E>(&self, mut pipeline: Pipeline<E>) -> Pipeline<E> {
        let operations = std::mem::take(pipeline.operations_mut());
        let mut fused: Vec<IntermediateOperation> = Vec::with_capacity(operations.len());

        for operation in operations {
            let absorbed = match (fused.last_mut(), &operation) {
                (Some(IntermediateOperation::Limit(prev)), IntermediateOperation::Limit(next)) => {
                    *prev = (*prev).min(*next);
                    true
                }
                (Some(IntermediateOperation::Skip(prev)), IntermediateOperation::Skip(next)) => {
                    *prev = prev.saturating_add(*next);
                    true
                }
                _ => false,
            };

            if !absorbed {
                fused.push(operation);
            }
        }

        *pipeline.operations_mut() = fused;
        pipeline
    }
}

///
/// PreOptimizerKind
///
/// Configurable identity of a pass.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreOptimizerKind {
    RemovePeek,
    FoldUnordered,
    CollapseSlices,
}

impl PreOptimizerKind {
    pub const DEFAULT_ORDER: [Self; 3] = [Self::RemovePeek, Self::FoldUnordered, Self::CollapseSlices];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RemovePeek => "remove_peek",
            Self::FoldUnordered => "fold_unordered",
            Self::CollapseSlices => "collapse_slices",
        }
    }

    fn run<E>(self, pipeline: Pipeline<E>) -> Pipeline<E> {
        match self {
            Self::RemovePeek => RemovePeek.optimize(pipeline),
            Self::FoldUnordered => FoldUnordered.optimize(pipeline),
            Self::CollapseSlices => CollapseSlices.optimize(pipeline),
        }
    }
}

impl fmt::Display for PreOptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// PreOptimizerChain
///
/// Fixed, ordered list of passes. Never fails.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PreOptimizerChain {
    passes: Vec<PreOptimizerKind>,
}

impl PreOptimizerChain {
    #[must_use]
    pub const fn new(passes: Vec<PreOptimizerKind>) -> Self {
        Self { passes }
    }

    #[must_use]
    pub fn passes(&self) -> &[PreOptimizerKind] {
        &self.passes
    }

    #[must_use]
    pub fn optimize<E>(&self, pipeline: Pipeline<E>) -> Pipeline<E> {
        self.passes.iter().fold(pipeline, |pipeline, pass| {
            let before = pipeline.operations().len();
            let pipeline = pass.run(pipeline);
            trace!(
                pass = %pass,
                removed = before - pipeline.operations().len(),
                "pre-optimizer applied"
            );

            pipeline
        })
    }
}

impl Default for PreOptimizerChain {
    fn default() -> Self {
        Self::new(PreOptimizerKind::DEFAULT_ORDER.to_vec())
    }
}
