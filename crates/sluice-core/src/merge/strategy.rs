use crate::{
    engine::{NativeQuery, PredicateNodes},
    error::Error,
    mapper::map_predicate,
    merge::MergeResult,
    pipeline::{IntermediateOperation, TerminalOperation},
    predicate::Predicate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

///
/// MergeStrategy
///
/// Moves a prefix of the reduced pipeline into the native query.
/// A strategy removes exactly the operations it translated, and only from
/// the head, so nothing left in process ever precedes a pushed operation.
///

pub trait MergeStrategy {
    fn kind(&self) -> MergeStrategyKind;

    fn merge<E, N, Q>(
        &self,
        nodes: &N,
        result: MergeResult<E, Q>,
    ) -> Result<MergeResult<E, Q>, Error>
    where
        N: PredicateNodes + ?Sized,
        Q: NativeQuery<Node = N::Node>;
}

///
/// MergeStrategyKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategyKind {
    Filter,
    Sort,
    Slice,
    Count,
}

impl MergeStrategyKind {
    pub const DEFAULT_ORDER: [Self; 4] = [Self::Filter, Self::Sort, Self::Slice, Self::Count];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Sort => "sort",
            Self::Slice => "slice",
            Self::Count => "count",
        }
    }

    pub(crate) fn run<E, N, Q>(
        self,
        nodes: &N,
        result: MergeResult<E, Q>,
    ) -> Result<MergeResult<E, Q>, Error>
    where
        N: PredicateNodes + ?Sized,
        Q: NativeQuery<Node = N::Node>,
    {
        match self {
            Self::Filter => FilterStrategy.merge(nodes, result),
            Self::Sort => SortStrategy.merge(nodes, result),
            Self::Slice => SliceStrategy.merge(nodes, result),
            Self::Count => CountStrategy.merge(nodes, result),
        }
    }
}

impl fmt::Display for MergeStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// FilterStrategy
///
/// Leading predicate filters, AND-combined in pipeline order.
/// Skipped once the query is bounded or count-projected.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct FilterStrategy;

impl MergeStrategy for FilterStrategy {
    fn kind(&self) -> MergeStrategyKind {
        MergeStrategyKind::Filter
    }

    fn merge<E, N, Q>(
        &self,
        nodes: &N,
        result: MergeResult<E, Q>,
    ) -> Result<MergeResult<E, Q>, Error>
    where
        N: PredicateNodes + ?Sized,
        Q: NativeQuery<Node = N::Node>,
    {
        let MergeResult {
            mut pipeline,
            mut query,
        } = result;

        if query.bounds().is_bounded() || query.is_count_projection() {
            return Ok(MergeResult { pipeline, query });
        }

        let mut predicates: Vec<Predicate> = pipeline
            .operations()
            .iter()
            .map_while(IntermediateOperation::filter_predicate)
            .cloned()
            .collect();
        let pushed = predicates.len();

        let condition = match pushed {
            0 => return Ok(MergeResult { pipeline, query }),
            1 => predicates.remove(0),
            _ => Predicate::all(predicates)?,
        };

        let node = map_predicate(nodes, &condition)?;
        query.add_condition(node);
        pipeline.operations_mut().drain(..pushed);

        Ok(MergeResult { pipeline, query })
    }
}

///
/// SortStrategy
///
/// A leading field-comparator sort becomes the ordering clause, provided the
/// query is still unordered and unbounded.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct SortStrategy;

impl MergeStrategy for SortStrategy {
    fn kind(&self) -> MergeStrategyKind {
        MergeStrategyKind::Sort
    }

    fn merge<E, N, Q>(
        &self,
        _: &N,
        result: MergeResult<E, Q>,
    ) -> Result<MergeResult<E, Q>, Error>
    where
        N: PredicateNodes + ?Sized,
        Q: NativeQuery<Node = N::Node>,
    {
        let MergeResult {
            mut pipeline,
            mut query,
        } = result;

        if query.has_ordering() || query.bounds().is_bounded() || query.is_count_projection() {
            return Ok(MergeResult { pipeline, query });
        }

        let comparator = pipeline
            .operations()
            .first()
            .and_then(IntermediateOperation::sort_comparator)
            .cloned();

        if let Some(comparator) = comparator {
            for ordering in comparator.orderings() {
                query.add_ordering(ordering);
            }
            pipeline.operations_mut().remove(0);
        }

        Ok(MergeResult { pipeline, query })
    }
}

///
/// SliceStrategy
///
/// Leading `SKIP`/`LIMIT` runs fold into the query's offset and limit.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct SliceStrategy;

impl MergeStrategy for SliceStrategy {
    fn kind(&self) -> MergeStrategyKind {
        MergeStrategyKind::Slice
    }

    fn merge<E, N, Q>(
        &self,
        _: &N,
        result: MergeResult<E, Q>,
    ) -> Result<MergeResult<E, Q>, Error>
    where
        N: PredicateNodes + ?Sized,
        Q: NativeQuery<Node = N::Node>,
    {
        let MergeResult {
            mut pipeline,
            mut query,
        } = result;

        if query.is_count_projection() {
            return Ok(MergeResult { pipeline, query });
        }

        let mut bounds = query.bounds();
        let mut pushed = 0;
        for operation in pipeline.operations() {
            bounds = match operation {
                IntermediateOperation::Skip(count) => bounds.then_skip(*count),
                IntermediateOperation::Limit(count) => bounds.then_limit(*count),
                _ => break,
            };
            pushed += 1;
        }

        if pushed > 0 {
            query.set_bounds(bounds);
            pipeline.operations_mut().drain(..pushed);
        }

        Ok(MergeResult { pipeline, query })
    }
}

///
/// CountStrategy
///
/// A `COUNT` over a fully pushed, unbounded query becomes a count aggregate.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct CountStrategy;

impl MergeStrategy for CountStrategy {
    fn kind(&self) -> MergeStrategyKind {
        MergeStrategyKind::Count
    }

    fn merge<E, N, Q>(
        &self,
        _: &N,
        result: MergeResult<E, Q>,
    ) -> Result<MergeResult<E, Q>, Error>
    where
        N: PredicateNodes + ?Sized,
        Q: NativeQuery<Node = N::Node>,
    {
        let MergeResult { pipeline, mut query } = result;

        let eligible = matches!(pipeline.terminal(), Some(TerminalOperation::Count))
            && pipeline.operations().is_empty()
            && !query.bounds().is_bounded()
            && !query.is_count_projection();

        if eligible && !query.project_count() {
            debug!("count projection refused, counting rows in process");
        }

        Ok(MergeResult { pipeline, query })
    }
}
