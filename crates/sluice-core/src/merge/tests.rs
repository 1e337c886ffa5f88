use crate::{
    engine::{
        NativeQuery, QueryBounds, QueryEngine, StreamConfiguration,
        memory::{MemoryEngine, MemoryNode, MemoryQuery},
    },
    merge::{MergeStrategyKind, Merger},
    order::FieldOrdering,
    pipeline::{
        Element, Filter, IntermediateKind, IntermediateOperation, Pipeline, Sort,
        TerminalOperation,
    },
    predicate::ComparisonOp,
    test_support::{AGE, NAME, Person, people},
    value::Value,
};
use std::rc::Rc;

fn pipeline(operations: Vec<IntermediateOperation>, terminal: TerminalOperation) -> Pipeline<Person> {
    let mut pipeline = Pipeline::new();
    for operation in operations {
        pipeline.append(operation).expect("open");
    }
    pipeline.set_terminal(terminal).expect("open");
    pipeline
}

fn filter(predicate: crate::predicate::Predicate) -> IntermediateOperation {
    IntermediateOperation::Filter(Filter::Predicate(predicate))
}

fn query(engine: &MemoryEngine<Person>) -> MemoryQuery {
    engine.new_query(&StreamConfiguration::of())
}

fn kinds(pipeline: &Pipeline<Person>) -> Vec<IntermediateKind> {
    pipeline
        .operations()
        .iter()
        .map(IntermediateOperation::kind)
        .collect()
}

#[test]
fn leading_filters_become_one_conjunction_and_count_projects() {
    let engine = MemoryEngine::new(people());
    let input = pipeline(
        vec![filter(AGE.greater_than(18)), filter(NAME.equal("A"))],
        TerminalOperation::Count,
    );

    let merged = Merger::default()
        .merge(engine.nodes(), &input, &query(&engine))
        .expect("merges");

    assert!(merged.pipeline.operations().is_empty());
    assert_eq!(
        merged.query.conditions,
        [MemoryNode::And(vec![
            MemoryNode::Compare {
                field: "age".to_string(),
                op: ComparisonOp::Gt,
                value: Value::Int(18),
            },
            MemoryNode::Compare {
                field: "name".to_string(),
                op: ComparisonOp::Eq,
                value: Value::Text("A".to_string()),
            },
        ])]
    );
    assert!(merged.query.is_count_projection());
    assert_eq!(input.operations().len(), 2);
}

#[test]
fn leading_sort_and_limit_are_pushed() {
    let engine = MemoryEngine::new(people());
    let input = pipeline(
        vec![
            IntermediateOperation::Sorted(Sort::Fields(AGE.reversed())),
            IntermediateOperation::Limit(10),
        ],
        TerminalOperation::ToArray,
    );

    let merged = Merger::default()
        .merge(engine.nodes(), &input, &query(&engine))
        .expect("merges");

    assert!(merged.pipeline.operations().is_empty());
    assert_eq!(merged.query.orderings, [FieldOrdering::desc("age")]);
    assert_eq!(
        merged.query.bounds,
        QueryBounds {
            offset: 0,
            limit: Some(10)
        }
    );
    assert!(!merged.query.is_count_projection());
}

#[test]
fn limit_before_sort_is_not_reordered() {
    let engine = MemoryEngine::new(people());
    let input = pipeline(
        vec![
            IntermediateOperation::Limit(5),
            IntermediateOperation::Sorted(Sort::Fields(AGE.comparator())),
            filter(AGE.greater_than(1)),
        ],
        TerminalOperation::ToArray,
    );

    let merged = Merger::default()
        .merge(engine.nodes(), &input, &query(&engine))
        .expect("merges");

    assert_eq!(kinds(&merged.pipeline), [IntermediateKind::Sorted, IntermediateKind::Filter]);
    assert!(merged.query.orderings.is_empty());
    assert!(merged.query.conditions.is_empty());
    assert_eq!(merged.query.bounds.limit, Some(5));
}

#[test]
fn skip_and_limit_runs_compose() {
    let engine = MemoryEngine::new(people());
    let input = pipeline(
        vec![
            IntermediateOperation::Skip(2),
            IntermediateOperation::Limit(4),
            IntermediateOperation::Skip(1),
            IntermediateOperation::Limit(10),
        ],
        TerminalOperation::ToArray,
    );

    let merged = Merger::default()
        .merge(engine.nodes(), &input, &query(&engine))
        .expect("merges");

    assert!(merged.pipeline.operations().is_empty());
    assert_eq!(
        merged.query.bounds,
        QueryBounds {
            offset: 3,
            limit: Some(3)
        }
    );
}

#[test]
fn opaque_operations_stop_the_pushed_prefix() {
    let engine = MemoryEngine::new(people());
    let input = pipeline(
        vec![
            filter(AGE.greater_than(18)),
            IntermediateOperation::Filter(Filter::Closure(Rc::new(|_: &Element| true))),
            filter(NAME.equal("A")),
            IntermediateOperation::Map(Rc::new(|e: Element| e)),
            IntermediateOperation::Limit(1),
        ],
        TerminalOperation::Count,
    );

    let merged = Merger::default()
        .merge(engine.nodes(), &input, &query(&engine))
        .expect("merges");

    assert_eq!(merged.query.conditions.len(), 1);
    assert_eq!(
        kinds(&merged.pipeline),
        [
            IntermediateKind::Filter,
            IntermediateKind::Filter,
            IntermediateKind::Map,
            IntermediateKind::Limit,
        ]
    );
    assert!(!merged.query.bounds.is_bounded());
    assert!(!merged.query.is_count_projection());
}

#[test]
fn merging_a_merged_pipeline_changes_nothing() {
    let engine = MemoryEngine::new(people());
    let input = pipeline(
        vec![
            filter(AGE.greater_than(18)),
            IntermediateOperation::Sorted(Sort::Fields(AGE.reversed())),
            IntermediateOperation::Limit(3),
        ],
        TerminalOperation::ToArray,
    );
    let merger = Merger::default();

    let once = merger
        .merge(engine.nodes(), &input, &query(&engine))
        .expect("merges");
    let twice = merger
        .merge(engine.nodes(), &once.pipeline, &once.query)
        .expect("merges");

    assert!(twice.pipeline.operations().is_empty());
    assert_eq!(twice.query, once.query);
}

#[test]
fn unsupported_combinator_fails_and_leaves_inputs_untouched() {
    let engine = MemoryEngine::new(people()).without_or();
    let input = pipeline(
        vec![filter(AGE.greater_than(60).or(NAME.equal("B")))],
        TerminalOperation::ToArray,
    );
    let caller_query = query(&engine);
    let snapshot = caller_query.clone();

    let err = Merger::default()
        .merge(engine.nodes(), &input, &caller_query)
        .expect_err("or unsupported");

    assert!(err.is_unsupported_predicate());
    assert_eq!(err.unsupported_predicate_kind(), Some("OR"));
    assert_eq!(caller_query, snapshot);
    assert_eq!(input.operations().len(), 1);
}

#[test]
fn backend_without_and_rejects_two_leading_filters() {
    let engine = MemoryEngine::new(people()).without_and();
    let single = pipeline(vec![filter(AGE.greater_than(18))], TerminalOperation::ToArray);

    let merged = Merger::default()
        .merge(engine.nodes(), &single, &query(&engine))
        .expect("a lone comparison needs no combinator");
    assert_eq!(merged.query.conditions.len(), 1);

    let input = pipeline(
        vec![filter(AGE.greater_than(18)), filter(NAME.equal("A"))],
        TerminalOperation::ToArray,
    );
    let err = Merger::default()
        .merge(engine.nodes(), &input, &query(&engine))
        .expect_err("and unsupported");

    assert!(err.is_unsupported_predicate());
    assert_eq!(err.unsupported_predicate_kind(), Some("AND"));
    assert_eq!(input.operations().len(), 2);
}

#[test]
fn count_is_not_projected_over_a_bounded_query() {
    let engine = MemoryEngine::new(people());
    let input = pipeline(vec![IntermediateOperation::Limit(3)], TerminalOperation::Count);

    let merged = Merger::default()
        .merge(engine.nodes(), &input, &query(&engine))
        .expect("merges");

    assert!(merged.pipeline.operations().is_empty());
    assert!(!merged.query.is_count_projection());
}

#[test]
fn strategy_chain_only_runs_configured_strategies() {
    let engine = MemoryEngine::new(people());
    let input = pipeline(
        vec![filter(AGE.greater_than(18)), IntermediateOperation::Limit(2)],
        TerminalOperation::Count,
    );

    let merged = Merger::new(vec![MergeStrategyKind::Slice, MergeStrategyKind::Filter])
        .merge(engine.nodes(), &input, &query(&engine))
        .expect("merges");

    // the filter heads the pipeline, so slicing finds nothing to push
    assert!(merged.query.conditions.len() == 1);
    assert_eq!(kinds(&merged.pipeline), [IntermediateKind::Limit]);
    assert!(!merged.query.is_count_projection());
}
