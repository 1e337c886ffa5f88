use crate::{
    config::RenderConfig,
    engine::{StreamConfiguration, memory::MemoryEngine},
    error::{Error, ErrorClass, ErrorOrigin},
    obs::{RenderEvent, RenderSink},
    pipeline::{
        Element, Filter, IntermediateOperation, NumericKind, Pipeline, Sort, TerminalOperation,
        TerminalOutput,
    },
    field::Field,
    render::{Renderer, ResultRoot},
    test_support::{AGE, NAME, Person, people, person},
    traits::Entity,
    value::{Float64, Value},
};
use std::{
    cell::Cell, cell::RefCell, cmp::Ordering, collections::HashSet, rc::Rc, sync::Mutex,
};

///
/// Reading
///
/// Entity whose one field mixes integer and float values.
///

#[derive(Clone, Debug)]
struct Reading {
    amount: Value,
}

impl Entity for Reading {
    const ENTITY_NAME: &'static str = "Reading";

    fn field_value(&self, field: &str) -> Option<Value> {
        (field == "amount").then(|| self.amount.clone())
    }
}

const AMOUNT: Field<Reading, Value> = Field::new("amount");

// 64 readings straddling 2^53, where f64 can no longer hold every integer.
fn readings() -> Vec<Reading> {
    let base: i64 = 1 << 53;
    let float = |v: f64| Value::Float64(Float64::try_new(v).expect("finite"));

    (0..64_i64)
        .map(|k| {
            let amount = match k % 4 {
                0 => Value::Int(base + k / 4),
                1 => Value::Int(base - k / 4),
                2 => float(9_007_199_254_740_992.0),
                _ => float(9_007_199_254_740_996.0),
            };
            Reading { amount }
        })
        .collect()
}

fn sorted_amounts(
    renderer: &Renderer<MemoryEngine<Reading>>,
    closure_first: bool,
) -> Vec<Value> {
    let mut pipeline = Pipeline::<Reading>::new();
    if closure_first {
        pipeline
            .append(IntermediateOperation::Filter(Filter::Closure(Rc::new(
                |_: &Element| true,
            ))))
            .expect("open");
    }
    pipeline
        .append(IntermediateOperation::Sorted(Sort::Fields(AMOUNT.comparator())))
        .expect("open");
    pipeline.set_terminal(TerminalOperation::ToArray).expect("open");

    let output = renderer
        .render(pipeline, &StreamConfiguration::of())
        .expect("renders")
        .apply_terminal()
        .expect("collects");
    let TerminalOutput::Collection(items) = output else {
        panic!("expected a collection, got {output:?}");
    };
    items
        .iter()
        .map(|item| item.downcast_ref::<Reading>().expect("reading").amount.clone())
        .collect()
}

fn pipeline(operations: Vec<IntermediateOperation>, terminal: TerminalOperation) -> Pipeline<Person> {
    let mut pipeline = Pipeline::new();
    for operation in operations {
        pipeline.append(operation).expect("open");
    }
    pipeline.set_terminal(terminal).expect("open");
    pipeline
}

fn run(
    renderer: &Renderer<MemoryEngine<Person>>,
    operations: Vec<IntermediateOperation>,
    terminal: TerminalOperation,
) -> Result<TerminalOutput, Error> {
    renderer
        .render(pipeline(operations, terminal), &StreamConfiguration::of())?
        .apply_terminal()
}

fn ids(output: TerminalOutput) -> Vec<u64> {
    let TerminalOutput::Collection(items) = output else {
        panic!("expected a collection, got {output:?}");
    };
    items
        .iter()
        .map(|item| item.downcast_ref::<Person>().expect("person").id)
        .collect()
}

fn filter(predicate: crate::predicate::Predicate) -> IntermediateOperation {
    IntermediateOperation::Filter(Filter::Predicate(predicate))
}

fn unoptimized() -> RenderConfig {
    RenderConfig {
        pre_optimizers: Vec::new(),
        merge_strategies: Vec::new(),
        count_fast_path: false,
    }
}

fn distinct_by_name() -> IntermediateOperation {
    IntermediateOperation::Distinct(Rc::new(|| -> Box<dyn FnMut(&Element) -> bool> {
        let mut seen = HashSet::new();
        Box::new(move |element: &Element| {
            element
                .downcast_ref::<Person>()
                .is_none_or(|person| seen.insert(person.name.clone()))
        })
    }))
}

#[test]
fn count_of_pushed_filters_uses_the_aggregate() {
    let renderer = Renderer::new(MemoryEngine::new(people()));
    let rendered = renderer
        .render(
            pipeline(
                vec![filter(AGE.greater_than(18)), filter(NAME.equal("A"))],
                TerminalOperation::Count,
            ),
            &StreamConfiguration::of(),
        )
        .expect("renders");

    assert_eq!(rendered.root(), ResultRoot::Count);
    assert!(matches!(
        rendered.apply_terminal().expect("counts"),
        TerminalOutput::Count(5)
    ));
    assert_eq!(renderer.engine().executions(), 1);
}

#[test]
fn count_without_fast_path_counts_entities() {
    let config = RenderConfig {
        count_fast_path: false,
        ..RenderConfig::default()
    };
    let renderer = Renderer::with_config(MemoryEngine::new(people()), config);
    let rendered = renderer
        .render(
            pipeline(
                vec![filter(AGE.greater_than(18)), filter(NAME.equal("A"))],
                TerminalOperation::Count,
            ),
            &StreamConfiguration::of(),
        )
        .expect("renders");

    assert_eq!(rendered.root(), ResultRoot::Entity("Person"));
    assert!(matches!(
        rendered.apply_terminal().expect("counts"),
        TerminalOutput::Count(5)
    ));
}

#[test]
fn count_after_residual_filter_counts_entities() {
    let renderer = Renderer::new(MemoryEngine::new(people()));
    let only_even: IntermediateOperation =
        IntermediateOperation::Filter(Filter::Closure(Rc::new(|element: &Element| {
            element
                .downcast_ref::<Person>()
                .is_some_and(|person| person.id % 2 == 0)
        })));

    let output = run(&renderer, vec![filter(NAME.equal("A")), only_even], TerminalOperation::Count)
        .expect("counts");

    assert!(matches!(output, TerminalOutput::Count(3)));
}

#[test]
fn sorted_desc_with_limit_keeps_nulls_last() {
    let mut rows = people();
    rows.push(person(9, "D", None));
    let renderer = Renderer::new(MemoryEngine::new(rows));

    let output = run(
        &renderer,
        vec![
            IntermediateOperation::Sorted(Sort::Fields(AGE.reversed())),
            IntermediateOperation::Limit(10),
        ],
        TerminalOperation::ToArray,
    )
    .expect("renders");

    assert_eq!(ids(output), [8, 5, 2, 1, 6, 3, 4, 7, 9]);
}

#[test]
fn residual_semantics_match_unoptimized_execution() {
    let peeked = Rc::new(Cell::new(0));
    let operations = || {
        let peeked = Rc::clone(&peeked);
        vec![
            IntermediateOperation::Limit(7),
            IntermediateOperation::Peek(Rc::new(RefCell::new(move |_: &Element| {
                peeked.set(peeked.get() + 1);
            }))),
            filter(AGE.greater_or_equal(19)),
            IntermediateOperation::Sorted(Sort::Fields(NAME.comparator().then_comparing(AGE.reversed()))),
            distinct_by_name(),
            IntermediateOperation::Unordered,
            IntermediateOperation::Skip(1),
        ]
    };

    let optimized = Renderer::new(MemoryEngine::new(people()));
    let plain = Renderer::with_config(MemoryEngine::new(people()), unoptimized());

    let fast = ids(run(&optimized, operations(), TerminalOperation::ToArray).expect("renders"));
    let peeks_after_optimized = peeked.get();
    let slow = ids(run(&plain, operations(), TerminalOperation::ToArray).expect("renders"));

    assert_eq!(fast, slow);
    assert_eq!(fast, [2]);
    assert_eq!(peeks_after_optimized, 0);
    assert_eq!(peeked.get(), 7);
}

#[test]
fn map_and_flat_map_change_the_element_type() {
    let renderer = Renderer::new(MemoryEngine::new(people()));

    let output = run(
        &renderer,
        vec![
            filter(NAME.equal("B").or(AGE.less_than(15))),
            IntermediateOperation::Map(Rc::new(|element: Element| {
                let name = element
                    .downcast::<Person>()
                    .map(|person| person.name)
                    .unwrap_or_default();
                Box::new(name) as Element
            })),
            IntermediateOperation::FlatMap(Rc::new(|element: Element| {
                let name = element.downcast::<String>().map(|name| *name).unwrap_or_default();
                Box::new([name.clone(), name].into_iter().map(|part| Box::new(part) as Element))
                    as crate::pipeline::Elements
            })),
        ],
        TerminalOperation::ToArray,
    )
    .expect("renders");

    let TerminalOutput::Collection(items) = output else {
        panic!("expected a collection");
    };
    let names: Vec<&String> = items
        .iter()
        .filter_map(|item| item.downcast_ref::<String>())
        .collect();
    assert_eq!(names, ["B", "B", "A", "A"]);
}

#[test]
fn engine_failure_passes_through_with_source() {
    let renderer = Renderer::new(MemoryEngine::new(people()).failing("connection reset"));

    let err = run(&renderer, vec![filter(AGE.greater_than(1))], TerminalOperation::ToArray)
        .expect_err("engine fails");

    assert!(err.is_engine());
    let source = std::error::Error::source(&err).expect("source kept");
    assert_eq!(source.to_string(), "memory engine failure: connection reset");
    assert_eq!(renderer.engine().executions(), 1);
}

#[test]
fn numeric_specialization_fails_before_the_engine_runs() {
    let renderer = Renderer::new(MemoryEngine::new(people()));
    let mut linked = Pipeline::<Person>::new();
    linked.append(filter(AGE.greater_than(1))).expect("open");
    linked
        .link(IntermediateOperation::MapToNumeric(
            NumericKind::I64,
            Rc::new(|element: Element| element),
        ))
        .expect("open");

    let err = renderer
        .render(linked, &StreamConfiguration::of())
        .expect_err("unsupported");

    assert!(err.is_unsupported_operation());
    assert_eq!(err.message, "operation [map_to_i64] is not supported");
    assert_eq!(renderer.engine().executions(), 0);
}

#[test]
fn pipeline_without_terminal_is_rejected() {
    let renderer = Renderer::new(MemoryEngine::new(people()));

    let err = renderer
        .render(Pipeline::<Person>::new(), &StreamConfiguration::of())
        .expect_err("no terminal");

    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert_eq!(err.origin, ErrorOrigin::Render);
    assert_eq!(renderer.engine().executions(), 0);
}

#[test]
fn unsupported_predicate_surfaces_from_render() {
    let renderer = Renderer::new(MemoryEngine::new(people()).without_or());

    let err = run(
        &renderer,
        vec![filter(AGE.less_than(20).or(NAME.equal("B")))],
        TerminalOperation::ToArray,
    )
    .expect_err("or unsupported");

    assert_eq!(err.unsupported_predicate_kind(), Some("OR"));
    assert_eq!(renderer.engine().executions(), 0);
}

#[test]
fn compile_exposes_the_merge_without_executing() {
    let renderer = Renderer::new(MemoryEngine::new(people()));
    let input = pipeline(
        vec![
            IntermediateOperation::Peek(Rc::new(RefCell::new(|_: &Element| {}))),
            filter(AGE.greater_than(18)),
            IntermediateOperation::Limit(2),
        ],
        TerminalOperation::ToArray,
    );

    let merged = renderer
        .compile(&input, &StreamConfiguration::of().joining("orders"))
        .expect("compiles");

    assert!(merged.pipeline.operations().is_empty());
    assert_eq!(merged.query.conditions.len(), 1);
    assert_eq!(merged.query.bounds.limit, Some(2));
    assert_eq!(merged.query.joins, ["orders"]);
    assert_eq!(input.operations().len(), 3);
    assert_eq!(renderer.engine().executions(), 0);
}

#[test]
fn find_first_and_matches_short_circuit_on_residual() {
    let renderer = Renderer::new(MemoryEngine::new(people()));

    let first = run(
        &renderer,
        vec![IntermediateOperation::Sorted(Sort::Fields(AGE.comparator()))],
        TerminalOperation::FindFirst,
    )
    .expect("renders");
    let TerminalOutput::Optional(Some(first)) = first else {
        panic!("expected an element");
    };
    assert_eq!(first.downcast_ref::<Person>().map(|p| p.id), Some(4));

    let any_b = run(
        &renderer,
        Vec::new(),
        TerminalOperation::AnyMatch(Rc::new(|element: &Element| {
            element
                .downcast_ref::<Person>()
                .is_some_and(|person| person.name == "B")
        })),
    )
    .expect("renders");
    assert!(matches!(any_b, TerminalOutput::Bool(true)));
}

///
/// RecordingSink
///

struct RecordingSink {
    events: Mutex<Vec<RenderEvent>>,
}

impl RenderSink for RecordingSink {
    fn on_event(&self, event: RenderEvent) {
        self.events.lock().expect("sink lock").push(event);
    }
}

static COUNT_SINK: RecordingSink = RecordingSink {
    events: Mutex::new(Vec::new()),
};

static ERROR_SINK: RecordingSink = RecordingSink {
    events: Mutex::new(Vec::new()),
};

#[test]
fn sink_observes_start_merge_and_finish() {
    let renderer = Renderer::new(MemoryEngine::new(people())).with_sink(&COUNT_SINK);

    let output = run(&renderer, vec![filter(NAME.equal("A"))], TerminalOperation::Count)
        .expect("counts");
    assert!(matches!(output, TerminalOutput::Count(6)));

    let events = COUNT_SINK.events.lock().expect("sink lock").clone();
    assert_eq!(
        events,
        [
            RenderEvent::Start {
                root: "Person",
                operations: 1,
            },
            RenderEvent::Merged {
                root: "Person",
                pushed: 1,
                residual: 0,
                count_projection: true,
            },
            RenderEvent::Finish {
                root: "Person",
                count_root: true,
            },
        ]
    );
}

#[test]
fn sink_observes_errors() {
    let renderer =
        Renderer::new(MemoryEngine::new(people()).failing("timeout")).with_sink(&ERROR_SINK);

    run(&renderer, Vec::new(), TerminalOperation::ToArray).expect_err("engine fails");

    let events = ERROR_SINK.events.lock().expect("sink lock").clone();
    assert_eq!(
        events.last(),
        Some(&RenderEvent::Error {
            root: "Person",
            class: ErrorClass::Engine,
            origin: ErrorOrigin::Engine,
        })
    );
}

#[test]
fn count_falls_back_to_entities_when_the_engine_refuses_projection() {
    let renderer = Renderer::new(MemoryEngine::new(people()).without_count_projection());
    let rendered = renderer
        .render(
            pipeline(
                vec![filter(AGE.greater_than(18)), filter(NAME.equal("A"))],
                TerminalOperation::Count,
            ),
            &StreamConfiguration::of(),
        )
        .expect("renders");

    assert_eq!(rendered.root(), ResultRoot::Entity("Person"));
    assert!(matches!(
        rendered.apply_terminal().expect("counts"),
        TerminalOutput::Count(5)
    ));
    assert_eq!(renderer.engine().executions(), 1);
}

#[test]
fn mixed_integer_and_float_fields_sort_in_process_and_natively() {
    let renderer = Renderer::new(MemoryEngine::new(readings()));

    for closure_first in [true, false] {
        let amounts = sorted_amounts(&renderer, closure_first);

        assert_eq!(amounts.len(), 64);
        for pair in amounts.windows(2) {
            assert_ne!(pair[0].canonical_cmp(&pair[1]), Ordering::Greater);
        }
        assert_eq!(amounts[0], Value::Int((1 << 53) - 15));
        assert_eq!(amounts[63], Value::Int((1 << 53) + 15));
    }
}
