//! Module: stream
//! Responsibility: typed, fluent construction of pipelines and typed terminal
//! results.
//! Does not own: rewriting or execution (see `render`).
//!
//! A `QueryStream` owns its pipeline. Intermediate operations consume the
//! stream and return a new one; terminals consume it for good, so reusing a
//! linked or consumed stream does not compile.

mod split;


use crate::{
    engine::{QueryEngine, StreamConfiguration},
    error::{BoxError, Error},
    order::FieldComparator,
    pipeline::{
        Element, ElementAction, ElementCmp, ElementFn, ElementReducer, ElementTest, Elements,
        Filter,
        IntermediateOperation, NumericKind, Pipeline, ResultArity, Sort, TerminalOperation,
        TerminalOutput,
    },
    predicate::Predicate,
    render::{RenderResult, Renderer},
    traits::Entity,
};
use std::{
    cell::RefCell, cmp::Ordering, collections::HashSet, convert::Infallible, fmt, hash::Hash,
    marker::PhantomData, rc::Rc,
};
use tracing::warn;

// re-exports
pub use split::{Split, StreamIter};

///
/// QueryStream
///
/// Lazy stream over root entity `E` whose current element type is `T`.
///
/// Operation failures are recorded and surfaced by the terminal. Dropping a
/// stream without a terminal closes it.
///

pub struct QueryStream<'r, G, E, T = E> {
    renderer: &'r Renderer<G>,
    configuration: StreamConfiguration<E>,
    pipeline: Pipeline<E>,
    failure: Option<Error>,
    _marker: PhantomData<fn() -> T>,
}

impl<G> Renderer<G> {
    /// Start a stream over `E`.
    #[must_use]
    pub fn stream<E: Entity>(&self, configuration: StreamConfiguration<E>) -> QueryStream<'_, G, E> {
        QueryStream::new(self, configuration)
    }
}

impl<'r, G, E: Entity> QueryStream<'r, G, E> {
    #[must_use]
    pub fn new(renderer: &'r Renderer<G>, configuration: StreamConfiguration<E>) -> Self {
        Self {
            renderer,
            configuration,
            pipeline: Pipeline::new(),
            failure: None,
            _marker: PhantomData,
        }
    }

    /// Keep entities matching `predicate`; pushable.
    #[must_use]
    pub fn filter(self, predicate: impl Into<Predicate>) -> Self {
        self.push(IntermediateOperation::Filter(Filter::Predicate(
            predicate.into(),
        )))
    }

    /// Sort entities by field; pushable.
    #[must_use]
    pub fn sorted_by_field(self, comparator: FieldComparator) -> Self {
        self.push(IntermediateOperation::Sorted(Sort::Fields(comparator)))
    }
}

impl<'r, G, E: Entity, T: 'static> QueryStream<'r, G, E, T> {
    /// Keep elements accepted by `test`; evaluated in process.
    #[must_use]
    pub fn filter_by(self, test: impl Fn(&T) -> bool + 'static) -> Self {
        self.push(IntermediateOperation::Filter(Filter::Closure(Rc::new(
            move |element: &Element| element.downcast_ref::<T>().is_some_and(&test),
        ))))
    }

    #[must_use]
    pub fn map<U: 'static>(self, map: impl Fn(T) -> U + 'static) -> QueryStream<'r, G, E, U> {
        self.push(IntermediateOperation::Map(Rc::new(move |element: Element| {
            match element.downcast::<T>() {
                Ok(value) => Box::new(map(*value)) as Element,
                Err(element) => element,
            }
        })))
        .retype()
    }

    #[must_use]
    pub fn flat_map<U, I>(self, map: impl Fn(T) -> I + 'static) -> QueryStream<'r, G, E, U>
    where
        U: 'static,
        I: IntoIterator<Item = U>,
        I::IntoIter: 'static,
    {
        self.push(IntermediateOperation::FlatMap(Rc::new(
            move |element: Element| -> Elements {
                match element.downcast::<T>() {
                    Ok(value) => Box::new(
                        map(*value)
                            .into_iter()
                            .map(|item| Box::new(item) as Element),
                    ),
                    Err(_) => Box::new(std::iter::empty()),
                }
            },
        )))
        .retype()
    }

    /// Keep the first occurrence of each element.
    #[must_use]
    pub fn distinct(self) -> Self
    where
        T: Clone + Eq + Hash,
    {
        self.push(IntermediateOperation::Distinct(Rc::new(
            || -> Box<dyn FnMut(&Element) -> bool> {
                let mut seen = HashSet::<T>::new();
                Box::new(move |element: &Element| {
                    element
                        .downcast_ref::<T>()
                        .is_none_or(|value| seen.insert(value.clone()))
                })
            },
        )))
    }

    /// Sort by the natural order of `T`; evaluated in process.
    #[must_use]
    pub fn sorted(self) -> Self
    where
        T: Ord,
    {
        self.push(IntermediateOperation::Sorted(Sort::Natural(element_cmp(
            T::cmp,
        ))))
    }

    #[must_use]
    pub fn sorted_by(self, cmp: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        self.push(IntermediateOperation::Sorted(Sort::Custom(element_cmp(cmp))))
    }

    #[must_use]
    pub fn peek(self, mut action: impl FnMut(&T) + 'static) -> Self {
        self.push(IntermediateOperation::Peek(Rc::new(RefCell::new(
            move |element: &Element| {
                if let Some(value) = element.downcast_ref::<T>() {
                    action(value);
                }
            },
        ))))
    }

    #[must_use]
    pub fn limit(self, count: u64) -> Self {
        self.push(IntermediateOperation::Limit(count))
    }

    #[must_use]
    pub fn skip(self, count: u64) -> Self {
        self.push(IntermediateOperation::Skip(count))
    }

    #[must_use]
    pub fn unordered(self) -> Self {
        self.push(IntermediateOperation::Unordered)
    }

    #[must_use]
    pub fn parallel(mut self) -> Self {
        self.pipeline.set_parallel(true);
        self
    }

    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.pipeline.set_parallel(false);
        self
    }

    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.pipeline.is_parallel()
    }

    /// Register a handler run when the stream is closed.
    #[must_use]
    pub fn on_close(mut self, handler: impl Fn() -> Result<(), BoxError> + 'static) -> Self {
        if self.failure.is_none()
            && let Err(err) = self.pipeline.on_close(Rc::new(handler))
        {
            self.failure = Some(err);
        }
        self
    }

    /// Pipeline built so far.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline<E> {
        &self.pipeline
    }

    /// Close the stream without running it.
    pub fn close(mut self) -> Result<(), Error> {
        self.pipeline.close()
    }

    // Numeric streams are not supported: the stream is linked, the call
    // fails before anything executes and the stream closes on drop.

    pub fn map_to_i32(self, map: impl Fn(T) -> i32 + 'static) -> Result<Infallible, Error> {
        self.link_numeric(NumericKind::I32, map_numeric(map))
    }

    pub fn map_to_i64(self, map: impl Fn(T) -> i64 + 'static) -> Result<Infallible, Error> {
        self.link_numeric(NumericKind::I64, map_numeric(map))
    }

    pub fn map_to_f64(self, map: impl Fn(T) -> f64 + 'static) -> Result<Infallible, Error> {
        self.link_numeric(NumericKind::F64, map_numeric(map))
    }

    pub fn flat_map_to_i32<I>(self, map: impl Fn(T) -> I + 'static) -> Result<Infallible, Error>
    where
        I: IntoIterator<Item = i32>,
    {
        self.link_numeric(NumericKind::FlatI32, flat_map_numeric(map))
    }

    pub fn flat_map_to_i64<I>(self, map: impl Fn(T) -> I + 'static) -> Result<Infallible, Error>
    where
        I: IntoIterator<Item = i64>,
    {
        self.link_numeric(NumericKind::FlatI64, flat_map_numeric(map))
    }

    pub fn flat_map_to_f64<I>(self, map: impl Fn(T) -> I + 'static) -> Result<Infallible, Error>
    where
        I: IntoIterator<Item = f64>,
    {
        self.link_numeric(NumericKind::FlatF64, flat_map_numeric(map))
    }

    fn link_numeric(mut self, kind: NumericKind, map: ElementFn) -> Result<Infallible, Error> {
        if let Some(err) = self.failure.take() {
            return Err(err);
        }

        self.pipeline.link(IntermediateOperation::MapToNumeric(kind, map))?;

        Err(Error::unsupported_operation(kind.operation_name()))
    }

    fn push(mut self, operation: IntermediateOperation) -> Self {
        if self.failure.is_none()
            && let Err(err) = self.pipeline.append(operation)
        {
            self.failure = Some(err);
        }
        self
    }

    fn retype<U>(mut self) -> QueryStream<'r, G, E, U> {
        QueryStream {
            renderer: self.renderer,
            configuration: self.configuration.clone(),
            pipeline: std::mem::take(&mut self.pipeline),
            failure: self.failure.take(),
            _marker: PhantomData,
        }
    }
}

///
/// TERMINALS
///

impl<G, E, T> QueryStream<'_, G, E, T>
where
    G: QueryEngine<E>,
    E: Entity,
    T: 'static,
{
    pub fn count(self) -> Result<u64, Error> {
        match self.terminate(TerminalOperation::Count)? {
            TerminalOutput::Count(count) => Ok(count),
            output => Err(unexpected(&output, ResultArity::Count)),
        }
    }

    pub fn to_vec(self) -> Result<Vec<T>, Error> {
        match self.terminate(TerminalOperation::ToArray)? {
            TerminalOutput::Collection(items) => items.into_iter().map(unpack).collect(),
            output => Err(unexpected(&output, ResultArity::Collection)),
        }
    }

    pub fn for_each(self, action: impl FnMut(&T) + 'static) -> Result<(), Error> {
        self.terminate(TerminalOperation::ForEach(element_action(action)))
            .map(drop)
    }

    pub fn for_each_ordered(self, action: impl FnMut(&T) + 'static) -> Result<(), Error> {
        self.terminate(TerminalOperation::ForEachOrdered(element_action(action)))
            .map(drop)
    }

    /// Fold every element into `identity`.
    pub fn reduce_from(
        self,
        identity: T,
        accumulate: impl Fn(T, T) -> T + 'static,
    ) -> Result<T, Error>
    where
        T: Clone,
    {
        let terminal = TerminalOperation::Reduce {
            identity: Some(Rc::new(move || Box::new(identity.clone()) as Element)),
            accumulate: element_reducer(accumulate),
        };

        match self.terminate(terminal)? {
            TerminalOutput::Single(value) => unpack(value),
            output => Err(unexpected(&output, ResultArity::Single)),
        }
    }

    pub fn reduce(self, accumulate: impl Fn(T, T) -> T + 'static) -> Result<Option<T>, Error> {
        let terminal = TerminalOperation::Reduce {
            identity: None,
            accumulate: element_reducer(accumulate),
        };

        self.terminate_optional(terminal)
    }

    /// Collect every element into `C`.
    pub fn collect<C: FromIterator<T> + 'static>(self) -> Result<C, Error> {
        let collector = Rc::new(|elements: Elements| {
            Box::new(
                elements
                    .filter_map(|element| element.downcast::<T>().ok())
                    .map(|value| *value)
                    .collect::<C>(),
            ) as Element
        });

        match self.terminate(TerminalOperation::Collect(collector))? {
            TerminalOutput::Single(value) => unpack(value),
            output => Err(unexpected(&output, ResultArity::Single)),
        }
    }

    pub fn min(self, cmp: impl Fn(&T, &T) -> Ordering + 'static) -> Result<Option<T>, Error> {
        self.terminate_optional(TerminalOperation::Min(element_cmp(cmp)))
    }

    pub fn max(self, cmp: impl Fn(&T, &T) -> Ordering + 'static) -> Result<Option<T>, Error> {
        self.terminate_optional(TerminalOperation::Max(element_cmp(cmp)))
    }

    pub fn any_match(self, test: impl Fn(&T) -> bool + 'static) -> Result<bool, Error> {
        self.terminate_bool(TerminalOperation::AnyMatch(element_test(test)))
    }

    pub fn all_match(self, test: impl Fn(&T) -> bool + 'static) -> Result<bool, Error> {
        self.terminate_bool(TerminalOperation::AllMatch(element_test(test)))
    }

    pub fn none_match(self, test: impl Fn(&T) -> bool + 'static) -> Result<bool, Error> {
        self.terminate_bool(TerminalOperation::NoneMatch(element_test(test)))
    }

    pub fn find_first(self) -> Result<Option<T>, Error> {
        self.terminate_optional(TerminalOperation::FindFirst)
    }

    pub fn find_any(self) -> Result<Option<T>, Error> {
        self.terminate_optional(TerminalOperation::FindAny)
    }

    /// Lazy iterator over the result; the stream closes when it is dropped.
    pub fn iter(self) -> Result<StreamIter<E, T>, Error> {
        let (elements, pipeline) = self.terminate_lazy(TerminalOperation::Iterate)?;

        Ok(StreamIter::new(elements, pipeline))
    }

    /// Splittable cursor over the result.
    pub fn split(self) -> Result<Split<E, T>, Error> {
        let (elements, pipeline) = self.terminate_lazy(TerminalOperation::Split)?;

        Ok(Split::new(StreamIter::new(elements, pipeline)))
    }

    fn terminate_optional(self, terminal: TerminalOperation) -> Result<Option<T>, Error> {
        match self.terminate(terminal)? {
            TerminalOutput::Optional(value) => value.map(unpack).transpose(),
            output => Err(unexpected(&output, ResultArity::Optional)),
        }
    }

    fn terminate_bool(self, terminal: TerminalOperation) -> Result<bool, Error> {
        match self.terminate(terminal)? {
            TerminalOutput::Bool(value) => Ok(value),
            output => Err(unexpected(&output, ResultArity::Boolean)),
        }
    }

    // Render, apply the terminal, then close. A terminal failure wins over a
    // close failure.
    fn terminate(mut self, terminal: TerminalOperation) -> Result<TerminalOutput, Error> {
        let rendered = self.render(terminal);
        let output = rendered.and_then(RenderResult::apply_terminal);
        let closed = self.pipeline.close();

        let output = output?;
        closed?;

        Ok(output)
    }

    fn terminate_lazy(
        mut self,
        terminal: TerminalOperation,
    ) -> Result<(Elements, Pipeline<E>), Error> {
        let output = self
            .render(terminal)
            .and_then(RenderResult::apply_terminal);

        match output {
            Ok(TerminalOutput::Sequence(elements)) => {
                Ok((elements, std::mem::take(&mut self.pipeline)))
            }
            Ok(output) => Err(unexpected(&output, ResultArity::Sequence)),
            Err(err) => Err(err),
        }
    }

    fn render(&mut self, terminal: TerminalOperation) -> Result<RenderResult, Error> {
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        self.pipeline.set_terminal(terminal)?;

        self.renderer
            .render(self.pipeline.clone(), &self.configuration)
    }
}

impl<G, E, T> Drop for QueryStream<'_, G, E, T> {
    fn drop(&mut self) {
        if let Err(err) = self.pipeline.close() {
            warn!(error = %err, "closing dropped stream failed");
        }
    }
}

impl<G, E: Entity, T> fmt::Debug for QueryStream<'_, G, E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStream")
            .field("configuration", &self.configuration)
            .field("pipeline", &self.pipeline)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

// element adapters

fn unpack<T: 'static>(element: Element) -> Result<T, Error> {
    element
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| Error::render_invariant("stream element has an unexpected type"))
}

fn unexpected(output: &TerminalOutput, expected: ResultArity) -> Error {
    Error::render_invariant(format!(
        "terminal produced {:?} output, expected {expected:?}",
        output.arity()
    ))
}

fn element_cmp<T: 'static>(cmp: impl Fn(&T, &T) -> Ordering + 'static) -> ElementCmp {
    Rc::new(move |left: &Element, right: &Element| {
        match (left.downcast_ref::<T>(), right.downcast_ref::<T>()) {
            (Some(left), Some(right)) => cmp(left, right),
            _ => Ordering::Equal,
        }
    })
}

fn map_numeric<T: 'static, N: 'static>(map: impl Fn(T) -> N + 'static) -> ElementFn {
    Rc::new(move |element: Element| match element.downcast::<T>() {
        Ok(value) => Box::new(map(*value)) as Element,
        Err(element) => element,
    })
}

fn flat_map_numeric<T: 'static, I>(map: impl Fn(T) -> I + 'static) -> ElementFn
where
    I: IntoIterator,
    I::Item: 'static,
{
    Rc::new(move |element: Element| match element.downcast::<T>() {
        Ok(value) => Box::new(map(*value).into_iter().collect::<Vec<_>>()) as Element,
        Err(element) => element,
    })
}

fn element_test<T: 'static>(test: impl Fn(&T) -> bool + 'static) -> ElementTest {
    Rc::new(move |element: &Element| element.downcast_ref::<T>().is_some_and(&test))
}

fn element_action<T: 'static>(mut action: impl FnMut(&T) + 'static) -> ElementAction {
    Rc::new(RefCell::new(move |element: &Element| {
        if let Some(value) = element.downcast_ref::<T>() {
            action(value);
        }
    }))
}

fn element_reducer<T: 'static>(
    accumulate: impl Fn(T, T) -> T + 'static,
) -> ElementReducer {
    Rc::new(move |left: Element, right: Element| {
        match (left.downcast::<T>(), right.downcast::<T>()) {
            (Ok(left), Ok(right)) => Box::new(accumulate(*left, *right)) as Element,
            (Ok(left), Err(_)) => left as Element,
            (Err(left), _) => left,
        }
    })
}
