//! Module: render
//! Responsibility: optimize, merge, execute, apply the residual pipeline and
//! hand the terminal its input.
//! Does not own: the rewrite rules themselves (see `optimize`, `merge`).

mod residual;

#[cfg(test)]
mod tests;

use crate::{
    config::RenderConfig,
    engine::{NativeQuery, QueryEngine, QueryRows, StreamConfiguration},
    error::Error,
    merge::{MergeResult, Merger},
    obs::{RenderScope, RenderSink},
    optimize::PreOptimizerChain,
    pipeline::{
        Element, Elements, IntermediateOperation, Pipeline, TerminalOperation, TerminalOutput,
    },
    traits::Entity,
};
use residual::apply_residual;
use std::fmt;
use tracing::{debug, debug_span};

///
/// ResultRoot
///
/// What the elements of a render result are: root entities, or count
/// aggregate values produced by a count projection.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResultRoot {
    Entity(&'static str),
    Count,
}

///
/// RenderResult
///
/// Transient output of a render: the declared root, the residual element
/// sequence and the terminal that consumes it.
///

pub struct RenderResult {
    root: ResultRoot,
    elements: Elements,
    terminal: TerminalOperation,
}

impl RenderResult {
    #[must_use]
    pub const fn root(&self) -> ResultRoot {
        self.root
    }

    #[must_use]
    pub const fn terminal(&self) -> &TerminalOperation {
        &self.terminal
    }

    #[must_use]
    pub fn into_parts(self) -> (ResultRoot, Elements, TerminalOperation) {
        (self.root, self.elements, self.terminal)
    }

    /// Run the terminal over the residual elements.
    ///
    /// A count root is answered by summing the aggregate values.
    pub fn apply_terminal(self) -> Result<TerminalOutput, Error> {
        match (self.root, self.terminal) {
            (ResultRoot::Count, TerminalOperation::Count) => {
                let mut total: u64 = 0;
                for element in self.elements {
                    let count = element.downcast_ref::<u64>().ok_or_else(|| {
                        Error::render_invariant("count aggregate produced a non-count value")
                    })?;
                    total = total.saturating_add(*count);
                }

                Ok(TerminalOutput::Count(total))
            }
            (ResultRoot::Count, terminal) => Err(Error::render_invariant(format!(
                "count aggregate cannot feed terminal {}",
                terminal.kind()
            ))),
            (ResultRoot::Entity(_), terminal) => Ok(terminal.apply(self.elements)),
        }
    }
}

impl fmt::Debug for RenderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderResult")
            .field("root", &self.root)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

///
/// Renderer
///
/// Owns the native engine and the configured rewrite chains.
///

pub struct Renderer<G> {
    engine: G,
    config: RenderConfig,
    optimizers: PreOptimizerChain,
    merger: Merger,
    sink: Option<&'static dyn RenderSink>,
}

impl<G> Renderer<G> {
    #[must_use]
    pub fn new(engine: G) -> Self {
        Self::with_config(engine, RenderConfig::default())
    }

    #[must_use]
    pub fn with_config(engine: G, config: RenderConfig) -> Self {
        Self {
            engine,
            optimizers: config.optimizer_chain(),
            merger: config.merger(),
            config,
            sink: None,
        }
    }

    /// Attach a render event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: &'static dyn RenderSink) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub const fn engine(&self) -> &G {
        &self.engine
    }

    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Optimize and merge without executing.
    pub fn compile<E>(
        &self,
        pipeline: &Pipeline<E>,
        configuration: &StreamConfiguration<E>,
    ) -> Result<MergeResult<E, G::Query>, Error>
    where
        E: Entity,
        G: QueryEngine<E>,
    {
        Self::check_renderable(pipeline)?;
        let optimized = self.optimizers.optimize(pipeline.clone());
        let query = self.engine.new_query(configuration);

        self.merger.merge(self.engine.nodes(), &optimized, &query)
    }

    /// Compile, execute and apply the residual pipeline.
    ///
    /// Nothing reaches the engine unless the pipeline has a terminal and no
    /// numeric specialization. Engine failures are returned unchanged and are
    /// never retried.
    pub fn render<E>(
        &self,
        pipeline: Pipeline<E>,
        configuration: &StreamConfiguration<E>,
    ) -> Result<RenderResult, Error>
    where
        E: Entity,
        G: QueryEngine<E>,
    {
        let span = debug_span!("render", root = E::ENTITY_NAME);
        let _enter = span.enter();

        let scope = RenderScope::start(self.sink, E::ENTITY_NAME, pipeline.operations().len());
        let result = self.render_inner(pipeline, configuration, scope.as_ref());

        match (&result, scope) {
            (Ok(rendered), Some(scope)) => scope.finish(rendered.root == ResultRoot::Count),
            (Err(err), Some(scope)) => scope.error(err),
            (_, None) => {}
        }

        result
    }

    fn render_inner<E>(
        &self,
        pipeline: Pipeline<E>,
        configuration: &StreamConfiguration<E>,
        scope: Option<&RenderScope>,
    ) -> Result<RenderResult, Error>
    where
        E: Entity,
        G: QueryEngine<E>,
    {
        Self::check_renderable(&pipeline)?;

        let optimized = self.optimizers.optimize(pipeline);
        let query = self.engine.new_query(configuration);
        let MergeResult {
            pipeline: mut reduced,
            query,
        } = self.merger.merge(self.engine.nodes(), &optimized, &query)?;

        let pushed = optimized.operations().len() - reduced.operations().len();
        let count_projection = query.is_count_projection();
        debug!(
            pushed,
            residual = reduced.operations().len(),
            count_projection,
            "pipeline merged"
        );
        if let Some(scope) = scope {
            scope.merged(pushed, reduced.operations().len(), count_projection);
        }

        let rows = self.engine.execute(query).map_err(Error::engine)?;

        let terminal = reduced
            .take_terminal()
            .ok_or_else(|| Error::render_invariant("pipeline has no terminal operation"))?;

        let (root, source): (ResultRoot, Elements) = match rows {
            QueryRows::Entities(rows) => (
                ResultRoot::Entity(E::ENTITY_NAME),
                Box::new(rows.map(|entity| Box::new(entity) as Element)),
            ),
            QueryRows::Counts(counts) if count_projection && reduced.operations().is_empty() => (
                ResultRoot::Count,
                Box::new(counts.into_iter().map(|count| Box::new(count) as Element)),
            ),
            QueryRows::Counts(_) => {
                return Err(Error::render_invariant(
                    "engine returned count aggregates for a row query",
                ));
            }
        };

        let elements = apply_residual::<E>(source, reduced.operations())?;

        Ok(RenderResult {
            root,
            elements,
            terminal,
        })
    }

    fn check_renderable<E>(pipeline: &Pipeline<E>) -> Result<(), Error> {
        if let Some(IntermediateOperation::MapToNumeric(kind, _)) = pipeline
            .operations()
            .iter()
            .find(|operation| matches!(operation, IntermediateOperation::MapToNumeric(..)))
        {
            return Err(Error::unsupported_operation(kind.operation_name()));
        }

        if pipeline.terminal().is_none() {
            return Err(Error::render_invariant("pipeline has no terminal operation"));
        }

        Ok(())
    }
}

impl<G: fmt::Debug> fmt::Debug for Renderer<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
