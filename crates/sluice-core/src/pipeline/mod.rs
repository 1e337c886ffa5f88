//! Module: pipeline
//! Responsibility: the operation-pipeline data model and its lifecycle.
//! Does not own: rewriting (see `optimize`, `merge`) or execution (see `render`).

mod element;
mod intermediate;
mod terminal;


use crate::{error::Error, traits::Entity};
use std::{fmt, marker::PhantomData};
use tracing::warn;

// re-exports
pub use element::{
    CloseHandler, DistinctFactory, Element, ElementAction, ElementCmp, ElementCollector,
    ElementFlatMap, ElementFn, ElementReducer, ElementSupplier, ElementTest, Elements,
};
pub use intermediate::{Filter, IntermediateKind, IntermediateOperation, NumericKind, Sort};
pub use terminal::{ResultArity, TerminalKind, TerminalOperation, TerminalOutput};

///
/// PipelineState
///
/// OPEN accepts appends. LINKED follows a numeric specialization, CONSUMED
/// follows the terminal, CLOSED follows `close`. Only OPEN is mutable.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum PipelineState {
    #[default]
    Open,
    Linked,
    Consumed,
    Closed,
}

impl PipelineState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Linked => "linked",
            Self::Consumed => "consumed",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// Pipeline
///
/// Ordered intermediate operations over root entity `E`, at most one
/// terminal operation, execution flags and close handlers.
///

pub struct Pipeline<E> {
    operations: Vec<IntermediateOperation>,
    terminal: Option<TerminalOperation>,
    parallel: bool,
    ordered: bool,
    close_handlers: Vec<CloseHandler>,
    state: PipelineState,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Pipeline<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
            terminal: None,
            parallel: false,
            ordered: true,
            close_handlers: Vec::new(),
            state: PipelineState::Open,
            _marker: PhantomData,
        }
    }

    /// Append an intermediate operation.
    pub fn append(&mut self, operation: IntermediateOperation) -> Result<(), Error> {
        self.ensure_open("append an operation")?;
        self.operations.push(operation);

        Ok(())
    }

    /// Append a numeric specialization and move to LINKED.
    ///
    /// The operation is recorded so the renderer can report it; nothing may
    /// be appended afterwards.
    pub fn link(&mut self, operation: IntermediateOperation) -> Result<(), Error> {
        self.ensure_open("link a numeric specialization")?;
        self.operations.push(operation);
        self.state = PipelineState::Linked;

        Ok(())
    }

    /// Record the terminal operation and move to CONSUMED.
    pub fn set_terminal(&mut self, terminal: TerminalOperation) -> Result<(), Error> {
        self.ensure_open("set the terminal operation")?;
        self.terminal = Some(terminal);
        self.state = PipelineState::Consumed;

        Ok(())
    }

    /// Register a close handler.
    pub fn on_close(&mut self, handler: CloseHandler) -> Result<(), Error> {
        if self.state == PipelineState::Closed {
            return Err(Error::invalid_state(self.state, "register a close handler"));
        }
        self.close_handlers.push(handler);

        Ok(())
    }

    /// Run every close handler once, in registration order.
    ///
    /// All handlers run even when some fail; failures are reported together.
    /// Closing a closed pipeline is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        self.state = PipelineState::Closed;

        let mut failures = Vec::new();
        for (index, handler) in std::mem::take(&mut self.close_handlers)
            .into_iter()
            .enumerate()
        {
            if let Err(err) = handler() {
                warn!(handler = index, error = %err, "close handler failed");
                failures.push(err.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::close_handlers(failures))
        }
    }

    pub const fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub const fn set_ordered(&mut self, ordered: bool) {
        self.ordered = ordered;
    }

    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.parallel
    }

    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered
    }

    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    #[must_use]
    pub fn operations(&self) -> &[IntermediateOperation] {
        &self.operations
    }

    #[must_use]
    pub const fn terminal(&self) -> Option<&TerminalOperation> {
        self.terminal.as_ref()
    }

    #[must_use]
    pub fn close_handler_count(&self) -> usize {
        self.close_handlers.len()
    }

    /// Operation list for rewrites; bypasses the lifecycle guard because
    /// optimizers and merge strategies work on owned copies.
    pub(crate) const fn operations_mut(&mut self) -> &mut Vec<IntermediateOperation> {
        &mut self.operations
    }

    pub(crate) fn take_terminal(&mut self) -> Option<TerminalOperation> {
        self.terminal.take()
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), Error> {
        if self.state == PipelineState::Open {
            Ok(())
        } else {
            Err(Error::invalid_state(self.state, action))
        }
    }
}

impl<E: Entity> Pipeline<E> {
    /// Entity name the native query is rooted at.
    #[must_use]
    pub const fn root_name(&self) -> &'static str {
        E::ENTITY_NAME
    }
}

impl<E> Default for Pipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Pipeline<E> {
    fn clone(&self) -> Self {
        Self {
            operations: self.operations.clone(),
            terminal: self.terminal.clone(),
            parallel: self.parallel,
            ordered: self.ordered,
            close_handlers: self.close_handlers.clone(),
            state: self.state,
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Pipeline<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("operations", &self.operations)
            .field("terminal", &self.terminal)
            .field("parallel", &self.parallel)
            .field("ordered", &self.ordered)
            .field("close_handlers", &self.close_handlers.len())
            .field("state", &self.state)
            .finish()
    }
}
