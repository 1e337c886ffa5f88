//! Render tracing boundary.
//!
//! Tracing is optional, injected by the caller, and must not affect rendering
//! semantics.

use crate::error::{Error, ErrorClass, ErrorOrigin};

///
/// RenderSink
///

pub trait RenderSink: Send + Sync {
    fn on_event(&self, event: RenderEvent);
}

///
/// RenderEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RenderEvent {
    Start {
        root: &'static str,
        operations: u32,
    },
    Merged {
        root: &'static str,
        pushed: u32,
        residual: u32,
        count_projection: bool,
    },
    Finish {
        root: &'static str,
        count_root: bool,
    },
    Error {
        root: &'static str,
        class: ErrorClass,
        origin: ErrorOrigin,
    },
}

///
/// RenderScope
///

pub(crate) struct RenderScope {
    sink: &'static dyn RenderSink,
    root: &'static str,
}

impl RenderScope {
    pub(crate) fn start(
        sink: Option<&'static dyn RenderSink>,
        root: &'static str,
        operations: usize,
    ) -> Option<Self> {
        let sink = sink?;
        sink.on_event(RenderEvent::Start {
            root,
            operations: saturating_u32(operations),
        });

        Some(Self { sink, root })
    }

    pub(crate) fn merged(&self, pushed: usize, residual: usize, count_projection: bool) {
        self.sink.on_event(RenderEvent::Merged {
            root: self.root,
            pushed: saturating_u32(pushed),
            residual: saturating_u32(residual),
            count_projection,
        });
    }

    pub(crate) fn finish(self, count_root: bool) {
        self.sink.on_event(RenderEvent::Finish {
            root: self.root,
            count_root,
        });
    }

    pub(crate) fn error(self, err: &Error) {
        self.sink.on_event(RenderEvent::Error {
            root: self.root,
            class: err.class,
            origin: err.origin,
        });
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
