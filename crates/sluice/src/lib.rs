//! ## Crate layout
//! - `core`: pipelines, predicates, optimizers, merge strategies, the
//!   renderer and the typed stream front-end.
//!
//! Engine adapters implement `core::engine::{QueryEngine, NativeQuery,
//! PredicateNodes}`; application code mostly needs the `prelude`.

pub use sluice_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::{
    config::{ConfigError, RenderConfig},
    error::Error,
};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        engine::{QueryEngine as _, StreamConfiguration},
        field::Field,
        order::{FieldComparator, FieldOrdering, NullOrder, OrderDirection},
        predicate::{Inclusion, Predicate},
        render::Renderer,
        stream::QueryStream,
        traits::Entity,
        value::Value,
    };
}
