//! Core of Sluice: lazy stream pipelines over typed entities, compiled into a
//! single native query wherever possible and finished in process otherwise.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod mapper;
pub mod merge;
pub mod obs;
pub mod optimize;
pub mod order;
pub mod pipeline;
pub mod predicate;
pub mod render;
pub mod stream;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Vocabulary for building and running streams.
/// Engine adapters import from `engine`, `merge` and `render` directly.
///

pub mod prelude {
    pub use crate::{
        engine::StreamConfiguration,
        error::Error,
        field::Field,
        order::{FieldComparator, FieldOrdering, NullOrder, OrderDirection},
        predicate::{Inclusion, Predicate},
        render::Renderer,
        stream::QueryStream,
        traits::Entity,
        value::Value,
    };
}
