use crate::value::Value;

///
/// Entity
///
/// Root type of a pipeline.
/// Field values are exposed by name so predicates and field comparators can be
/// evaluated in process whenever they are not pushed into the native query.
///

pub trait Entity: 'static {
    /// Stable entity name handed to the native engine as the query root.
    const ENTITY_NAME: &'static str;

    /// Current value of `field`, or `None` when the entity has no such field.
    fn field_value(&self, field: &str) -> Option<Value>;
}
