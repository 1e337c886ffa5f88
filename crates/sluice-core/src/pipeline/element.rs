use crate::error::BoxError;
use std::{any::Any, cell::RefCell, cmp::Ordering, rc::Rc};

/// Type-erased pipeline element.
///
/// Operations may change the element type (`map`, `flat_map`), so the
/// pipeline stores elements behind `Any`; the typed `QueryStream` front-end
/// guarantees every downcast it performs.
pub type Element = Box<dyn Any>;

/// Lazy, type-erased element sequence.
pub type Elements = Box<dyn Iterator<Item = Element>>;

pub type ElementFn = Rc<dyn Fn(Element) -> Element>;
pub type ElementTest = Rc<dyn Fn(&Element) -> bool>;
pub type ElementFlatMap = Rc<dyn Fn(Element) -> Elements>;
pub type ElementCmp = Rc<dyn Fn(&Element, &Element) -> Ordering>;
pub type ElementAction = Rc<RefCell<dyn FnMut(&Element)>>;
pub type ElementReducer = Rc<dyn Fn(Element, Element) -> Element>;
pub type ElementSupplier = Rc<dyn Fn() -> Element>;
pub type ElementCollector = Rc<dyn Fn(Elements) -> Element>;

/// Builds a fresh first-seen membership test for one execution.
pub type DistinctFactory = Rc<dyn Fn() -> Box<dyn FnMut(&Element) -> bool>>;

/// Callback run once when the pipeline closes.
pub type CloseHandler = Rc<dyn Fn() -> Result<(), BoxError>>;
