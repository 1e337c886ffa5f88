use crate::pipeline::element::{
    Element, ElementAction, ElementCmp, ElementCollector, ElementReducer, ElementSupplier,
    ElementTest, Elements,
};
use std::{cmp::Ordering, fmt};

///
/// ResultArity
///
/// Declared shape of a terminal's result.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResultArity {
    Void,
    Single,
    Optional,
    Collection,
    Boolean,
    Count,
    Sequence,
}

///
/// TerminalKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TerminalKind {
    ForEach,
    ForEachOrdered,
    ToArray,
    Reduce,
    Collect,
    Min,
    Max,
    Count,
    AnyMatch,
    AllMatch,
    NoneMatch,
    FindFirst,
    FindAny,
    Iterate,
    Split,
}

impl TerminalKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ForEach => "FOR_EACH",
            Self::ForEachOrdered => "FOR_EACH_ORDERED",
            Self::ToArray => "TO_ARRAY",
            Self::Reduce => "REDUCE",
            Self::Collect => "COLLECT",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Count => "COUNT",
            Self::AnyMatch => "ANY_MATCH",
            Self::AllMatch => "ALL_MATCH",
            Self::NoneMatch => "NONE_MATCH",
            Self::FindFirst => "FIND_FIRST",
            Self::FindAny => "FIND_ANY",
            Self::Iterate => "ITERATE",
            Self::Split => "SPLIT",
        }
    }
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// TerminalOperation
///
/// The single consuming operation of a pipeline.
///

#[derive(Clone)]
pub enum TerminalOperation {
    ForEach(ElementAction),
    ForEachOrdered(ElementAction),
    ToArray,
    Reduce {
        identity: Option<ElementSupplier>,
        accumulate: ElementReducer,
    },
    Collect(ElementCollector),
    Min(ElementCmp),
    Max(ElementCmp),
    Count,
    AnyMatch(ElementTest),
    AllMatch(ElementTest),
    NoneMatch(ElementTest),
    FindFirst,
    FindAny,
    Iterate,
    Split,
}

impl TerminalOperation {
    #[must_use]
    pub const fn kind(&self) -> TerminalKind {
        match self {
            Self::ForEach(_) => TerminalKind::ForEach,
            Self::ForEachOrdered(_) => TerminalKind::ForEachOrdered,
            Self::ToArray => TerminalKind::ToArray,
            Self::Reduce { .. } => TerminalKind::Reduce,
            Self::Collect(_) => TerminalKind::Collect,
            Self::Min(_) => TerminalKind::Min,
            Self::Max(_) => TerminalKind::Max,
            Self::Count => TerminalKind::Count,
            Self::AnyMatch(_) => TerminalKind::AnyMatch,
            Self::AllMatch(_) => TerminalKind::AllMatch,
            Self::NoneMatch(_) => TerminalKind::NoneMatch,
            Self::FindFirst => TerminalKind::FindFirst,
            Self::FindAny => TerminalKind::FindAny,
            Self::Iterate => TerminalKind::Iterate,
            Self::Split => TerminalKind::Split,
        }
    }

    #[must_use]
    pub const fn arity(&self) -> ResultArity {
        match self {
            Self::ForEach(_) | Self::ForEachOrdered(_) => ResultArity::Void,
            Self::ToArray => ResultArity::Collection,
            Self::Reduce {
                identity: Some(_), ..
            }
            | Self::Collect(_) => ResultArity::Single,
            Self::Reduce { identity: None, .. }
            | Self::Min(_)
            | Self::Max(_)
            | Self::FindFirst
            | Self::FindAny => ResultArity::Optional,
            Self::Count => ResultArity::Count,
            Self::AnyMatch(_) | Self::AllMatch(_) | Self::NoneMatch(_) => ResultArity::Boolean,
            Self::Iterate | Self::Split => ResultArity::Sequence,
        }
    }

    /// Consume `elements` and produce the terminal's result.
    #[must_use]
    pub fn apply(self, mut elements: Elements) -> TerminalOutput {
        match self {
            Self::ForEach(action) | Self::ForEachOrdered(action) => {
                let mut guard = action.borrow_mut();
                for element in elements {
                    (*guard)(&element);
                }
                TerminalOutput::Void
            }
            Self::ToArray => TerminalOutput::Collection(elements.collect()),
            Self::Reduce {
                identity: Some(identity),
                accumulate,
            } => TerminalOutput::Single(elements.fold(identity(), |acc, e| accumulate(acc, e))),
            Self::Reduce {
                identity: None,
                accumulate,
            } => TerminalOutput::Optional(elements.reduce(|acc, e| accumulate(acc, e))),
            Self::Collect(collector) => TerminalOutput::Single(collector(elements)),
            // first minimal element wins ties
            Self::Min(cmp) => TerminalOutput::Optional(elements.reduce(|best, e| {
                if cmp(&best, &e) == Ordering::Greater {
                    e
                } else {
                    best
                }
            })),
            // first maximal element wins ties
            Self::Max(cmp) => TerminalOutput::Optional(elements.reduce(|best, e| {
                if cmp(&best, &e) == Ordering::Less {
                    e
                } else {
                    best
                }
            })),
            Self::Count => TerminalOutput::Count(elements.fold(0, |count, _| count + 1)),
            Self::AnyMatch(test) => TerminalOutput::Bool(elements.any(|e| test(&e))),
            Self::AllMatch(test) => TerminalOutput::Bool(elements.all(|e| test(&e))),
            Self::NoneMatch(test) => TerminalOutput::Bool(!elements.any(|e| test(&e))),
            Self::FindFirst | Self::FindAny => TerminalOutput::Optional(elements.next()),
            Self::Iterate | Self::Split => TerminalOutput::Sequence(elements),
        }
    }
}

impl fmt::Debug for TerminalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TerminalOperation")
            .field(&self.kind())
            .finish()
    }
}

///
/// TerminalOutput
///
/// Erased result of a terminal operation; the variant always matches the
/// operation's [`ResultArity`].
///

pub enum TerminalOutput {
    Void,
    Count(u64),
    Bool(bool),
    Single(Element),
    Optional(Option<Element>),
    Collection(Vec<Element>),
    Sequence(Elements),
}

impl TerminalOutput {
    #[must_use]
    pub const fn arity(&self) -> ResultArity {
        match self {
            Self::Void => ResultArity::Void,
            Self::Count(_) => ResultArity::Count,
            Self::Bool(_) => ResultArity::Boolean,
            Self::Single(_) => ResultArity::Single,
            Self::Optional(_) => ResultArity::Optional,
            Self::Collection(_) => ResultArity::Collection,
            Self::Sequence(_) => ResultArity::Sequence,
        }
    }
}

impl fmt::Debug for TerminalOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(count) => f.debug_tuple("Count").field(count).finish(),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Collection(items) => f.debug_tuple("Collection").field(&items.len()).finish(),
            other => f.debug_tuple("TerminalOutput").field(&other.arity()).finish(),
        }
    }
}
