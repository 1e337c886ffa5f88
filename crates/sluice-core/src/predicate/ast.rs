use crate::{error::Error, value::Value};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, ops::Not};

///
/// PredicateKind
///
/// Closed set of field predicate kinds.
/// Every kind has exactly one negation partner.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PredicateKind {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Between,
    NotBetween,
    In,
    NotIn,
}

impl PredicateKind {
    pub const ALL: [Self; 10] = [
        Self::Equal,
        Self::NotEqual,
        Self::GreaterThan,
        Self::GreaterOrEqual,
        Self::LessThan,
        Self::LessOrEqual,
        Self::Between,
        Self::NotBetween,
        Self::In,
        Self::NotIn,
    ];

    /// Negation partner; applying it twice yields `self`.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::GreaterThan => Self::LessOrEqual,
            Self::LessOrEqual => Self::GreaterThan,
            Self::GreaterOrEqual => Self::LessThan,
            Self::LessThan => Self::GreaterOrEqual,
            Self::Between => Self::NotBetween,
            Self::NotBetween => Self::Between,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
        }
    }

    /// Operand shape every predicate of this kind must carry.
    #[must_use]
    pub const fn operand_shape(self) -> OperandShape {
        match self {
            Self::Equal
            | Self::NotEqual
            | Self::GreaterThan
            | Self::GreaterOrEqual
            | Self::LessThan
            | Self::LessOrEqual => OperandShape::Value,
            Self::Between | Self::NotBetween => OperandShape::Range,
            Self::In | Self::NotIn => OperandShape::Set,
        }
    }

    /// Scalar comparison operator, for the six comparison kinds.
    #[must_use]
    pub const fn comparison_op(self) -> Option<ComparisonOp> {
        match self {
            Self::Equal => Some(ComparisonOp::Eq),
            Self::NotEqual => Some(ComparisonOp::Ne),
            Self::GreaterThan => Some(ComparisonOp::Gt),
            Self::GreaterOrEqual => Some(ComparisonOp::Ge),
            Self::LessThan => Some(ComparisonOp::Lt),
            Self::LessOrEqual => Some(ComparisonOp::Le),
            Self::Between | Self::NotBetween | Self::In | Self::NotIn => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterOrEqual => "GREATER_OR_EQUAL",
            Self::LessThan => "LESS_THAN",
            Self::LessOrEqual => "LESS_OR_EQUAL",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT_BETWEEN",
            Self::In => "IN",
            Self::NotIn => "NOT_IN",
        }
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// ComparisonOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOp {
    #[must_use]
    pub const fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Gt => ordering.is_gt(),
            Self::Ge => ordering.is_ge(),
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
        }
    }
}

///
/// OperandShape
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperandShape {
    Value,
    Range,
    Set,
}

///
/// Inclusion
///
/// Bound inclusion for range predicates.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Inclusion {
    #[default]
    StartInclusiveEndExclusive,
    StartInclusiveEndInclusive,
    StartExclusiveEndInclusive,
    StartExclusiveEndExclusive,
}

impl Inclusion {
    #[must_use]
    pub const fn start_inclusive(self) -> bool {
        matches!(
            self,
            Self::StartInclusiveEndExclusive | Self::StartInclusiveEndInclusive
        )
    }

    #[must_use]
    pub const fn end_inclusive(self) -> bool {
        matches!(
            self,
            Self::StartInclusiveEndInclusive | Self::StartExclusiveEndInclusive
        )
    }
}

///
/// Operand
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Operand {
    Value(Value),
    Range {
        start: Value,
        end: Value,
        inclusion: Inclusion,
    },
    Set(Vec<Value>),
}

impl Operand {
    #[must_use]
    pub const fn shape(&self) -> OperandShape {
        match self {
            Self::Value(_) => OperandShape::Value,
            Self::Range { .. } => OperandShape::Range,
            Self::Set(_) => OperandShape::Set,
        }
    }
}

///
/// FieldPredicate
///
/// Leaf condition over one entity field.
/// The kind always agrees with the operand shape.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "FieldPredicateRepr")]
pub struct FieldPredicate {
    field: String,
    kind: PredicateKind,
    operand: Operand,
}

impl FieldPredicate {
    /// Build a field predicate, rejecting a kind/operand shape mismatch.
    pub fn new(
        field: impl Into<String>,
        kind: PredicateKind,
        operand: Operand,
    ) -> Result<Self, Error> {
        if kind.operand_shape() != operand.shape() {
            return Err(Error::predicate_shape(format!(
                "predicate kind {kind} requires a {:?} operand, found {:?}",
                kind.operand_shape(),
                operand.shape()
            )));
        }

        Ok(Self {
            field: field.into(),
            kind,
            operand,
        })
    }

    /// Shape-correct constructor for the six comparison kinds.
    pub(crate) fn compare(field: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        let kind = match op {
            ComparisonOp::Eq => PredicateKind::Equal,
            ComparisonOp::Ne => PredicateKind::NotEqual,
            ComparisonOp::Gt => PredicateKind::GreaterThan,
            ComparisonOp::Ge => PredicateKind::GreaterOrEqual,
            ComparisonOp::Lt => PredicateKind::LessThan,
            ComparisonOp::Le => PredicateKind::LessOrEqual,
        };

        Self {
            field: field.into(),
            kind,
            operand: Operand::Value(value),
        }
    }

    pub(crate) fn range(
        field: impl Into<String>,
        negated: bool,
        start: Value,
        end: Value,
        inclusion: Inclusion,
    ) -> Self {
        Self {
            field: field.into(),
            kind: if negated {
                PredicateKind::NotBetween
            } else {
                PredicateKind::Between
            },
            operand: Operand::Range {
                start,
                end,
                inclusion,
            },
        }
    }

    pub(crate) fn set(field: impl Into<String>, negated: bool, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            kind: if negated {
                PredicateKind::NotIn
            } else {
                PredicateKind::In
            },
            operand: Operand::Set(values),
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn kind(&self) -> PredicateKind {
        self.kind
    }

    #[must_use]
    pub const fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Same field and operands under the paired kind.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            field: self.field.clone(),
            kind: self.kind.negate(),
            operand: self.operand.clone(),
        }
    }
}

#[derive(Deserialize)]
struct FieldPredicateRepr {
    field: String,
    kind: PredicateKind,
    operand: Operand,
}

impl TryFrom<FieldPredicateRepr> for FieldPredicate {
    type Error = Error;

    fn try_from(repr: FieldPredicateRepr) -> Result<Self, Self::Error> {
        Self::new(repr.field, repr.kind, repr.operand)
    }
}

///
/// LogicalKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum LogicalKind {
    And,
    Or,
}

impl LogicalKind {
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// CombinedPredicate
///
/// Logical combinator over one or more children, in order.
/// A single child is kept as-is; it is never unwrapped.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "CombinedPredicateRepr")]
pub struct CombinedPredicate {
    kind: LogicalKind,
    children: Vec<Predicate>,
}

impl CombinedPredicate {
    pub fn new(kind: LogicalKind, children: Vec<Predicate>) -> Result<Self, Error> {
        if children.is_empty() {
            return Err(Error::predicate_shape(format!(
                "{kind} predicate requires at least one child"
            )));
        }

        Ok(Self { kind, children })
    }

    #[must_use]
    pub const fn kind(&self) -> LogicalKind {
        self.kind
    }

    #[must_use]
    pub fn children(&self) -> &[Predicate] {
        &self.children
    }

    /// De Morgan: swap the combinator and negate every child.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            kind: self.kind.negate(),
            children: self.children.iter().map(Predicate::negate).collect(),
        }
    }
}

#[derive(Deserialize)]
struct CombinedPredicateRepr {
    kind: LogicalKind,
    children: Vec<Predicate>,
}

impl TryFrom<CombinedPredicateRepr> for CombinedPredicate {
    type Error = Error;

    fn try_from(repr: CombinedPredicateRepr) -> Result<Self, Self::Error> {
        Self::new(repr.kind, repr.children)
    }
}

///
/// Predicate
///
/// Immutable predicate tree.
/// `negate`, `and` and `or` always produce new trees.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Predicate {
    Field(FieldPredicate),
    Combined(CombinedPredicate),
}

impl Predicate {
    /// AND over `children`, in order.
    pub fn all(children: impl IntoIterator<Item = Self>) -> Result<Self, Error> {
        CombinedPredicate::new(LogicalKind::And, children.into_iter().collect()).map(Self::Combined)
    }

    /// OR over `children`, in order.
    pub fn any(children: impl IntoIterator<Item = Self>) -> Result<Self, Error> {
        CombinedPredicate::new(LogicalKind::Or, children.into_iter().collect()).map(Self::Combined)
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        match self {
            Self::Field(field) => Self::Field(field.negate()),
            Self::Combined(combined) => Self::Combined(combined.negate()),
        }
    }

    /// Conjunction; extends an existing AND instead of nesting it.
    #[must_use]
    pub fn and(self, other: impl Into<Self>) -> Self {
        self.combine(LogicalKind::And, other.into())
    }

    /// Disjunction; extends an existing OR instead of nesting it.
    #[must_use]
    pub fn or(self, other: impl Into<Self>) -> Self {
        self.combine(LogicalKind::Or, other.into())
    }

    fn combine(self, kind: LogicalKind, other: Self) -> Self {
        let children = match self {
            Self::Combined(CombinedPredicate {
                kind: existing,
                mut children,
            }) if existing == kind => {
                children.push(other);
                children
            }
            first => vec![first, other],
        };

        Self::Combined(CombinedPredicate { kind, children })
    }

    /// Kind label used in diagnostics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Field(field) => field.kind.as_str(),
            Self::Combined(combined) => combined.kind.as_str(),
        }
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl From<FieldPredicate> for Predicate {
    fn from(predicate: FieldPredicate) -> Self {
        Self::Field(predicate)
    }
}

impl From<CombinedPredicate> for Predicate {
    fn from(predicate: CombinedPredicate) -> Self {
        Self::Combined(predicate)
    }
}
