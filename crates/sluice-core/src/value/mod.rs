mod float;


use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// re-exports
pub use float::Float64;

///
/// Value
///
/// Dynamically typed field value.
/// Operands of field predicates and the unit the native engine compares.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float64(Float64),
    Text(String),
    List(Vec<Self>),
}

///
/// ValueFamily
///
/// Comparison family; values only compare within one family.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ValueFamily {
    Null,
    Bool,
    Numeric,
    Textual,
    Collection,
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn family(&self) -> ValueFamily {
        match self {
            Self::Null => ValueFamily::Null,
            Self::Bool(_) => ValueFamily::Bool,
            Self::Int(_) | Self::Uint(_) | Self::Float64(_) => ValueFamily::Numeric,
            Self::Text(_) => ValueFamily::Textual,
            Self::List(_) => ValueFamily::Collection,
        }
    }

    /// Semantic comparison used by predicates.
    ///
    /// Returns `None` when either side is null or the families differ.
    /// Numeric values compare across integer, unsigned and float variants.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) => compare_lists(a, b),
            (left, right) => compare_numeric(left, right),
        }
    }

    /// Semantic equality; null never equals anything, including null.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Total order used when sorting.
    ///
    /// Orders by family first, then by [`Value::compare`]. Null placement is
    /// decided by the caller, so nulls sort as the lowest family here.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        let family = self.family().cmp(&other.family());
        if family != Ordering::Equal {
            return family;
        }

        match (self, other) {
            (Self::List(a), Self::List(b)) => {
                for (left, right) in a.iter().zip(b) {
                    let ord = left.canonical_cmp(right);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

fn compare_lists(left: &[Value], right: &[Value]) -> Option<Ordering> {
    for (a, b) in left.iter().zip(right) {
        match a.compare(b)? {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
    }

    Some(left.len().cmp(&right.len()))
}

fn compare_numeric(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Uint(a), Value::Uint(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Uint(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Uint(a), Value::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Float64(a), Value::Float64(b)) => Some(a.cmp(b)),
        (Value::Float64(a), Value::Int(b)) => {
            Some(compare_int_float(i128::from(*b), *a).reverse())
        }
        (Value::Float64(a), Value::Uint(b)) => {
            Some(compare_int_float(i128::from(*b), *a).reverse())
        }
        (Value::Int(a), Value::Float64(b)) => Some(compare_int_float(i128::from(*a), *b)),
        (Value::Uint(a), Value::Float64(b)) => Some(compare_int_float(i128::from(*a), *b)),
        _ => None,
    }
}

// Integers are never widened to f64. The cast saturates for floats beyond
// i128, which already lie outside every i64/u64.
#[expect(clippy::cast_possible_truncation)]
fn compare_int_float(int: i128, float: Float64) -> Ordering {
    let float = float.get();
    let whole = float.trunc();
    let fraction = float - whole;

    int.cmp(&(whole as i128)).then_with(|| {
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

///
/// FieldValue
///
/// Conversion of a Rust field type into a predicate operand.
///

pub trait FieldValue {
    fn to_value(&self) -> Value;
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FieldValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FieldValue for Float64 {
    fn to_value(&self) -> Value {
        Value::Float64(*self)
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Float64::try_new(*self).map_or(Value::Null, Value::Float64)
    }
}

impl FieldValue for f32 {
    fn to_value(&self) -> Value {
        f64::from(*self).to_value()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }
}

macro_rules! impl_field_value_int {
    ($variant:ident, $wide:ty, $($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant(<$wide>::from(*self))
                }
            }
        )*
    };
}

impl_field_value_int!(Int, i64, i8, i16, i32, i64);
impl_field_value_int!(Uint, u64, u8, u16, u32, u64);
