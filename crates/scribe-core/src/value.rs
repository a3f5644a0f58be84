//! Tagged value model for audited attributes.
//!
//! Domain objects expose their attributes as [`AuditValue`]s. The conversion
//! happens at the boundary (see the `From` impls) so the engine only ever
//! matches over a closed set of shapes.

use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use std::any::Any;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::schema::Auditable;

/// A numeric attribute value, tagged with its source subtype.
///
/// Equality is exact: different subtypes never compare equal, and decimals
/// must match in both value and scale (`19.9 != 19.90`).
#[derive(Debug, Clone)]
pub enum AuditNumber {
    /// Signed machine integer.
    Int(i64),
    /// Unsigned machine integer that may not fit in `i64`.
    UInt(u64),
    /// Floating point.
    Float(f64),
    /// Arbitrary-precision integer.
    BigInt(BigInt),
    /// Arbitrary-precision decimal; the scale is kept as written.
    Decimal(BigDecimal),
}

impl PartialEq for AuditNumber {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            // BigDecimal's own equality ignores scale.
            (Self::Decimal(a), Self::Decimal(b)) => {
                a.as_bigint_and_exponent() == b.as_bigint_and_exponent()
            }
            _ => false,
        }
    }
}

impl fmt::Display for AuditNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::UInt(n) => write!(f, "{}", n),
            // Debug keeps the fractional part on whole floats ("1.0").
            Self::Float(n) => write!(f, "{:?}", n),
            Self::BigInt(n) => write!(f, "{}", n),
            Self::Decimal(n) => write!(f, "{}", n),
        }
    }
}

/// Value of one attribute of an audited object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuditValue {
    /// No value.
    #[default]
    Null,
    Bool(bool),
    Number(AuditNumber),
    /// Text or a single character.
    Text(String),
    /// Ordered collection, unordered collection or fixed-size array.
    Sequence(Vec<AuditValue>),
    /// Nested object, walked through its own schema when rendered.
    Object(ObjectRef),
}

impl AuditValue {
    /// Wrap a nested auditable object.
    pub fn object<T>(value: T) -> Self
    where
        T: Auditable + PartialEq + 'static,
    {
        Self::Object(ObjectRef::new(value))
    }

    /// Check if this value is [`AuditValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Boolean content, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text content, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Nested object, if this is one.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }
}

/// Canonical string form, used for identities and natural keys.
impl fmt::Display for AuditValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Object(o) => write!(f, "{}", o.type_name()),
        }
    }
}

type ErasedEq = fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool;

/// Shared handle to a nested auditable object.
///
/// Two handles are equal when they point at the same allocation, or when
/// both wrap the same concrete type and that type's `PartialEq` agrees.
#[derive(Clone)]
pub struct ObjectRef {
    object: Arc<dyn Auditable>,
    any: Arc<dyn Any + Send + Sync>,
    eq: ErasedEq,
}

impl ObjectRef {
    /// Wrap an owned object.
    pub fn new<T>(value: T) -> Self
    where
        T: Auditable + PartialEq + 'static,
    {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared object without copying it.
    pub fn from_arc<T>(value: Arc<T>) -> Self
    where
        T: Auditable + PartialEq + 'static,
    {
        Self {
            object: value.clone(),
            any: value,
            eq: erased_eq::<T>,
        }
    }

    /// Borrow the wrapped object through the audit interface.
    pub fn as_auditable(&self) -> &dyn Auditable {
        self.object.as_ref()
    }

    /// Borrow the wrapped object as its concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.any.downcast_ref::<T>()
    }

    /// Fully-qualified type path of the wrapped object.
    pub fn type_path(&self) -> &'static str {
        self.object.type_path()
    }

    /// Last path segment of the wrapped object's type.
    pub fn type_name(&self) -> &'static str {
        simple_type_name(self.type_path())
    }
}

fn erased_eq<T: PartialEq + 'static>(a: &(dyn Any + Send + Sync), b: &(dyn Any + Send + Sync)) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.any, &other.any) || (self.eq)(self.any.as_ref(), other.any.as_ref())
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type", &self.type_path())
            .finish_non_exhaustive()
    }
}

/// Strip module path and generic arguments from a type path.
pub fn simple_type_name(path: &str) -> &str {
    let base = path.split('<').next().unwrap_or(path);
    base.rsplit("::").next().unwrap_or(base)
}

// ============================================================================
// Boundary conversions
// ============================================================================

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for AuditValue {
            fn from(n: $t) -> Self {
                Self::Number(AuditNumber::Int(n as i64))
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for AuditValue {
            fn from(n: $t) -> Self {
                Self::Number(AuditNumber::UInt(n as u64))
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<i128> for AuditValue {
    fn from(n: i128) -> Self {
        Self::Number(AuditNumber::BigInt(BigInt::from(n)))
    }
}

impl From<u128> for AuditValue {
    fn from(n: u128) -> Self {
        Self::Number(AuditNumber::BigInt(BigInt::from(n)))
    }
}

impl From<f32> for AuditValue {
    fn from(n: f32) -> Self {
        Self::Number(AuditNumber::Float(f64::from(n)))
    }
}

impl From<f64> for AuditValue {
    fn from(n: f64) -> Self {
        Self::Number(AuditNumber::Float(n))
    }
}

impl From<BigInt> for AuditValue {
    fn from(n: BigInt) -> Self {
        Self::Number(AuditNumber::BigInt(n))
    }
}

impl From<BigDecimal> for AuditValue {
    fn from(n: BigDecimal) -> Self {
        Self::Number(AuditNumber::Decimal(n))
    }
}

impl From<bool> for AuditValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<char> for AuditValue {
    fn from(c: char) -> Self {
        Self::Text(c.to_string())
    }
}

impl From<&str> for AuditValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AuditValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for AuditValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<ObjectRef> for AuditValue {
    fn from(o: ObjectRef) -> Self {
        Self::Object(o)
    }
}

impl<T: Into<AuditValue>> From<Option<T>> for AuditValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<AuditValue>> From<Vec<T>> for AuditValue {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AuditValue>> From<VecDeque<T>> for AuditValue {
    fn from(items: VecDeque<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AuditValue>> From<BTreeSet<T>> for AuditValue {
    fn from(items: BTreeSet<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<AuditValue>> From<&[T]> for AuditValue {
    fn from(items: &[T]) -> Self {
        Self::Sequence(items.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<AuditValue>, const N: usize> From<[T; N]> for AuditValue {
    fn from(items: [T; N]) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}
