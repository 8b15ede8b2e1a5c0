//! Host-side dynamic values.
//!
//! [`HostValue`] is the closed sum type callers hand to and receive from the
//! engine. It deliberately keeps two ordered-sequence representations:
//! `List` is what wire tuples unmarshal to, `Vector` is what wire arrays
//! unmarshal to, and callers pattern-match on the difference. Both are
//! accepted interchangeably when marshalling an array.

/// A dynamically-typed value crossing the binding boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// The "no value" sentinel, produced by methods with no outputs.
    Unit,
    Int(i64),
    Float(f64),
    Str(String),
    /// A symbol-like atom; marshals exactly like its textual form.
    Symbol(String),
    /// A contiguous binary buffer, the host image of the wire `"ay"` type.
    Bytes(Vec<u8>),
    /// Ordered cons-style sequence; wire tuples unmarshal to this.
    List(Vec<HostValue>),
    /// Fixed-length indexable sequence; wire arrays unmarshal to this.
    Vector(Vec<HostValue>),
}

impl HostValue {
    /// Short noun for diagnostics, e.g. "expected int32, found string".
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Unit => "nothing",
            HostValue::Int(_) => "integer",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "string",
            HostValue::Symbol(_) => "symbol",
            HostValue::Bytes(_) => "byte string",
            HostValue::List(_) => "list",
            HostValue::Vector(_) => "vector",
        }
    }

    /// Sequence view shared by `List` and `Vector`, used when either shape
    /// is acceptable (marshalling a wire array).
    pub fn sequence(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(items) | HostValue::Vector(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Int(v)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Int(v.into())
    }
}

impl From<u32> for HostValue {
    fn from(v: u32) -> Self {
        HostValue::Int(v.into())
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::Str(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::Str(v)
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(v: Vec<u8>) -> Self {
        HostValue::Bytes(v)
    }
}
