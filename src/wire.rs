//! Wire-side values.
//!
//! [`WireValue`] mirrors the subset of the D-Bus type system this crate
//! marshals. It is transient: built per call, handed to the transport, and
//! dropped. `Array` carries its element [`TypeSignature`] so that an empty
//! array still knows its exact wire type.

use crate::signature::TypeSignature;

#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Int32(i32),
    UInt32(u32),
    Double(f64),
    Str(String),
    /// A bare `y` value; only seen when a method argument is a single byte.
    Byte(u8),
    /// The `"ay"` case: one contiguous buffer.
    Bytes(Vec<u8>),
    Array {
        elem: TypeSignature,
        items: Vec<WireValue>,
    },
    Tuple(Vec<WireValue>),
}

impl WireValue {
    /// The exact wire signature of this value, e.g. `"i"`, `"ay"`, `"(iis)"`.
    ///
    /// The transport frames call bodies with this; it must stay in lockstep
    /// with what the marshaller produces.
    pub fn wire_str(&self) -> String {
        match self {
            WireValue::Int32(_) => "i".to_string(),
            WireValue::UInt32(_) => "u".to_string(),
            WireValue::Double(_) => "d".to_string(),
            WireValue::Str(_) => "s".to_string(),
            WireValue::Byte(_) => "y".to_string(),
            WireValue::Bytes(_) => "ay".to_string(),
            WireValue::Array { elem, .. } => format!("a{}", elem.wire_str()),
            WireValue::Tuple(items) => {
                let mut out = String::from("(");
                for item in items {
                    out.push_str(&item.wire_str());
                }
                out.push(')');
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_signatures() {
        assert_eq!(WireValue::Int32(0).wire_str(), "i");
        assert_eq!(WireValue::UInt32(0).wire_str(), "u");
        assert_eq!(WireValue::Double(0.0).wire_str(), "d");
        assert_eq!(WireValue::Str(String::new()).wire_str(), "s");
        assert_eq!(WireValue::Byte(7).wire_str(), "y");
        assert_eq!(WireValue::Bytes(vec![]).wire_str(), "ay");
    }

    #[test]
    fn test_empty_array_keeps_element_type() {
        let empty = WireValue::Array {
            elem: TypeSignature::Int32,
            items: vec![],
        };
        assert_eq!(empty.wire_str(), "ai");

        let nested = WireValue::Array {
            elem: TypeSignature::Array(Box::new(TypeSignature::Str)),
            items: vec![],
        };
        assert_eq!(nested.wire_str(), "aas");
    }

    #[test]
    fn test_tuple_signature_concatenates_fields() {
        let tuple = WireValue::Tuple(vec![
            WireValue::Int32(1),
            WireValue::Int32(2),
            WireValue::Str("x".into()),
        ]);
        assert_eq!(tuple.wire_str(), "(iis)");

        assert_eq!(WireValue::Tuple(vec![]).wire_str(), "()");
    }
}
