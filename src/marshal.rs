//! Host-to-wire marshalling.
//!
//! The wire contract, not the host representation, decides the final bit
//! pattern. The coercion table:
//!
//! | target       | accepted host values                                   |
//! |--------------|--------------------------------------------------------|
//! | `double`     | Int (widened), Float                                   |
//! | `int32`      | Int in range, Float truncated toward zero (saturating) |
//! | `uint32`     | Int in range, Float truncated toward zero (saturating) |
//! | `byte`       | Int in 0..=255                                         |
//! | `string`     | Str, Symbol (textual form)                             |
//! | `byte array` | Bytes (wholesale buffer), List/Vector of byte Ints     |
//! | `array of T` | List or Vector, element-wise against T                 |
//!
//! Out-of-range host integers are rejected rather than wrapped. Floats
//! against integer targets never fail: they truncate toward zero and
//! saturate at the target bounds.

use thiserror::Error;

use crate::signature::TypeSignature;
use crate::value::HostValue;
use crate::wire::WireValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalError {
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },

    #[error("value {value} does not fit in {expected}")]
    OutOfRange { value: i64, expected: String },

    /// An element of a sequence failed; `index` is zero-based.
    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<MarshalError>,
    },

    /// A tuple position failed; `position` is zero-based.
    #[error("argument {position} of {arity}: {source}")]
    Argument {
        position: usize,
        arity: usize,
        #[source]
        source: Box<MarshalError>,
    },
}

fn mismatch(expected: &TypeSignature, found: &HostValue) -> MarshalError {
    MarshalError::Mismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

/// Convert one host value into a wire value of the expected type.
pub fn marshal(value: &HostValue, expected: &TypeSignature) -> Result<WireValue, MarshalError> {
    match expected {
        TypeSignature::Double => match value {
            HostValue::Int(i) => Ok(WireValue::Double(*i as f64)),
            HostValue::Float(f) => Ok(WireValue::Double(*f)),
            other => Err(mismatch(expected, other)),
        },

        TypeSignature::Int32 => match value {
            HostValue::Int(i) => i32::try_from(*i).map(WireValue::Int32).map_err(|_| {
                MarshalError::OutOfRange {
                    value: *i,
                    expected: expected.to_string(),
                }
            }),
            // Truncation toward zero, saturating at the i32 bounds.
            HostValue::Float(f) => Ok(WireValue::Int32(*f as i32)),
            other => Err(mismatch(expected, other)),
        },

        TypeSignature::UInt32 => match value {
            HostValue::Int(i) => u32::try_from(*i).map(WireValue::UInt32).map_err(|_| {
                MarshalError::OutOfRange {
                    value: *i,
                    expected: expected.to_string(),
                }
            }),
            // Negative floats saturate to zero.
            HostValue::Float(f) => Ok(WireValue::UInt32(*f as u32)),
            other => Err(mismatch(expected, other)),
        },

        TypeSignature::Byte => marshal_byte(value).map(WireValue::Byte),

        TypeSignature::Str => match value {
            HostValue::Str(s) | HostValue::Symbol(s) => Ok(WireValue::Str(s.clone())),
            other => Err(mismatch(expected, other)),
        },

        TypeSignature::Bytes => match value {
            // Fast path: the buffer is taken wholesale, never element-wise.
            HostValue::Bytes(b) => Ok(WireValue::Bytes(b.clone())),
            HostValue::List(items) | HostValue::Vector(items) => {
                let mut buf = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let byte = marshal_byte(item).map_err(|e| MarshalError::Element {
                        index,
                        source: Box::new(e),
                    })?;
                    buf.push(byte);
                }
                Ok(WireValue::Bytes(buf))
            }
            other => Err(mismatch(expected, other)),
        },

        TypeSignature::Array(elem) => match value.sequence() {
            Some(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let wire = marshal(item, elem).map_err(|e| MarshalError::Element {
                        index,
                        source: Box::new(e),
                    })?;
                    out.push(wire);
                }
                // The element type rides along so an empty array still
                // serializes with the right signature.
                Ok(WireValue::Array {
                    elem: (**elem).clone(),
                    items: out,
                })
            }
            None => Err(mismatch(expected, value)),
        },
    }
}

fn marshal_byte(value: &HostValue) -> Result<u8, MarshalError> {
    match value {
        HostValue::Int(i) => u8::try_from(*i).map_err(|_| MarshalError::OutOfRange {
            value: *i,
            expected: "byte".to_string(),
        }),
        other => Err(MarshalError::Mismatch {
            expected: "byte".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

/// Marshal an ordered argument list into the call parameter tuple.
///
/// The caller has already verified that `args` and `expected` have equal
/// length; the first failing position aborts the whole construction.
pub fn marshal_tuple(
    args: &[HostValue],
    expected: &[TypeSignature],
) -> Result<WireValue, MarshalError> {
    debug_assert_eq!(args.len(), expected.len());
    let arity = expected.len();
    let mut fields = Vec::with_capacity(arity);
    for (position, (value, ty)) in args.iter().zip(expected).enumerate() {
        let wire = marshal(value, ty).map_err(|e| MarshalError::Argument {
            position,
            arity,
            source: Box::new(e),
        })?;
        fields.push(wire);
    }
    Ok(WireValue::Tuple(fields))
}
