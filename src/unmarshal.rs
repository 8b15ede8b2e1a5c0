//! Wire-to-host unmarshalling.
//!
//! This direction is total: every wire value already carries enough shape
//! to pick a host representation, so no conversion here can fail. The
//! mapping is deliberately asymmetric with the marshaller: incoming arrays
//! become Vectors while incoming structs become Lists, even though both
//! Lists and Vectors are accepted on the way out.

use crate::value::HostValue;
use crate::wire::WireValue;

/// Convert one wire value into its host representation.
pub fn unmarshal(wire: WireValue) -> HostValue {
    match wire {
        WireValue::Int32(i) => HostValue::Int(i64::from(i)),
        WireValue::UInt32(u) => HostValue::Int(i64::from(u)),
        WireValue::Byte(b) => HostValue::Int(i64::from(b)),
        WireValue::Double(d) => HostValue::Float(d),
        WireValue::Str(s) => HostValue::Str(s),
        WireValue::Bytes(b) => HostValue::Bytes(b),
        WireValue::Array { items, .. } => {
            HostValue::Vector(items.into_iter().map(unmarshal).collect())
        }
        WireValue::Tuple(fields) => {
            HostValue::List(fields.into_iter().map(unmarshal).collect())
        }
    }
}

/// Convert a reply tuple into the value handed back to the caller.
///
/// A nullary reply collapses to nothing, a single output is unwrapped from
/// its tuple, and multiple outputs stay together as a List.
pub fn unmarshal_reply(wire: WireValue) -> HostValue {
    match wire {
        WireValue::Tuple(mut fields) => match fields.len() {
            0 => HostValue::Unit,
            1 => unmarshal(fields.remove(0)),
            _ => HostValue::List(fields.into_iter().map(unmarshal).collect()),
        },
        other => unmarshal(other),
    }
}
