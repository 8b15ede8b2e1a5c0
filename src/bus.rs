//! Session-bus plumbing: connecting to remote objects, bus-wide queries,
//! and the live [`Transport`] backed by zbus.
//!
//! Everything zvariant-shaped stays in this module. The rest of the crate
//! works in terms of [`WireValue`], which this module translates to and
//! from the serialized D-Bus representation.

use serde::ser::{SerializeSeq, SerializeTuple, Serializer};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use zbus::blocking::fdo::{DBusProxy, IntrospectableProxy};
use zbus::blocking::{Connection, Proxy};
use zbus::zvariant::{DynamicType, Signature, Structure, Value};

use crate::call::{Transport, TransportError};
use crate::introspect::{parse_introspection, InterfaceDescriptor, IntrospectError};
use crate::proxy::ProxyHandle;
use crate::signature::TypeSignature;
use crate::wire::WireValue;

#[derive(Error, Debug)]
pub enum ConnectError {
    /// The session bus is unreachable or refused the operation.
    #[error("bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),

    #[error("introspection failed: {0}")]
    Introspect(#[from] IntrospectError),

    #[error("{service}: object {path} has no interface {interface}")]
    NoSuchInterface {
        service: String,
        path: String,
        interface: String,
    },
}

/// Connect to one interface of one remote object on the session bus.
///
/// The object is introspected up front; the returned handle knows every
/// method the interface offers and validates calls against them locally.
pub fn connect(service: &str, path: &str, interface: &str) -> Result<ProxyHandle, ConnectError> {
    let connection = Connection::session()?;
    let xml = introspect_object(&connection, service, path)?;
    let node = parse_introspection(&xml)?;
    let found = node
        .interfaces
        .into_iter()
        .find(|i| i.name == interface)
        .ok_or_else(|| ConnectError::NoSuchInterface {
            service: service.to_string(),
            path: path.to_string(),
            interface: interface.to_string(),
        })?;

    info!(
        service,
        path,
        interface,
        methods = found.methods.len(),
        "connected to remote interface"
    );
    let descriptor = InterfaceDescriptor::new(service, path, interface, found.methods);
    let transport = BusTransport::new(&connection, &descriptor)?;
    Ok(ProxyHandle::new(descriptor, Box::new(transport)))
}

/// Every name currently on the session bus, in the order the bus reports
/// them. Unique names (`:1.42`) are included.
pub fn list_services() -> Result<Vec<String>, ConnectError> {
    let connection = Connection::session()?;
    let proxy = DBusProxy::new(&connection)?;
    let names = proxy.list_names()?;
    Ok(names.into_iter().map(|name| name.to_string()).collect())
}

/// The object paths directly below `path` in `service`, as full paths.
pub fn list_objects(service: &str, path: &str) -> Result<Vec<String>, ConnectError> {
    let connection = Connection::session()?;
    let xml = introspect_object(&connection, service, path)?;
    let node = parse_introspection(&xml)?;
    Ok(node
        .children
        .iter()
        .map(|child| join_path(path, child))
        .collect())
}

fn introspect_object(
    connection: &Connection,
    service: &str,
    path: &str,
) -> Result<String, ConnectError> {
    debug!(service, path, "introspecting remote object");
    let proxy = IntrospectableProxy::builder(connection)
        .destination(service.to_string())?
        .path(path.to_string())?
        .build()?;
    Ok(proxy.introspect()?)
}

fn join_path(base: &str, child: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{child}")
    } else {
        format!("{base}/{child}")
    }
}

/// [`Transport`] over a live zbus proxy.
struct BusTransport {
    proxy: Proxy<'static>,
}

impl BusTransport {
    fn new(connection: &Connection, descriptor: &InterfaceDescriptor) -> Result<Self, ConnectError> {
        let proxy = Proxy::new(
            connection,
            descriptor.service.clone(),
            descriptor.path.clone(),
            descriptor.interface.clone(),
        )?;
        Ok(Self { proxy })
    }
}

impl Transport for BusTransport {
    fn invoke(
        &self,
        method: &str,
        args: WireValue,
        outputs: usize,
    ) -> Result<WireValue, TransportError> {
        let (fields, signature) = match &args {
            WireValue::Tuple(fields) => (fields.as_slice(), args.wire_str()),
            other => (std::slice::from_ref(other), format!("({})", other.wire_str())),
        };

        let message = if fields.is_empty() {
            self.proxy.call_method(method, &())
        } else {
            let signature = Signature::try_from(signature.as_str())
                .map_err(|e| TransportError::Protocol(e.to_string()))?;
            self.proxy.call_method(method, &WireBody { fields, signature })
        }
        .map_err(map_call_error)?;

        // Methods without declared outputs reply with an empty body.
        if outputs == 0 {
            return Ok(WireValue::Tuple(Vec::new()));
        }
        let body = message.body();
        let reply: Structure = body
            .deserialize()
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        let mut converted = Vec::with_capacity(reply.fields().len());
        for field in reply.fields() {
            converted.push(value_to_wire(field)?);
        }
        Ok(WireValue::Tuple(converted))
    }
}

fn map_call_error(err: zbus::Error) -> TransportError {
    match err {
        // An error reply from the remote side; keep its text intact.
        zbus::Error::MethodError(..) => TransportError::Call(err.to_string()),
        other => TransportError::Protocol(other.to_string()),
    }
}

/// A call body serialized field by field against a prebuilt signature.
///
/// Presents to zbus exactly like a Rust tuple of the argument values, so
/// the message body carries the arguments as a sequence, not as a nested
/// struct.
struct WireBody<'a> {
    fields: &'a [WireValue],
    signature: Signature,
}

impl DynamicType for WireBody<'_> {
    fn signature(&self) -> Signature {
        self.signature.clone()
    }
}

impl Serialize for WireBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(self.fields.len())?;
        for field in self.fields {
            tuple.serialize_element(&WireField(field))?;
        }
        tuple.end()
    }
}

struct WireField<'a>(&'a WireValue);

impl Serialize for WireField<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            WireValue::Int32(i) => serializer.serialize_i32(*i),
            WireValue::UInt32(u) => serializer.serialize_u32(*u),
            WireValue::Double(d) => serializer.serialize_f64(*d),
            WireValue::Str(s) => serializer.serialize_str(s),
            WireValue::Byte(b) => serializer.serialize_u8(*b),
            WireValue::Bytes(bytes) => {
                let mut seq = serializer.serialize_seq(Some(bytes.len()))?;
                for byte in bytes {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
            WireValue::Array { items, .. } => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&WireField(item))?;
                }
                seq.end()
            }
            WireValue::Tuple(fields) => {
                let mut tuple = serializer.serialize_tuple(fields.len())?;
                for field in fields {
                    tuple.serialize_element(&WireField(field))?;
                }
                tuple.end()
            }
        }
    }
}

/// Convert one deserialized bus value into the wire model.
///
/// Reply types outside the supported set (variants, dictionaries, and the
/// wider integer family) are reported, not silently dropped.
fn value_to_wire(value: &Value<'_>) -> Result<WireValue, TransportError> {
    match value {
        Value::U8(b) => Ok(WireValue::Byte(*b)),
        Value::I32(i) => Ok(WireValue::Int32(*i)),
        Value::U32(u) => Ok(WireValue::UInt32(*u)),
        Value::F64(d) => Ok(WireValue::Double(*d)),
        Value::Str(s) => Ok(WireValue::Str(s.as_str().to_string())),
        Value::Array(array) => {
            let elem_sig = array.element_signature().to_string();
            if elem_sig == "y" {
                let mut buf = Vec::with_capacity(array.len());
                for item in array.iter() {
                    match item {
                        Value::U8(b) => buf.push(*b),
                        other => {
                            return Err(TransportError::Protocol(format!(
                                "byte array element with signature {}",
                                other.value_signature()
                            )))
                        }
                    }
                }
                Ok(WireValue::Bytes(buf))
            } else {
                let elem = TypeSignature::parse(&elem_sig)
                    .map_err(|_| TransportError::UnknownWireType(elem_sig.clone()))?;
                let mut items = Vec::with_capacity(array.len());
                for item in array.iter() {
                    items.push(value_to_wire(item)?);
                }
                Ok(WireValue::Array { elem, items })
            }
        }
        Value::Structure(structure) => {
            let mut fields = Vec::with_capacity(structure.fields().len());
            for field in structure.fields() {
                fields.push(value_to_wire(field)?);
            }
            Ok(WireValue::Tuple(fields))
        }
        other => Err(TransportError::UnknownWireType(
            other.value_signature().to_string(),
        )),
    }
}
