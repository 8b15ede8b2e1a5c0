//! The call kernel: name normalization, arity and type checking, and the
//! transport seam every remote invocation goes through.
//!
//! The pipeline is strictly ordered. The method is resolved first, then the
//! argument count is checked, then argument signatures are parsed and the
//! arguments marshalled. Only when all of that has succeeded does anything
//! reach the transport, so a call that fails validation never touches the
//! bus.

use thiserror::Error;
use tracing::debug;

use crate::introspect::InterfaceDescriptor;
use crate::marshal::{marshal_tuple, MarshalError};
use crate::signature::{SignatureError, TypeSignature};
use crate::unmarshal::unmarshal_reply;
use crate::value::HostValue;
use crate::wire::WireValue;

/// Errors surfaced to callers of a proxy method.
#[derive(Error, Debug)]
pub enum CallError {
    /// The proxy handle was disposed before this operation.
    #[error("proxy handle has been disposed")]
    InvalidHandle,

    #[error("no such method: {0}")]
    NoSuchMethod(String),

    #[error("{method} expected {expected} argument(s), received {received}")]
    ArityMismatch {
        method: String,
        expected: usize,
        received: usize,
    },

    #[error("{method}: {source}")]
    TypeMismatch {
        method: String,
        #[source]
        source: MarshalError,
    },

    /// An argument signature in the introspection data could not be parsed.
    #[error("{method}: argument {argument}: {source}")]
    Signature {
        method: String,
        argument: usize,
        #[source]
        source: SignatureError,
    },

    /// The remote side rejected the call; the message is the remote
    /// diagnostic, unaltered.
    #[error("{method}: call failed: {message}")]
    Remote { method: String, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("cannot convert reply: unknown wire type {0:?}")]
    UnknownWireType(String),
}

/// Errors a transport can raise. The kernel folds these into [`CallError`]
/// with the method name attached.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The call reached the remote side and came back as an error reply.
    #[error("{0}")]
    Call(String),

    /// Connection or serialization trouble below the call level.
    #[error("{0}")]
    Protocol(String),

    /// The reply contained a type the value model cannot represent.
    #[error("unknown wire type {0:?}")]
    UnknownWireType(String),
}

/// A synchronous channel to one remote object.
///
/// `args` is always a [`WireValue::Tuple`] holding the marshalled inputs in
/// order; `outputs` is the number of reply values the method declares, so
/// an implementation knows whether to expect a reply body at all.
pub trait Transport {
    fn invoke(
        &self,
        method: &str,
        args: WireValue,
        outputs: usize,
    ) -> Result<WireValue, TransportError>;
}

/// Translate a host-side method name to its wire form.
///
/// Dashes become underscores, so `image-new` and `image_new` address the
/// same remote method.
pub fn wire_method_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Invoke `method` on the object `descriptor` describes, over `transport`.
pub fn call_method(
    descriptor: &InterfaceDescriptor,
    transport: &dyn Transport,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    let name = wire_method_name(method);
    let desc = descriptor
        .method(&name)
        .ok_or_else(|| CallError::NoSuchMethod(name.clone()))?;

    if desc.inputs.len() != args.len() {
        return Err(CallError::ArityMismatch {
            method: name,
            expected: desc.inputs.len(),
            received: args.len(),
        });
    }

    // Signatures are taken at face value until a call needs them.
    let mut expected = Vec::with_capacity(desc.inputs.len());
    for (argument, input) in desc.inputs.iter().enumerate() {
        let ty = TypeSignature::parse(&input.signature).map_err(|source| CallError::Signature {
            method: name.clone(),
            argument,
            source,
        })?;
        expected.push(ty);
    }

    let tuple = marshal_tuple(args, &expected).map_err(|source| CallError::TypeMismatch {
        method: name.clone(),
        source,
    })?;

    debug!(
        interface = %descriptor.interface,
        method = %name,
        args = args.len(),
        "invoking remote method"
    );
    let reply = transport
        .invoke(&name, tuple, desc.outputs.len())
        .map_err(|e| match e {
            TransportError::Call(message) => CallError::Remote {
                method: name.clone(),
                message,
            },
            TransportError::Protocol(message) => CallError::Protocol(message),
            TransportError::UnknownWireType(tag) => CallError::UnknownWireType(tag),
        })?;

    Ok(unmarshal_reply(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{Argument, MethodDescriptor};
    use std::sync::Mutex;

    struct StubTransport {
        reply: Result<WireValue, String>,
        calls: Mutex<Vec<(String, WireValue, usize)>>,
    }

    impl StubTransport {
        fn replying(reply: WireValue) -> Self {
            Self {
                reply: Ok(reply),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn invocations(&self) -> Vec<(String, WireValue, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for StubTransport {
        fn invoke(
            &self,
            method: &str,
            args: WireValue,
            outputs: usize,
        ) -> Result<WireValue, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), args.clone(), outputs));
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(message) => Err(TransportError::Call(message.clone())),
            }
        }
    }

    fn method(name: &str, inputs: &[&str], outputs: &[&str]) -> MethodDescriptor {
        let arg = |sig: &&str| Argument {
            name: String::new(),
            signature: (*sig).to_string(),
        };
        MethodDescriptor {
            name: name.to_string(),
            inputs: inputs.iter().map(arg).collect(),
            outputs: outputs.iter().map(arg).collect(),
            annotations: Vec::new(),
        }
    }

    fn fixture() -> InterfaceDescriptor {
        InterfaceDescriptor::new(
            "com.example.calc",
            "/com/example/calc",
            "com.example.Calc",
            vec![
                method("add_numbers", &["i", "i"], &["i"]),
                method("divide", &["d", "d"], &["d", "i"]),
                method("reset", &[], &[]),
                method("checksum", &["ay"], &["u"]),
                method("broken", &["z"], &[]),
            ],
        )
    }

    // ===================
    // Happy paths
    // ===================

    #[test]
    fn test_call_marshals_and_unwraps_single_output() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![WireValue::Int32(3)]));
        let result = call_method(
            &fixture(),
            &transport,
            "add_numbers",
            &[HostValue::Int(1), HostValue::Int(2)],
        )
        .unwrap();
        assert_eq!(result, HostValue::Int(3));
        assert_eq!(
            transport.invocations(),
            vec![(
                "add_numbers".to_string(),
                WireValue::Tuple(vec![WireValue::Int32(1), WireValue::Int32(2)]),
                1,
            )]
        );
    }

    #[test]
    fn test_dashed_and_underscored_names_reach_the_same_method() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![WireValue::Int32(3)]));
        let args = [HostValue::Int(1), HostValue::Int(2)];
        call_method(&fixture(), &transport, "add-numbers", &args).unwrap();
        call_method(&fixture(), &transport, "add_numbers", &args).unwrap();
        let invocations = transport.invocations();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].0, "add_numbers");
        assert_eq!(invocations[1].0, "add_numbers");
    }

    #[test]
    fn test_multiple_outputs_come_back_as_a_list() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![
            WireValue::Double(0.5),
            WireValue::Int32(1),
        ]));
        let result = call_method(
            &fixture(),
            &transport,
            "divide",
            &[HostValue::Int(1), HostValue::Int(2)],
        )
        .unwrap();
        assert_eq!(
            result,
            HostValue::List(vec![HostValue::Float(0.5), HostValue::Int(1)])
        );
    }

    #[test]
    fn test_nullary_call_sends_empty_tuple() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![]));
        let result = call_method(&fixture(), &transport, "reset", &[]).unwrap();
        assert_eq!(result, HostValue::Unit);
        assert_eq!(
            transport.invocations(),
            vec![("reset".to_string(), WireValue::Tuple(vec![]), 0)]
        );
    }

    #[test]
    fn test_byte_buffer_argument_rides_the_fast_path() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![WireValue::UInt32(9)]));
        let buf = vec![1u8, 255, 0, 126, 0, 22, 31, 8, 1];
        call_method(
            &fixture(),
            &transport,
            "checksum",
            &[HostValue::Bytes(buf.clone())],
        )
        .unwrap();
        assert_eq!(
            transport.invocations()[0].1,
            WireValue::Tuple(vec![WireValue::Bytes(buf)])
        );
    }

    // ===================
    // Validation order
    // ===================

    #[test]
    fn test_unknown_method_never_reaches_the_transport() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![]));
        let err = call_method(&fixture(), &transport, "missing", &[]).unwrap_err();
        assert!(matches!(err, CallError::NoSuchMethod(ref name) if name == "missing"));
        assert!(transport.invocations().is_empty());
    }

    #[test]
    fn test_arity_is_checked_before_marshalling() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![]));
        // The one argument present would also fail marshalling; arity wins.
        let err =
            call_method(&fixture(), &transport, "add_numbers", &[HostValue::Unit]).unwrap_err();
        match err {
            CallError::ArityMismatch {
                method,
                expected,
                received,
            } => {
                assert_eq!(method, "add_numbers");
                assert_eq!(expected, 2);
                assert_eq!(received, 1);
            }
            other => panic!("expected arity error, got {other:?}"),
        }
        assert!(transport.invocations().is_empty());
    }

    #[test]
    fn test_marshal_failure_never_reaches_the_transport() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![]));
        let err = call_method(
            &fixture(),
            &transport,
            "add_numbers",
            &[HostValue::Str("one".into()), HostValue::Int(2)],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "add_numbers: argument 0 of 2: expected int32, found string"
        );
        assert!(transport.invocations().is_empty());
    }

    #[test]
    fn test_unparseable_signature_fails_at_call_time() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![]));
        let err =
            call_method(&fixture(), &transport, "broken", &[HostValue::Int(1)]).unwrap_err();
        match &err {
            CallError::Signature {
                method, argument, ..
            } => {
                assert_eq!(method, "broken");
                assert_eq!(*argument, 0);
            }
            other => panic!("expected signature error, got {other:?}"),
        }
        assert!(err.to_string().contains("unsupported type code 'z'"));
        assert!(transport.invocations().is_empty());
    }

    #[test]
    fn test_float_truncation_applies_to_call_arguments() {
        let transport = StubTransport::replying(WireValue::Tuple(vec![WireValue::Int32(0)]));
        call_method(
            &fixture(),
            &transport,
            "add_numbers",
            &[HostValue::Float(1.5), HostValue::Float(-1.5)],
        )
        .unwrap();
        assert_eq!(
            transport.invocations()[0].1,
            WireValue::Tuple(vec![WireValue::Int32(1), WireValue::Int32(-1)])
        );
    }

    // ===================
    // Transport failures
    // ===================

    #[test]
    fn test_remote_error_text_is_preserved_verbatim() {
        let remote = "GDBus.Error:org.gtk.GDBus.UnmappedGError.Quark: image 7 not found";
        let transport = StubTransport::failing(remote);
        let err = call_method(&fixture(), &transport, "reset", &[]).unwrap_err();
        assert_eq!(err.to_string(), format!("reset: call failed: {remote}"));
    }

    #[test]
    fn test_transport_is_invoked_exactly_once_per_call() {
        let transport = StubTransport::failing("busy");
        let _ = call_method(&fixture(), &transport, "reset", &[]);
        assert_eq!(transport.invocations().len(), 1);
    }
}
