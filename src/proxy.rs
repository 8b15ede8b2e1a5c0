//! Proxy handles: the owned, disposable binding between a caller and one
//! remote interface.
//!
//! A handle is created live and stays usable until [`ProxyHandle::dispose`]
//! drops the transport. Every operation on a disposed handle reports
//! [`CallError::InvalidHandle`]; nothing is ever reconnected behind the
//! caller's back.

use std::collections::BTreeMap;
use std::fmt;

use crate::call::{call_method, wire_method_name, CallError, Transport};
use crate::introspect::{InterfaceDescriptor, MethodDescriptor};
use crate::value::HostValue;

struct LiveProxy {
    descriptor: InterfaceDescriptor,
    transport: Box<dyn Transport + Send + Sync>,
}

pub struct ProxyHandle {
    inner: Option<LiveProxy>,
}

impl ProxyHandle {
    pub fn new(
        descriptor: InterfaceDescriptor,
        transport: Box<dyn Transport + Send + Sync>,
    ) -> Self {
        Self {
            inner: Some(LiveProxy {
                descriptor,
                transport,
            }),
        }
    }

    fn live(&self) -> Result<&LiveProxy, CallError> {
        self.inner.as_ref().ok_or(CallError::InvalidHandle)
    }

    /// Release the underlying connection. Idempotent; the handle itself
    /// remains valid to drop but every operation on it fails from now on.
    pub fn dispose(&mut self) {
        self.inner = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_none()
    }

    /// Where this handle points on the bus.
    pub fn descriptor(&self) -> Result<&InterfaceDescriptor, CallError> {
        self.live().map(|live| &live.descriptor)
    }

    /// Invoke a remote method. `method` may use dashes or underscores.
    pub fn call(&self, method: &str, args: &[HostValue]) -> Result<HostValue, CallError> {
        let live = self.live()?;
        call_method(&live.descriptor, live.transport.as_ref(), method, args)
    }

    /// Method names in introspection order.
    pub fn methods(&self) -> Result<Vec<String>, CallError> {
        let live = self.live()?;
        Ok(live
            .descriptor
            .methods()
            .iter()
            .map(|m| m.name.clone())
            .collect())
    }

    /// Full descriptor of one method, including argument signatures and
    /// annotations. `name` may use dashes or underscores.
    pub fn method_info(&self, name: &str) -> Result<&MethodDescriptor, CallError> {
        let live = self.live()?;
        let wire = wire_method_name(name);
        match live.descriptor.method(&wire) {
            Some(method) => Ok(method),
            None => Err(CallError::NoSuchMethod(wire)),
        }
    }

    /// Bind every introspected method to an invocable closure over this
    /// handle.
    ///
    /// Exported names are `prefix` plus the method name; with `dash` set,
    /// underscores in the method name become dashes, matching the
    /// dash-tolerant lookup in [`ProxyHandle::call`].
    pub fn import_all(
        &self,
        prefix: &str,
        dash: bool,
    ) -> Result<BTreeMap<String, BoundMethod<'_>>, CallError> {
        let live = self.live()?;
        let mut bound = BTreeMap::new();
        for method in live.descriptor.methods() {
            let exported = if dash {
                format!("{prefix}{}", method.name.replace('_', "-"))
            } else {
                format!("{prefix}{}", method.name)
            };
            bound.insert(
                exported,
                BoundMethod {
                    handle: self,
                    method: method.name.clone(),
                },
            );
        }
        Ok(bound)
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(live) => f
                .debug_struct("ProxyHandle")
                .field("service", &live.descriptor.service)
                .field("path", &live.descriptor.path)
                .field("interface", &live.descriptor.interface)
                .finish_non_exhaustive(),
            None => f.write_str("ProxyHandle(disposed)"),
        }
    }
}

/// One imported method, tied to the handle it was imported from.
pub struct BoundMethod<'a> {
    handle: &'a ProxyHandle,
    method: String,
}

impl BoundMethod<'_> {
    /// The wire-side method name this binding resolves to.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn invoke(&self, args: &[HostValue]) -> Result<HostValue, CallError> {
        self.handle.call(&self.method, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::TransportError;
    use crate::introspect::Argument;
    use crate::wire::WireValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTransport {
        reply: WireValue,
        invocations: Arc<AtomicUsize>,
    }

    impl Transport for CountingTransport {
        fn invoke(
            &self,
            _method: &str,
            _args: WireValue,
            _outputs: usize,
        ) -> Result<WireValue, TransportError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
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

    fn handle_with_counter(reply: WireValue) -> (ProxyHandle, Arc<AtomicUsize>) {
        let invocations = Arc::new(AtomicUsize::new(0));
        let descriptor = InterfaceDescriptor::new(
            "com.example.editor",
            "/com/example/editor",
            "com.example.ImageEditor",
            vec![
                method("image_new", &["i", "i"], &["i"]),
                method("image_close", &["i"], &[]),
                method("version", &[], &["s"]),
            ],
        );
        let transport = CountingTransport {
            reply,
            invocations: Arc::clone(&invocations),
        };
        (
            ProxyHandle::new(descriptor, Box::new(transport)),
            invocations,
        )
    }

    #[test]
    fn test_call_through_live_handle() {
        let (handle, invocations) =
            handle_with_counter(WireValue::Tuple(vec![WireValue::Int32(7)]));
        let result = handle
            .call("image_new", &[HostValue::Int(640), HostValue::Int(480)])
            .unwrap();
        assert_eq!(result, HostValue::Int(7));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispose_invalidates_every_operation() {
        let (mut handle, invocations) = handle_with_counter(WireValue::Tuple(vec![]));
        handle.dispose();
        assert!(handle.is_disposed());

        assert!(matches!(
            handle.call("version", &[]),
            Err(CallError::InvalidHandle)
        ));
        assert!(matches!(handle.methods(), Err(CallError::InvalidHandle)));
        assert!(matches!(
            handle.method_info("version"),
            Err(CallError::InvalidHandle)
        ));
        assert!(matches!(
            handle.import_all("", false),
            Err(CallError::InvalidHandle)
        ));
        assert!(matches!(
            handle.descriptor(),
            Err(CallError::InvalidHandle)
        ));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut handle, _) = handle_with_counter(WireValue::Tuple(vec![]));
        handle.dispose();
        handle.dispose();
        assert!(handle.is_disposed());
    }

    #[test]
    fn test_methods_keep_introspection_order() {
        let (handle, _) = handle_with_counter(WireValue::Tuple(vec![]));
        assert_eq!(
            handle.methods().unwrap(),
            ["image_new", "image_close", "version"]
        );
    }

    #[test]
    fn test_method_info_accepts_dashed_names() {
        let (handle, _) = handle_with_counter(WireValue::Tuple(vec![]));
        let info = handle.method_info("image-new").unwrap();
        assert_eq!(info.name, "image_new");
        assert_eq!(info.inputs.len(), 2);

        let err = handle.method_info("not-a-real-method").unwrap_err();
        assert!(matches!(err, CallError::NoSuchMethod(_)));
    }

    #[test]
    fn test_import_all_prefixes_and_dashes_names() {
        let (handle, invocations) =
            handle_with_counter(WireValue::Tuple(vec![WireValue::Int32(1)]));
        let bound = handle.import_all("editor.", true).unwrap();
        let names: Vec<&String> = bound.keys().collect();
        assert_eq!(
            names,
            ["editor.image-close", "editor.image-new", "editor.version"]
        );

        let image_new = &bound["editor.image-new"];
        assert_eq!(image_new.method(), "image_new");
        image_new
            .invoke(&[HostValue::Int(64), HostValue::Int(64)])
            .unwrap();
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_import_all_without_dashing_keeps_underscores() {
        let (handle, _) = handle_with_counter(WireValue::Tuple(vec![]));
        let bound = handle.import_all("", false).unwrap();
        assert!(bound.contains_key("image_new"));
        assert!(!bound.contains_key("image-new"));
        assert_eq!(bound.len(), 3);
    }
}
