//! Introspection XML parsing and the interface descriptors built from it.
//!
//! Only the slice of the document the call layer needs is kept: interfaces,
//! their methods with typed arguments, method annotations, and the names of
//! child nodes. Signals, properties, and the subtrees of child nodes are
//! skipped. Argument signatures are stored as raw strings and parsed when a
//! call first needs them.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("introspection XML is malformed: {reason}")]
pub struct IntrospectError {
    pub reason: String,
}

fn xml_err<E: std::fmt::Display>(err: E) -> IntrospectError {
    IntrospectError {
        reason: err.to_string(),
    }
}

/// One `<arg>` element. The name may be empty; services are not required
/// to label their arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    /// Raw type signature, e.g. `"ai"`. Not validated here.
    pub signature: String,
}

/// One `<method>` element of an interface.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub inputs: Vec<Argument>,
    pub outputs: Vec<Argument>,
    /// The `value` attribute of each `<annotation>`, in document order.
    pub annotations: Vec<String>,
}

/// One `<interface>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub name: String,
    pub methods: Vec<MethodDescriptor>,
}

/// The root `<node>` of an introspection document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub interfaces: Vec<Interface>,
    /// Names of child `<node>` elements, relative to the object path.
    pub children: Vec<String>,
}

/// Parse an introspection document as returned by `Introspect()`.
pub fn parse_introspection(xml: &str) -> Result<Node, IntrospectError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = true;
    let mut node = Node::default();
    let mut current_interface: Option<Interface> = None;
    let mut current_method: Option<MethodDescriptor> = None;
    let mut root_seen = false;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"node" => {
                    if root_seen {
                        // A nested node is a child object; its subtree
                        // describes the child, not this object.
                        if let Some(name) = attr_value(&e, b"name")? {
                            node.children.push(name);
                        }
                        reader.read_to_end(e.name()).map_err(xml_err)?;
                    } else {
                        root_seen = true;
                    }
                }
                b"interface" => {
                    current_interface = Some(Interface {
                        name: attr_value(&e, b"name")?.unwrap_or_default(),
                        methods: Vec::new(),
                    });
                }
                b"method" if current_interface.is_some() => {
                    current_method = Some(MethodDescriptor {
                        name: attr_value(&e, b"name")?.unwrap_or_default(),
                        inputs: Vec::new(),
                        outputs: Vec::new(),
                        annotations: Vec::new(),
                    });
                }
                b"arg" => record_arg(&e, &mut current_method)?,
                b"annotation" => record_annotation(&e, &mut current_method)?,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"node" => {
                    if root_seen {
                        if let Some(name) = attr_value(&e, b"name")? {
                            node.children.push(name);
                        }
                    }
                }
                // Interfaces and methods without children may be
                // self-closing; they are complete as they stand.
                b"interface" => {
                    node.interfaces.push(Interface {
                        name: attr_value(&e, b"name")?.unwrap_or_default(),
                        methods: Vec::new(),
                    });
                }
                b"method" => {
                    if let Some(interface) = current_interface.as_mut() {
                        interface.methods.push(MethodDescriptor {
                            name: attr_value(&e, b"name")?.unwrap_or_default(),
                            inputs: Vec::new(),
                            outputs: Vec::new(),
                            annotations: Vec::new(),
                        });
                    }
                }
                b"arg" => record_arg(&e, &mut current_method)?,
                b"annotation" => record_annotation(&e, &mut current_method)?,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"method" => {
                    if let (Some(method), Some(interface)) =
                        (current_method.take(), current_interface.as_mut())
                    {
                        interface.methods.push(method);
                    }
                }
                b"interface" => {
                    if let Some(interface) = current_interface.take() {
                        node.interfaces.push(interface);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(node)
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>, IntrospectError> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(xml_err)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn record_arg(
    e: &BytesStart,
    current: &mut Option<MethodDescriptor>,
) -> Result<(), IntrospectError> {
    // Args outside a method belong to signals and are not recorded.
    if let Some(method) = current.as_mut() {
        let arg = Argument {
            name: attr_value(e, b"name")?.unwrap_or_default(),
            signature: attr_value(e, b"type")?.unwrap_or_default(),
        };
        match attr_value(e, b"direction")?.as_deref() {
            Some("out") => method.outputs.push(arg),
            // Unmarked arguments default to inputs.
            _ => method.inputs.push(arg),
        }
    }
    Ok(())
}

fn record_annotation(
    e: &BytesStart,
    current: &mut Option<MethodDescriptor>,
) -> Result<(), IntrospectError> {
    if let Some(method) = current.as_mut() {
        if let Some(value) = attr_value(e, b"value")? {
            method.annotations.push(value);
        }
    }
    Ok(())
}

/// A fully resolved remote interface: where it lives on the bus plus its
/// introspected methods, indexed for lookup by name.
#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    pub service: String,
    pub path: String,
    pub interface: String,
    methods: Vec<MethodDescriptor>,
    index: HashMap<String, usize>,
}

impl InterfaceDescriptor {
    pub fn new(
        service: impl Into<String>,
        path: impl Into<String>,
        interface: impl Into<String>,
        methods: Vec<MethodDescriptor>,
    ) -> Self {
        let index = methods
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();
        Self {
            service: service.into(),
            path: path.into(),
            interface: interface.into(),
            methods,
            index,
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.index.get(name).map(|&i| &self.methods[i])
    }

    /// Methods in introspection order.
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}
