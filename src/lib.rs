//! Dynamic D-Bus bindings driven by runtime introspection.
//!
//! Instead of generating code from interface definitions ahead of time,
//! this crate introspects a remote object when you connect to it and
//! validates every call against what the object actually exports. Host
//! values are coerced to the introspected argument signatures on the way
//! out and mapped back to host values on the way in.
//!
//! ```no_run
//! use dynbus::connect;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let proxy = connect(
//!     "org.freedesktop.Notifications",
//!     "/org/freedesktop/Notifications",
//!     "org.freedesktop.Notifications",
//! )?;
//! for method in proxy.methods()? {
//!     println!("{method}");
//! }
//! let caps = proxy.call("GetCapabilities", &[])?;
//! println!("{caps:?}");
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod call;
pub mod config;
pub mod introspect;
pub mod marshal;
pub mod proxy;
pub mod signature;
pub mod unmarshal;
pub mod value;
pub mod wire;

// Re-export commonly used types for convenience
pub use bus::{connect, list_objects, list_services, ConnectError};
pub use call::{CallError, Transport, TransportError};
pub use config::Config;
pub use proxy::{BoundMethod, ProxyHandle};
pub use signature::TypeSignature;
pub use value::HostValue;
pub use wire::WireValue;
