//! Fuzz target for host-to-wire marshalling.
//!
//! Ensures that any host value checked against any parseable signature
//! either marshals or fails with a structured error, without panicking.

#![no_main]

use arbitrary::Arbitrary;
use dynbus::marshal::marshal;
use dynbus::{HostValue, TypeSignature};
use libfuzzer_sys::fuzz_target;

/// Host value shapes, buildable from raw fuzz input.
#[derive(Arbitrary, Debug)]
enum RawValue {
    Unit,
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
    Bytes(Vec<u8>),
    List(Vec<RawValue>),
    Vector(Vec<RawValue>),
}

fn lift(raw: RawValue) -> HostValue {
    match raw {
        RawValue::Unit => HostValue::Unit,
        RawValue::Int(i) => HostValue::Int(i),
        RawValue::Float(f) => HostValue::Float(f),
        RawValue::Str(s) => HostValue::Str(s),
        RawValue::Symbol(s) => HostValue::Symbol(s),
        RawValue::Bytes(b) => HostValue::Bytes(b),
        RawValue::List(items) => HostValue::List(items.into_iter().map(lift).collect()),
        RawValue::Vector(items) => HostValue::Vector(items.into_iter().map(lift).collect()),
    }
}

fuzz_target!(|input: (RawValue, String)| {
    let (raw, signature) = input;
    if let Ok(sig) = TypeSignature::parse(&signature) {
        let _ = marshal(&lift(raw), &sig);
    }
});
