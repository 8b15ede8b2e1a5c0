//! D-Bus type signature parsing.
//!
//! A method argument carries a signature string such as `"i"` or `"aay"`.
//! Parsing turns it into a [`TypeSignature`] tree that drives marshalling.
//! Only the type codes this crate can marshal are accepted; everything else
//! is reported as unsupported rather than silently passed through.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature \"{signature}\": {reason}")]
    Malformed { signature: String, reason: String },

    #[error("unsupported type code '{code}' in signature \"{signature}\"")]
    Unsupported { code: char, signature: String },
}

/// A parsed D-Bus type.
///
/// `Bytes` is the distinguished `"ay"` case: binary payloads travel as one
/// contiguous buffer instead of an array of boxed bytes. A plain `Array`
/// therefore never has a `Byte` element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    Int32,
    UInt32,
    Double,
    Str,
    Byte,
    Bytes,
    Array(Box<TypeSignature>),
}

impl TypeSignature {
    /// Parse a signature string holding exactly one complete type.
    ///
    /// Trailing type codes are malformed: argument signatures in
    /// introspection data each describe a single value.
    pub fn parse(signature: &str) -> Result<Self, SignatureError> {
        let mut chars = signature.chars().peekable();
        let parsed = parse_one(&mut chars, signature)?;
        if chars.peek().is_some() {
            return Err(SignatureError::Malformed {
                signature: signature.to_string(),
                reason: "trailing type codes after a complete type".to_string(),
            });
        }
        Ok(parsed)
    }

    /// The wire form of this type, e.g. `"i"`, `"ay"`, `"aai"`.
    pub fn wire_str(&self) -> String {
        match self {
            TypeSignature::Int32 => "i".to_string(),
            TypeSignature::UInt32 => "u".to_string(),
            TypeSignature::Double => "d".to_string(),
            TypeSignature::Str => "s".to_string(),
            TypeSignature::Byte => "y".to_string(),
            TypeSignature::Bytes => "ay".to_string(),
            TypeSignature::Array(elem) => format!("a{}", elem.wire_str()),
        }
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Int32 => write!(f, "int32"),
            TypeSignature::UInt32 => write!(f, "uint32"),
            TypeSignature::Double => write!(f, "double"),
            TypeSignature::Str => write!(f, "string"),
            TypeSignature::Byte => write!(f, "byte"),
            TypeSignature::Bytes => write!(f, "byte array"),
            TypeSignature::Array(elem) => write!(f, "array of {}", elem),
        }
    }
}

fn parse_one(chars: &mut Peekable<Chars<'_>>, full: &str) -> Result<TypeSignature, SignatureError> {
    let code = chars.next().ok_or_else(|| SignatureError::Malformed {
        signature: full.to_string(),
        reason: "missing type code".to_string(),
    })?;

    match code {
        'i' => Ok(TypeSignature::Int32),
        'u' => Ok(TypeSignature::UInt32),
        'd' => Ok(TypeSignature::Double),
        's' => Ok(TypeSignature::Str),
        'y' => Ok(TypeSignature::Byte),
        'a' => {
            if chars.peek() == Some(&'y') {
                chars.next();
                return Ok(TypeSignature::Bytes);
            }
            if chars.peek().is_none() {
                return Err(SignatureError::Malformed {
                    signature: full.to_string(),
                    reason: "array is missing its element type".to_string(),
                });
            }
            let elem = parse_one(chars, full)?;
            Ok(TypeSignature::Array(Box::new(elem)))
        }
        other => Err(SignatureError::Unsupported {
            code: other,
            signature: full.to_string(),
        }),
    }
}
