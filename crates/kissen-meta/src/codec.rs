//! Typed value codec table.
//!
//! Storage is untyped text. Every typed accessor on [`crate::Meta`] goes
//! through one [`MetaValue`] impl, which fixes the text encoding and the
//! discriminator written to the type column.

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::CodecError;

/// Discriminator stored in the type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Long,
    Int,
    Short,
    Byte,
    Double,
    Float,
    Boolean,
    Record,
    List,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Long => "long",
            ValueKind::Int => "int",
            ValueKind::Short => "short",
            ValueKind::Byte => "byte",
            ValueKind::Double => "double",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Record => "record",
            ValueKind::List => "list",
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "string" => ValueKind::String,
            "long" => ValueKind::Long,
            "int" => ValueKind::Int,
            "short" => ValueKind::Short,
            "byte" => ValueKind::Byte,
            "double" => ValueKind::Double,
            "float" => ValueKind::Float,
            "boolean" => ValueKind::Boolean,
            "record" => ValueKind::Record,
            "list" => ValueKind::List,
            other => return Err(CodecError::UnknownKind(other.to_string())),
        })
    }
}

/// A value type with a fixed text encoding.
pub trait MetaValue: Sized {
    const KIND: ValueKind;

    fn encode(&self) -> String;

    fn decode(raw: &str) -> Result<Self, CodecError>;
}

impl MetaValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(raw: &str) -> Result<Self, CodecError> {
        Ok(raw.to_string())
    }
}

macro_rules! parsed_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl MetaValue for $ty {
                const KIND: ValueKind = ValueKind::$kind;

                fn encode(&self) -> String {
                    self.to_string()
                }

                fn decode(raw: &str) -> Result<Self, CodecError> {
                    raw.trim().parse().map_err(|_| CodecError::Invalid {
                        kind: Self::KIND,
                        raw: raw.to_string(),
                    })
                }
            }
        )*
    };
}

// Float Display output is the shortest text that parses back to the same bits.
parsed_value! {
    i64 => Long,
    i32 => Int,
    i16 => Short,
    i8 => Byte,
    f64 => Double,
    f32 => Float,
    bool => Boolean,
}
