//! Type System for Decaf

use std::fmt;

/// A Decaf type.
///
/// `Error` is what an ill-typed expression evaluates to. It is compatible
/// with everything so that one mistake does not cascade into several reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Double,
    Bool,
    String,
    Void,
    Error,
}

impl Type {
    /// Check if this is a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Double)
    }

    /// Check if this is the error type
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Whether `Print` has a runtime routine for this type
    pub fn is_printable(&self) -> bool {
        matches!(self, Self::Int | Self::Bool | Self::String)
    }

    /// Type equality that lets the error type through
    pub fn compatible(&self, other: &Type) -> bool {
        self.is_error() || other.is_error() || self == other
    }

    /// Source keyword for this type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Void => "void",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
