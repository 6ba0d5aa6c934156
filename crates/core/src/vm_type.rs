//! The typed-data vocabulary printed after `%` in assembly `.data_start` entries.

use std::fmt;

/// A VM-recognized data type. Printed verbatim (prefixed with `%`) in the
/// assembler's data section and used by the temp-reuse coloring pass to
/// decide which temporaries may legally share a heap address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VmType {
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Char,
    String,
    /// An array of the given scalar element type (no nested arrays).
    Array(Box<VmType>),
    /// An opaque host type referenced by its sanitized name, e.g. a
    /// `DataList`/`DataDictionary`-shaped reference type or an arbitrary
    /// engine object.
    Reference(String),
}

impl VmType {
    /// The mnemonic printed after `%` in a data entry, e.g. `Int64Array`.
    pub fn mnemonic(&self) -> String {
        match self {
            VmType::Int32 => "Int32".to_string(),
            VmType::Int64 => "Int64".to_string(),
            VmType::Float32 => "Float32".to_string(),
            VmType::Float64 => "Float64".to_string(),
            VmType::Bool => "Boolean".to_string(),
            VmType::Char => "Char".to_string(),
            VmType::String => "String".to_string(),
            VmType::Array(elem) => format!("{}Array", elem.mnemonic()),
            VmType::Reference(name) => name.clone(),
        }
    }

    /// Whether two `VmType`s may share a single coloring-pass color. Two
    /// distinct VM types are never compatible, even if both are references.
    pub fn coloring_compatible(&self, other: &VmType) -> bool {
        self == other
    }
}

impl fmt::Display for VmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
