//! FNV-1a 64-bit hashing used for runtime reflection entries.
//!
//! `__refl_typeid` and `__refl_typeids` entries in the emitted assembly hold
//! the FNV-1a hash of a class (or interface) name, so two independently
//! compiled entry points agree on a type's identity without sharing a symbol
//! table at runtime.

/// FNV-1a offset basis, 64-bit variant.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a prime, 64-bit variant.
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A 64-bit FNV-1a hash of a type name, used as `__refl_typeid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u64);

impl TypeId {
    /// Compute the FNV-1a hash of `name`'s UTF-8 bytes.
    pub fn compute(name: &str) -> Self {
        let mut hash = FNV_OFFSET_BASIS;
        for byte in name.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        TypeId(hash)
    }

    /// Render as the lowercase hex literal the assembler prints for
    /// `__refl_typeid : %Int64, <hex>`.
    pub fn to_hex(self) -> String {
        format!("0x{:016x}", self.0)
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_offset_basis() {
        assert_eq!(TypeId::compute("").0, FNV_OFFSET_BASIS);
    }

    #[test]
    fn known_vector_foo() {
        // FNV-1a-64("Foo") computed independently against the reference
        // algorithm (offset basis ^ byte, times prime, per byte).
        let mut expect = FNV_OFFSET_BASIS;
        for b in b"Foo" {
            expect ^= u64::from(*b);
            expect = expect.wrapping_mul(FNV_PRIME);
        }
        assert_eq!(TypeId::compute("Foo").0, expect);
    }

    #[test]
    fn distinct_names_hash_differently() {
        assert_ne!(TypeId::compute("Foo"), TypeId::compute("Bar"));
    }

    #[test]
    fn deterministic() {
        assert_eq!(TypeId::compute("MyBehaviour"), TypeId::compute("MyBehaviour"));
    }

    #[test]
    fn hex_rendering_is_16_digits() {
        let id = TypeId::compute("MyBehaviour");
        let hex = id.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 18);
    }
}
