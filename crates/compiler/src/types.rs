//! Source-visible type names and their mapping to canonical host type names.
//!
//! "Canonical host type name" per `spec.md §3`: a dotted identifier used by
//! externs. The mapping from source names is total for known builtins;
//! unknown names are preserved verbatim (user classes, interfaces, and any
//! host type this table hasn't been told about).

use std::collections::HashMap;
use std::sync::OnceLock;
use uasmc_core::VmType;

fn builtin_host_names() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("int", "System.Int32"),
            ("long", "System.Int64"),
            ("float", "System.Single"),
            ("double", "System.Double"),
            ("bool", "System.Boolean"),
            ("char", "System.Char"),
            ("string", "System.String"),
            ("void", "System.Void"),
            ("object", "System.Object"),
            ("Material", "UnityEngine.Material"),
            ("Color", "UnityEngine.Color"),
            ("Transform", "UnityEngine.Transform"),
            ("GameObject", "UnityEngine.GameObject"),
            ("Mathf", "UnityEngine.Mathf"),
            ("Vector2", "UnityEngine.Vector2"),
            ("Vector3", "UnityEngine.Vector3"),
            ("Quaternion", "UnityEngine.Quaternion"),
            ("DataList", "VRC.SDK3.Data.DataList"),
            ("DataDictionary", "VRC.SDK3.Data.DataDictionary"),
            ("UdonSharpBehaviour", "VRC.Udon.UdonBehaviour"),
        ])
    })
}

/// Map a source-visible type name to its canonical host type name. Total for
/// known builtins (including element-wise for `T[]` array names); unknown
/// names pass through unchanged.
pub fn source_to_host(name: &str) -> String {
    if let Some(elem) = name.strip_suffix("[]") {
        return format!("{}[]", source_to_host(elem));
    }
    builtin_host_names()
        .get(name)
        .map(|s| s.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Map a source-visible type name to the `VmType` the assembler prints for
/// it in a data entry.
pub fn source_to_vm_type(name: &str) -> VmType {
    if let Some(elem) = name.strip_suffix("[]") {
        return VmType::Array(Box::new(source_to_vm_type(elem)));
    }
    match name {
        "int" => VmType::Int32,
        "long" => VmType::Int64,
        "float" => VmType::Float32,
        "double" => VmType::Float64,
        "bool" => VmType::Bool,
        "char" => VmType::Char,
        "string" => VmType::String,
        _ => VmType::Reference(uasmc_core::sanitize_host_name(&source_to_host(name))),
    }
}

/// Numeric integer source type names, used for the ESR's "integer-to-integer
/// scores 1" overload rule.
pub fn is_integer_type(name: &str) -> bool {
    matches!(name, "int" | "long" | "char")
}

/// Whether `name` denotes a generic type-variable placeholder (erased at
/// this layer; `spec.md §1`'s non-goal excludes higher-kinded generics, but
/// a single erased placeholder token is still scored specially by overload
/// resolution per `spec.md §3`).
pub fn is_generic_placeholder(name: &str) -> bool {
    name == "T" || name == "object" || name == "Object"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_mapping_is_total() {
        assert_eq!(source_to_host("int"), "System.Int32");
        assert_eq!(source_to_host("string"), "System.String");
        assert_eq!(source_to_host("Material"), "UnityEngine.Material");
    }

    #[test]
    fn unknown_name_preserved_verbatim() {
        assert_eq!(source_to_host("MyCustomClass"), "MyCustomClass");
    }

    #[test]
    fn array_mapping_is_elementwise() {
        assert_eq!(source_to_host("int[]"), "System.Int32[]");
        assert_eq!(source_to_host("Material[]"), "UnityEngine.Material[]");
    }

    #[test]
    fn vm_type_mapping() {
        assert_eq!(source_to_vm_type("int"), VmType::Int32);
        assert_eq!(
            source_to_vm_type("int[]"),
            VmType::Array(Box::new(VmType::Int32))
        );
        assert!(matches!(source_to_vm_type("Material"), VmType::Reference(_)));
    }

    #[test]
    fn integer_type_classification() {
        assert!(is_integer_type("int"));
        assert!(is_integer_type("long"));
        assert!(!is_integer_type("float"));
    }
}
