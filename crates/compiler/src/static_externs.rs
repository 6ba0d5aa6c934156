//! The ESR's hand-authored static tables (`spec.md §4.1`): property,
//! constructor, and method entries for host members the embedder knows
//! about up front, independent of anything a stub scan discovers at build
//! time. Consulted before the [`crate::tmr::TypeMetadataRegistry`] in
//! [`crate::esr::ExternRegistry::resolve`]/`resolve_property`/`resolve_ctor`.
//!
//! The table only needs to be as wide as the host surface this compiler
//! actually targets; entries below cover the Unity/VRChat-shaped types
//! already named throughout `types.rs` and the ESR's own doc examples
//! (`UnityEngine.Material`, `UnityEngine.Transform`, the two `VRC.SDK3.Data`
//! collection types). Signatures are computed from the declared host types
//! through the same sanitizer the TMR path uses rather than typed out by
//! hand, so a renamed host type can't silently desync the two tables.

use std::collections::HashMap;
use std::sync::OnceLock;
use uasmc_core::sanitize::{build_signature, sanitize_host_name, sanitize_signature_part};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccess {
    Getter,
    Setter,
}

struct PropertyEntry {
    owner_host: &'static str,
    name: &'static str,
    value_host: &'static str,
}

/// Constructors don't vary by parameter list at the VM boundary
/// ([`build_signature`]'s `ctor` branch always emits `{Owner}.__ctor____{Owner}`
/// regardless of what's passed for params), so the static table only needs
/// to record which owner host types have one.
struct CtorEntry {
    owner_host: &'static str,
}

struct MethodEntry {
    owner_host: &'static str,
    name: &'static str,
    param_host_types: &'static [&'static str],
    return_host_type: &'static str,
}

const PROPERTIES: &[PropertyEntry] = &[
    PropertyEntry { owner_host: "UnityEngine.Transform", name: "position", value_host: "UnityEngine.Vector3" },
    PropertyEntry { owner_host: "UnityEngine.Transform", name: "rotation", value_host: "UnityEngine.Quaternion" },
    PropertyEntry { owner_host: "UnityEngine.Transform", name: "localScale", value_host: "UnityEngine.Vector3" },
    PropertyEntry { owner_host: "UnityEngine.Transform", name: "parent", value_host: "UnityEngine.Transform" },
    PropertyEntry { owner_host: "UnityEngine.GameObject", name: "active", value_host: "System.Boolean" },
    PropertyEntry { owner_host: "UnityEngine.GameObject", name: "name", value_host: "System.String" },
    PropertyEntry { owner_host: "UnityEngine.Material", name: "color", value_host: "UnityEngine.Color" },
    PropertyEntry { owner_host: "VRC.SDK3.Data.DataList", name: "Count", value_host: "System.Int32" },
    PropertyEntry { owner_host: "VRC.SDK3.Data.DataDictionary", name: "Count", value_host: "System.Int32" },
];

const CTORS: &[CtorEntry] = &[
    CtorEntry { owner_host: "UnityEngine.Vector3" },
    CtorEntry { owner_host: "UnityEngine.Vector2" },
    CtorEntry { owner_host: "UnityEngine.Color" },
    CtorEntry { owner_host: "VRC.SDK3.Data.DataList" },
    CtorEntry { owner_host: "VRC.SDK3.Data.DataDictionary" },
];

const METHODS: &[MethodEntry] = &[
    MethodEntry {
        owner_host: "UnityEngine.Transform",
        name: "LookAt",
        param_host_types: &["UnityEngine.Transform"],
        return_host_type: "System.Void",
    },
    MethodEntry {
        owner_host: "UnityEngine.Transform",
        name: "Translate",
        param_host_types: &["UnityEngine.Vector3"],
        return_host_type: "System.Void",
    },
    MethodEntry {
        owner_host: "UnityEngine.GameObject",
        name: "SetActive",
        param_host_types: &["System.Boolean"],
        return_host_type: "System.Void",
    },
    MethodEntry {
        owner_host: "UnityEngine.Material",
        name: "SetColor",
        param_host_types: &["System.String", "UnityEngine.Color"],
        return_host_type: "System.Void",
    },
    MethodEntry {
        owner_host: "UnityEngine.Mathf",
        name: "Clamp",
        param_host_types: &["System.Single", "System.Single", "System.Single"],
        return_host_type: "System.Single",
    },
    MethodEntry {
        owner_host: "VRC.SDK3.Data.DataList",
        name: "Add",
        param_host_types: &["System.Object"],
        return_host_type: "System.Void",
    },
    MethodEntry {
        owner_host: "VRC.SDK3.Data.DataList",
        name: "Remove",
        param_host_types: &["System.Object"],
        return_host_type: "System.Boolean",
    },
    MethodEntry {
        owner_host: "VRC.SDK3.Data.DataDictionary",
        name: "Set",
        param_host_types: &["System.Object", "System.Object"],
        return_host_type: "System.Void",
    },
];

struct Tables {
    properties: HashMap<(&'static str, &'static str, PropertyAccess), String>,
    ctors: HashMap<&'static str, String>,
    methods: HashMap<(&'static str, &'static str), String>,
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut properties = HashMap::new();
        for entry in PROPERTIES {
            let owner = sanitize_host_name(entry.owner_host);
            let value = sanitize_signature_part(entry.value_host);
            properties.insert(
                (entry.owner_host, entry.name, PropertyAccess::Getter),
                build_signature(&owner, &format!("get_{}", entry.name), &[], &value),
            );
            properties.insert(
                (entry.owner_host, entry.name, PropertyAccess::Setter),
                build_signature(&owner, &format!("set_{}", entry.name), &[value], "SystemVoid"),
            );
        }

        let mut ctors = HashMap::new();
        for entry in CTORS {
            ctors.insert(
                entry.owner_host,
                build_signature(entry.owner_host, "ctor", &[], entry.owner_host),
            );
        }

        let mut methods = HashMap::new();
        for entry in METHODS {
            let owner = sanitize_host_name(entry.owner_host);
            let params: Vec<String> =
                entry.param_host_types.iter().map(|t| sanitize_signature_part(t)).collect();
            let ret = sanitize_signature_part(entry.return_host_type);
            methods.insert(
                (entry.owner_host, entry.name),
                build_signature(&owner, entry.name, &params, &ret),
            );
        }

        Tables { properties, ctors, methods }
    })
}

pub fn lookup_property(host_type: &str, member: &str, access: PropertyAccess) -> Option<String> {
    tables()
        .properties
        .iter()
        .find(|((owner, name, acc), _)| *owner == host_type && *name == member && *acc == access)
        .map(|(_, sig)| sig.clone())
}

pub fn lookup_ctor(host_type: &str) -> Option<String> {
    tables()
        .ctors
        .iter()
        .find(|(owner, _)| **owner == host_type)
        .map(|(_, sig)| sig.clone())
}

pub fn lookup_method(host_type: &str, member: &str) -> Option<String> {
    tables()
        .methods
        .iter()
        .find(|((owner, name), _)| *owner == host_type && *name == member)
        .map(|(_, sig)| sig.clone())
}
