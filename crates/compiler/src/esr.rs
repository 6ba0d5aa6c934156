//! Extern Signature Registry (ESR): `spec.md §4.1`.
//!
//! Resolves a canonical VM extern signature string from
//! `(sourceTypeName, memberName, paramSourceTypes)`. Resolution order:
//!
//! 1. an embedder-supplied [`crate::config::ExternOverride`] (verbatim, no
//!    further processing);
//! 2. [`crate::static_externs`]'s hand-authored table: a direct
//!    `(typeName, member)` entry in the static property table for a
//!    getter/setter access, the static constructor table for `ctor`, or the
//!    static method table for a plain method call;
//! 3. a [`crate::tmr::TypeMetadataRegistry`] entry, scored by overload when
//!    parameter types are known, by first-registered when they are not; an
//!    entry's own `explicit_signature` (if any) is returned verbatim,
//!    otherwise a signature is synthesized from its host types;
//! 4. last-resort synthesis straight from the sanitized source type name,
//!    member name, and parameter types, for host members neither table was
//!    ever told about. The return type can't be known in this case, so it
//!    synthesizes as `System.Void`.
//!
//! `spec.md §4.1` documents `resolve` as returning nothing when no path
//! resolves. Step 4 here is unconditional, so in practice it never does —
//! see the "`ExternRegistry::resolve`'s `Signature?` contract" entry in
//! `DESIGN.md` for why that's a deliberate departure rather than an
//! oversight.

use crate::config::CompilerConfig;
use crate::static_externs::{self, PropertyAccess};
use crate::tmr::TypeMetadataRegistry;
use crate::types::source_to_host;
use uasmc_core::sanitize::{build_signature, sanitize_host_name, sanitize_signature_part};

/// Owns the dynamic (stub-scanned or caller-registered) half of the type
/// metadata the static builtin tables in `builtins.rs` seed at startup.
#[derive(Debug, Clone, Default)]
pub struct ExternRegistry {
    tmr: TypeMetadataRegistry,
}

impl ExternRegistry {
    pub fn new() -> Self {
        ExternRegistry::default()
    }

    pub fn tmr(&self) -> &TypeMetadataRegistry {
        &self.tmr
    }

    pub fn tmr_mut(&mut self) -> &mut TypeMetadataRegistry {
        &mut self.tmr
    }

    /// Resolve the canonical extern signature for a member access.
    ///
    /// `param_source_types` is empty when the caller only knows a member
    /// name was referenced without yet having resolved argument types (e.g.
    /// a bare property read); in that case the first registered overload is
    /// used.
    pub fn resolve(
        &self,
        config: &CompilerConfig,
        source_type_name: &str,
        member_name: &str,
        param_source_types: &[String],
    ) -> String {
        if let Some(sig) = config.find_override(source_type_name, member_name) {
            return sig.to_string();
        }

        let host_type_name = source_to_host(source_type_name);
        let param_host_types: Vec<String> =
            param_source_types.iter().map(|t| source_to_host(t)).collect();

        if let Some(sig) = static_externs::lookup_method(&host_type_name, member_name) {
            return sig;
        }

        if let Some(type_meta) = self.tmr.get(&host_type_name) {
            let found = if param_source_types.is_empty() {
                type_meta.get_member(member_name)
            } else {
                type_meta
                    .resolve_overload_by_types(member_name, &param_host_types)
                    .or_else(|| type_meta.get_member(member_name))
            };
            if let Some(member) = found {
                if let Some(sig) = &member.explicit_signature {
                    return sig.clone();
                }
                let owner = sanitize_host_name(&member.owner_host);
                let params: Vec<String> = member
                    .param_host_types
                    .iter()
                    .map(|t| sanitize_signature_part(t))
                    .collect();
                let ret = sanitize_signature_part(&member.return_host_type);
                return build_signature(&owner, &member.member_name, &params, &ret);
            }
        }

        let owner = sanitize_host_name(&host_type_name);
        let params: Vec<String> = param_host_types
            .iter()
            .map(|t| sanitize_signature_part(t))
            .collect();
        build_signature(&owner, member_name, &params, "SystemVoid")
    }

    /// Resolve a constructor signature: the static constructor table's entry
    /// if the host type has one, otherwise the generic
    /// `{Owner}.__ctor____{Owner}` shape per `spec.md §4.1` (constructors
    /// don't vary by signature at the VM boundary, so there's no TMR
    /// overload step to consult here).
    pub fn resolve_ctor(&self, config: &CompilerConfig, source_type_name: &str) -> String {
        if let Some(sig) = config.find_override(source_type_name, "ctor") {
            return sig.to_string();
        }
        let host_type_name = source_to_host(source_type_name);
        if let Some(sig) = static_externs::lookup_ctor(&host_type_name) {
            return sig;
        }
        let owner = sanitize_host_name(&host_type_name);
        build_signature(&owner, "ctor", &[], &owner)
    }

    /// Resolve a property getter/setter signature: the static property
    /// table's entry if present, otherwise the TMR's `Property`-kind member
    /// for the host type, otherwise last-resort synthesis with the getter
    /// named `get_{member}`/setter named `set_{member}` and the supplied
    /// value type as the sole parameter (setter) or return type (getter).
    pub fn resolve_property(
        &self,
        config: &CompilerConfig,
        source_type_name: &str,
        member_name: &str,
        access: PropertyAccess,
        value_source_type: &str,
    ) -> String {
        let override_name = match access {
            PropertyAccess::Getter => format!("get_{member_name}"),
            PropertyAccess::Setter => format!("set_{member_name}"),
        };
        if let Some(sig) = config.find_override(source_type_name, &override_name) {
            return sig.to_string();
        }

        let host_type_name = source_to_host(source_type_name);
        if let Some(sig) = static_externs::lookup_property(&host_type_name, member_name, access) {
            return sig;
        }

        let value_host_type = source_to_host(value_source_type);
        if let Some(type_meta) = self.tmr.get(&host_type_name) {
            if let Some(member) = type_meta.get_member(member_name) {
                if let Some(sig) = &member.explicit_signature {
                    return sig.clone();
                }
            }
        }

        let owner = sanitize_host_name(&host_type_name);
        let value = sanitize_signature_part(&value_host_type);
        match access {
            PropertyAccess::Getter => build_signature(&owner, &format!("get_{member_name}"), &[], &value),
            PropertyAccess::Setter => {
                build_signature(&owner, &format!("set_{member_name}"), &[value], "SystemVoid")
            }
        }
    }
}
