//! Type Metadata Registry (TMR): `spec.md §2` / `§3`.
//!
//! Maps a source-visible type name to its canonical host type, and a member
//! name to one or more overload records. Supports `has`, `get-first`,
//! `get-overloads`, `resolve-overload-by-arity-and-types`.

use crate::types::{is_generic_placeholder, is_integer_type};
use std::collections::HashMap;

/// What kind of member a `MemberMetadata` describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Property,
    Constructor,
}

/// A single overload record for a type member (`spec.md §3`).
#[derive(Debug, Clone, PartialEq)]
pub struct MemberMetadata {
    pub owner_host: String,
    pub member_name: String,
    pub kind: MemberKind,
    pub param_host_types: Vec<String>,
    pub return_host_type: String,
    pub is_static: bool,
    /// Emitted verbatim instead of synthesizing a signature, if present.
    pub explicit_signature: Option<String>,
}

impl MemberMetadata {
    pub fn arity(&self) -> usize {
        self.param_host_types.len()
    }
}

/// Per-parameter compatibility score used by overload resolution, both here
/// and in the ESR (`spec.md §4.1`): 2 for an exact match, 1 for a generic
/// placeholder / `Object` / integer-to-integer match, `None` (reject) for
/// anything else.
pub fn score_param(declared: &str, supplied: &str) -> Option<u32> {
    if declared == supplied {
        return Some(2);
    }
    if is_generic_placeholder(declared) || is_generic_placeholder(supplied) {
        return Some(1);
    }
    if is_integer_type(declared) && is_integer_type(supplied) {
        return Some(1);
    }
    None
}

/// Score a full overload's parameter list against supplied argument types:
/// the arity must match and every parameter must score, or the overload is
/// rejected (`None`). On success, returns the summed score.
pub fn score_overload(declared: &[String], supplied: &[String]) -> Option<u32> {
    if declared.len() != supplied.len() {
        return None;
    }
    let mut total = 0;
    for (d, s) in declared.iter().zip(supplied.iter()) {
        total += score_param(d, s)?;
    }
    Some(total)
}

/// An ordered member-name -> overload-list map, preserving registration
/// order without pulling in an external ordered-map crate (teacher idiom:
/// the small hand-rolled collections throughout `call_graph.rs` rather than
/// reaching for a crate where `std` suffices).
#[derive(Debug, Clone, Default)]
struct OrderedOverloads {
    order: Vec<String>,
    by_name: HashMap<String, Vec<MemberMetadata>>,
}

impl OrderedOverloads {
    fn push(&mut self, member: MemberMetadata) {
        self.by_name
            .entry(member.member_name.clone())
            .or_insert_with(|| {
                self.order.push(member.member_name.clone());
                Vec::new()
            })
            .push(member);
    }

    fn get(&self, name: &str) -> Option<&[MemberMetadata]> {
        self.by_name.get(name).map(|v| v.as_slice())
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.by_name.clear();
    }
}

/// Type metadata for one host type: its full host name, its source-visible
/// name, and the ordered map of member overloads (`spec.md §3`).
#[derive(Debug, Clone, Default)]
pub struct TypeMetadata {
    pub host_full_name: String,
    pub source_name: String,
    members: OrderedOverloads,
}

impl TypeMetadata {
    pub fn new(host_full_name: impl Into<String>, source_name: impl Into<String>) -> Self {
        TypeMetadata {
            host_full_name: host_full_name.into(),
            source_name: source_name.into(),
            members: OrderedOverloads::default(),
        }
    }

    pub fn register(&mut self, member: MemberMetadata) {
        self.members.push(member);
    }

    pub fn has(&self, member_name: &str) -> bool {
        self.members.get(member_name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// `get-first`: the first recorded overload for a member, used by ESR
    /// resolution when the caller supplied no parameter types.
    pub fn get_member(&self, member_name: &str) -> Option<&MemberMetadata> {
        self.members.get(member_name).and_then(|v| v.first())
    }

    /// `get-overloads`.
    pub fn get_overloads(&self, member_name: &str) -> &[MemberMetadata] {
        self.members.get(member_name).unwrap_or(&[])
    }

    /// `resolveOverload(name, arity)`: the first overload matching the given
    /// arity, ignoring parameter types (used when only an arity is known).
    pub fn resolve_overload(&self, member_name: &str, arity: usize) -> Option<&MemberMetadata> {
        self.get_overloads(member_name)
            .iter()
            .find(|m| m.arity() == arity)
    }

    /// Select the best-scoring overload for the supplied parameter host
    /// types, per `spec.md §4.1`: arity must match, and the overload
    /// maximizing the summed per-parameter score wins; ties keep the
    /// earliest-registered candidate (stable `max_by_key` over insertion
    /// order).
    pub fn resolve_overload_by_types(
        &self,
        member_name: &str,
        param_host_types: &[String],
    ) -> Option<&MemberMetadata> {
        self.get_overloads(member_name)
            .iter()
            .filter_map(|m| score_overload(&m.param_host_types, param_host_types).map(|s| (s, m)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, m)| m)
    }
}

/// The Type Metadata Registry: one `TypeMetadata` per known host type,
/// keyed by host full name.
#[derive(Debug, Clone, Default)]
pub struct TypeMetadataRegistry {
    types: HashMap<String, TypeMetadata>,
    order: Vec<String>,
}

impl TypeMetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type(&mut self, host_full_name: &str, source_name: &str) -> &mut TypeMetadata {
        if !self.types.contains_key(host_full_name) {
            self.order.push(host_full_name.to_string());
            self.types.insert(
                host_full_name.to_string(),
                TypeMetadata::new(host_full_name, source_name),
            );
        }
        self.types.get_mut(host_full_name).unwrap()
    }

    pub fn has(&self, host_full_name: &str) -> bool {
        self.types.contains_key(host_full_name)
    }

    pub fn get(&self, host_full_name: &str) -> Option<&TypeMetadata> {
        self.types.get(host_full_name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn clear(&mut self) {
        self.types.clear();
        self.order.clear();
    }

    /// Iterate types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeMetadata> {
        self.order.iter().filter_map(move |name| self.types.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, params: &[&str], ret: &str) -> MemberMetadata {
        MemberMetadata {
            owner_host: "UnityEngine.Material".to_string(),
            member_name: name.to_string(),
            kind: MemberKind::Method,
            param_host_types: params.iter().map(|s| s.to_string()).collect(),
            return_host_type: ret.to_string(),
            is_static: false,
            explicit_signature: None,
        }
    }

    #[test]
    fn score_param_rules() {
        assert_eq!(score_param("System.String", "System.String"), Some(2));
        assert_eq!(score_param("T", "UnityEngine.Color"), Some(1));
        assert_eq!(score_param("System.Object", "System.String"), Some(1));
        assert_eq!(score_param("int", "long"), Some(1));
        assert_eq!(score_param("System.String", "UnityEngine.Color"), None);
    }

    #[test]
    fn registry_preserves_insertion_order() {
        let mut registry = TypeMetadataRegistry::new();
        registry.register_type("UnityEngine.Material", "Material");
        registry.register_type("UnityEngine.Transform", "Transform");
        let names: Vec<_> = registry.iter().map(|t| t.host_full_name.clone()).collect();
        assert_eq!(names, vec!["UnityEngine.Material", "UnityEngine.Transform"]);
    }

    #[test]
    fn overload_resolution_by_arity() {
        let mut t = TypeMetadata::new("UnityEngine.Material", "Material");
        t.register(member("SetColor", &["System.String"], "System.Void"));
        t.register(member(
            "SetColor",
            &["System.String", "UnityEngine.Color"],
            "System.Void",
        ));
        let resolved = t.resolve_overload("SetColor", 2).unwrap();
        assert_eq!(resolved.param_host_types.len(), 2);
    }

    #[test]
    fn overload_resolution_by_types_picks_best_score() {
        let mut t = TypeMetadata::new("UnityEngine.Material", "Material");
        t.register(member("Set", &["System.Object"], "System.Void"));
        t.register(member("Set", &["System.String"], "System.Void"));
        let resolved = t
            .resolve_overload_by_types("Set", &["System.String".to_string()])
            .unwrap();
        assert_eq!(resolved.param_host_types, vec!["System.String".to_string()]);
    }

    #[test]
    fn overload_resolution_rejects_mismatched_types() {
        let mut t = TypeMetadata::new("UnityEngine.Material", "Material");
        t.register(member("Set", &["UnityEngine.Color"], "System.Void"));
        assert!(t
            .resolve_overload_by_types("Set", &["System.String".to_string()])
            .is_none());
    }

    #[test]
    fn has_is_empty_clear() {
        let mut t = TypeMetadata::new("UnityEngine.Material", "Material");
        assert!(t.is_empty());
        t.register(member("SetColor", &["System.String"], "System.Void"));
        assert!(!t.is_empty());
        assert!(t.has("SetColor"));
        t.clear();
        assert!(t.is_empty());
        assert!(!t.has("SetColor"));
    }
}
