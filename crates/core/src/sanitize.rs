//! Host-name sanitization rules shared by the extern signature registry and
//! the assembler: strip `System.`, remove dots, map `[]` to `Array`, `&` to
//! `Ref`.

/// Remove dots and map array brackets / reference markers. Used, without the
/// `System.`-prefix strip, for parameter and return-type components of an
/// extern signature (the spec's worked example keeps `System.String` as
/// `SystemString` in that position).
fn strip_dots_and_markers(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {}
            '[' => {
                if chars.peek() == Some(&']') {
                    chars.next();
                    out.push_str("Array");
                } else {
                    out.push(c);
                }
            }
            '&' => out.push_str("Ref"),
            other => out.push(other),
        }
    }
    out
}

/// Sanitize a dotted host type name into the flattened `OwnerHost` component
/// of an extern signature, per `spec.md §6`: strips a leading `System.`
/// namespace, removes remaining dots, maps array brackets to `Array` and
/// reference markers to `Ref`.
pub fn sanitize_host_name(name: &str) -> String {
    let stripped = name.strip_prefix("System.").unwrap_or(name);
    strip_dots_and_markers(stripped)
}

/// Sanitize a parameter or return-type component of an extern signature:
/// same dot/array/ref mapping as [`sanitize_host_name`], but without
/// stripping a `System.` prefix, matching the literal worked example in
/// `spec.md §8` (`System.String` → `SystemString`, not `String`).
pub fn sanitize_signature_part(name: &str) -> String {
    strip_dots_and_markers(name)
}

/// Build the canonical extern signature string:
/// `{OwnerHost}.__{MemberOrCtor}__{ParamTypes}__{ReturnType}`, with
/// parameters joined by `_`. Constructors use `__ctor____{OwnerHost}` as the
/// member segment per `spec.md §6`.
pub fn build_signature(owner: &str, member: &str, params: &[String], return_type: &str) -> String {
    let owner = sanitize_host_name(owner);
    if member == "ctor" {
        return format!("{owner}.__ctor____{owner}");
    }
    let param_str = params
        .iter()
        .map(|p| sanitize_signature_part(p))
        .collect::<Vec<_>>()
        .join("_");
    let ret = sanitize_signature_part(return_type);
    format!("{owner}.__{member}__{param_str}__{ret}")
}
