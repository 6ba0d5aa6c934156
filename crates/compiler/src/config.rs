//! Compiler configuration, mirroring the teacher's `CompilerConfig` /
//! `ExternalBuiltin` extensibility pattern (`spec.md §6`'s ingress contract:
//! output directory, optimize flag, emit-reflection flag, exclude-dirs,
//! allow-circular toggle).

use serde::Deserialize;
use uasmc_core::sanitize::sanitize_host_name;

/// Which heap budget applies to an entry point, per `spec.md §6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BudgetMode {
    /// 512-entry budget, 65,536-entry soft runtime-warning threshold.
    #[default]
    Short,
    /// 1,048,576-entry budget, no soft-warning threshold.
    Extended,
}

impl BudgetMode {
    pub fn limit(self) -> usize {
        match self {
            BudgetMode::Short => 512,
            BudgetMode::Extended => 1_048_576,
        }
    }

    /// The soft runtime-warning threshold, if this mode has one
    /// (`spec.md §9`'s open question: default to warning only in short mode).
    pub fn soft_warning_threshold(self) -> Option<usize> {
        match self {
            BudgetMode::Short => Some(65_536),
            BudgetMode::Extended => None,
        }
    }
}

/// An extern signature supplied by an embedder, overriding or extending the
/// static extern table (teacher idiom: `ExternalBuiltin`).
#[derive(Debug, Clone)]
pub struct ExternOverride {
    /// Source-visible type name this override applies to.
    pub type_name: String,
    /// Member name (method, property, or `ctor`).
    pub member_name: String,
    /// Verbatim signature string to emit for this member, bypassing
    /// resolution entirely (spec.md §4.1: "explicit signature override").
    pub signature: String,
}

impl ExternOverride {
    pub fn new(
        type_name: impl Into<String>,
        member_name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self::try_new(type_name, member_name, signature).expect("invalid extern signature override")
    }

    /// Fallible form of [`ExternOverride::new`], for callers (like the TOML
    /// config loader) parsing overrides from untrusted input rather than
    /// typing them as Rust literals.
    pub fn try_new(
        type_name: impl Into<String>,
        member_name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Result<Self, String> {
        let signature = signature.into();
        Self::validate_signature(&signature)?;
        Ok(ExternOverride {
            type_name: type_name.into(),
            member_name: member_name.into(),
            signature,
        })
    }

    /// Reject signatures containing characters that would corrupt the
    /// assembler's `EXTERN, "<signature>"` operand (teacher idiom:
    /// `ExternalBuiltin::validate_symbol` guarding against LLVM IR
    /// injection; here we guard against assembly-text injection instead).
    fn validate_signature(signature: &str) -> Result<(), String> {
        if signature.is_empty() {
            return Err("extern signature override cannot be empty".to_string());
        }
        for c in signature.chars() {
            if c == '"' || c == '\n' || c == '\r' {
                return Err(format!(
                    "invalid character {c:?} in extern signature override {signature:?}"
                ));
            }
        }
        Ok(())
    }
}

/// Configuration for a single orchestrator run across one or more entry
/// points.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Run the TAC optimizer pipeline before lowering.
    pub optimize: bool,
    /// Append `__refl_typeid` / `__refl_typename` / `__refl_typeids` data
    /// entries.
    pub emit_reflection: bool,
    /// Directory name fragments to exclude from reachable-class collection
    /// (forwarded to the caller's file discovery; the orchestrator itself
    /// only sees an already-filtered file list, per `spec.md §6`).
    pub exclude_dirs: Vec<String>,
    /// Permit circular class references during dependency-graph
    /// construction upstream (the orchestrator does not itself build that
    /// graph; this flag is threaded through so the embedder's external
    /// dependency-graph collaborator can honor it).
    pub allow_circular: bool,
    /// Which heap budget applies.
    pub budget_mode: BudgetMode,
    /// Additional or overriding extern signatures.
    pub extra_externs: Vec<ExternOverride>,
    /// Whether an over-budget entry point still gets its assembly text
    /// written (`spec.md §7`: "the orchestrator still emits the file
    /// unless configured otherwise"). Default `true`; set `false` to treat
    /// over-budget as a hard failure that withholds output.
    pub write_over_budget: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            optimize: true,
            emit_reflection: false,
            exclude_dirs: Vec::new(),
            allow_circular: false,
            budget_mode: BudgetMode::Short,
            extra_externs: Vec::new(),
            write_over_budget: true,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_emit_reflection(mut self, emit: bool) -> Self {
        self.emit_reflection = emit;
        self
    }

    pub fn with_exclude_dir(mut self, dir: impl Into<String>) -> Self {
        self.exclude_dirs.push(dir.into());
        self
    }

    pub fn with_allow_circular(mut self, allow: bool) -> Self {
        self.allow_circular = allow;
        self
    }

    pub fn with_budget_mode(mut self, mode: BudgetMode) -> Self {
        self.budget_mode = mode;
        self
    }

    pub fn with_write_over_budget(mut self, write: bool) -> Self {
        self.write_over_budget = write;
        self
    }

    pub fn with_extern_override(mut self, extern_override: ExternOverride) -> Self {
        self.extra_externs.push(extern_override);
        self
    }

    /// Look up an embedder-supplied override for `(type_name, member_name)`,
    /// composing with `spec.md §4.1`'s resolution order ahead of the static
    /// tables.
    pub fn find_override(&self, type_name: &str, member_name: &str) -> Option<&str> {
        self.extra_externs
            .iter()
            .find(|o| o.type_name == type_name && o.member_name == member_name)
            .map(|o| o.signature.as_str())
    }

    /// Whether `path` should be excluded from reachable-class collection.
    pub fn is_excluded(&self, path: &std::path::Path) -> bool {
        self.exclude_dirs.iter().any(|d| {
            path.components()
                .any(|c| c.as_os_str().to_string_lossy() == *d)
        })
    }

    /// Parse a `CompilerConfig` from a TOML document (`SPEC_FULL.md §2`'s
    /// project-config file), layering any set field over the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        let parsed: TomlConfig = toml::from_str(text).map_err(|e| e.to_string())?;
        let mut config = CompilerConfig::default();

        if let Some(v) = parsed.optimize {
            config.optimize = v;
        }
        if let Some(v) = parsed.emit_reflection {
            config.emit_reflection = v;
        }
        if let Some(v) = parsed.exclude_dirs {
            config.exclude_dirs = v;
        }
        if let Some(v) = parsed.allow_circular {
            config.allow_circular = v;
        }
        if let Some(mode) = parsed.budget_mode {
            config.budget_mode = match mode.as_str() {
                "short" => BudgetMode::Short,
                "extended" => BudgetMode::Extended,
                other => return Err(format!("unknown budget mode {other:?}, expected \"short\" or \"extended\"")),
            };
        }
        if let Some(v) = parsed.write_over_budget {
            config.write_over_budget = v;
        }
        for o in parsed.extern_overrides {
            config.extra_externs.push(
                ExternOverride::try_new(o.type_name, o.member_name, o.signature)
                    .map_err(|e| format!("invalid [[extern_overrides]] entry: {e}"))?,
            );
        }

        Ok(config)
    }

    /// Read and parse a `CompilerConfig` from a TOML file on disk.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file `{}`: {e}", path.display()))?;
        Self::from_toml_str(&text)
    }
}

/// The on-disk shape of a `uasmc.toml` project config file; every field is
/// optional so a file only needs to name what it overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct TomlConfig {
    optimize: Option<bool>,
    emit_reflection: Option<bool>,
    exclude_dirs: Option<Vec<String>>,
    allow_circular: Option<bool>,
    budget_mode: Option<String>,
    write_over_budget: Option<bool>,
    extern_overrides: Vec<TomlExternOverride>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TomlExternOverride {
    type_name: String,
    member_name: String,
    signature: String,
}

/// Sanity-check a type name intended for use as an extern owner: the host
/// mapping must sanitize to a non-empty string.
pub fn validate_type_name(name: &str) -> Result<(), String> {
    if sanitize_host_name(name).is_empty() {
        Err(format!("type name {name:?} sanitizes to an empty owner"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_limits_match_spec_defaults() {
        assert_eq!(BudgetMode::Short.limit(), 512);
        assert_eq!(BudgetMode::Extended.limit(), 1_048_576);
        assert_eq!(BudgetMode::Short.soft_warning_threshold(), Some(65_536));
        assert_eq!(BudgetMode::Extended.soft_warning_threshold(), None);
    }

    #[test]
    fn config_builder() {
        let config = CompilerConfig::new()
            .with_optimize(false)
            .with_emit_reflection(true)
            .with_exclude_dir("generated")
            .with_budget_mode(BudgetMode::Extended);

        assert!(!config.optimize);
        assert!(config.emit_reflection);
        assert_eq!(config.exclude_dirs, vec!["generated"]);
        assert_eq!(config.budget_mode, BudgetMode::Extended);
    }

    #[test]
    fn extern_override_lookup() {
        let config = CompilerConfig::new().with_extern_override(ExternOverride::new(
            "Material",
            "SetColor",
            "Custom.__SetColor__Custom",
        ));
        assert_eq!(
            config.find_override("Material", "SetColor"),
            Some("Custom.__SetColor__Custom")
        );
        assert_eq!(config.find_override("Material", "GetColor"), None);
    }

    #[test]
    #[should_panic(expected = "invalid extern signature override")]
    fn extern_override_rejects_quote_injection() {
        let _ = ExternOverride::new("Material", "SetColor", "evil\", JUMP, L\"");
    }

    #[test]
    fn exclude_dirs_matches_path_components() {
        let config = CompilerConfig::new().with_exclude_dir("generated");
        assert!(config.is_excluded(std::path::Path::new("src/generated/Foo.uc")));
        assert!(!config.is_excluded(std::path::Path::new("src/hand_written/Foo.uc")));
    }

    #[test]
    fn toml_config_overrides_only_set_fields() {
        let config = CompilerConfig::from_toml_str(
            r#"
            emit-reflection = true
            budget-mode = "extended"
            exclude-dirs = ["generated"]
            "#,
        )
        .unwrap();
        assert!(config.emit_reflection);
        assert!(config.optimize, "unset fields keep the default");
        assert_eq!(config.budget_mode, BudgetMode::Extended);
        assert_eq!(config.exclude_dirs, vec!["generated"]);
    }

    #[test]
    fn toml_config_parses_extern_overrides() {
        let config = CompilerConfig::from_toml_str(
            r#"
            [[extern-overrides]]
            type-name = "Material"
            member-name = "SetColor"
            signature = "Custom.__SetColor__Custom"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.find_override("Material", "SetColor"),
            Some("Custom.__SetColor__Custom")
        );
    }

    #[test]
    fn toml_config_rejects_unknown_budget_mode() {
        let result = CompilerConfig::from_toml_str(r#"budget-mode = "huge""#);
        assert!(result.is_err());
    }

    #[test]
    fn toml_config_empty_document_yields_defaults() {
        let config = CompilerConfig::from_toml_str("").unwrap();
        assert_eq!(config.budget_mode, BudgetMode::Short);
        assert!(config.optimize);
    }
}
