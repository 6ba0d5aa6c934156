//! End-to-end tests: source text in, assembled `.uasm` text or a budget
//! report out, through `uasmc::parse_source` + `uasmc::orchestrator::compile`.

use std::io::Write;
use uasmc::config::{BudgetMode, CompilerConfig, ExternOverride};
use uasmc::orchestrator;
use uasmc::parse_source;

fn write_source(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn compiles_entry_class_with_property_and_method() {
    let file = write_source(
        r#"
        @Entry
        class Counter : UdonSharpBehaviour {
            public int value = 0;

            public void Increment() {
                value = value + 1;
            }
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();
    let config = CompilerConfig::new();
    let report = orchestrator::compile(&[program], &config);

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.entry_name, "Counter");
    assert!(!entry.over_budget);
    let assembly = entry.assembly.as_ref().unwrap();
    assert!(assembly.contains(".data_start"));
    assert!(assembly.contains("Counter_value"));
    assert!(assembly.contains("EXTERN"));
}

#[test]
fn constant_arithmetic_is_folded_to_a_single_extern_free_copy() {
    // `total` is assigned a fully-constant expression; after constant
    // folding + DCE the optimizer should leave no arithmetic EXTERN call
    // for this statement at all (`spec.md §4.4`/§8`: constant-fold removes
    // the BinOp outright).
    let file = write_source(
        r#"
        @Entry
        class Calc : UdonSharpBehaviour {
            public int total = 0;

            public void Compute() {
                total = 1 + 2;
            }
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();
    let config = CompilerConfig::new();
    let report = orchestrator::compile(&[program], &config);

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let assembly = report.entries[0].assembly.as_ref().unwrap();
    assert!(!assembly.contains("op_Addition"));
}

#[test]
fn unoptimized_run_keeps_the_arithmetic_extern() {
    let file = write_source(
        r#"
        @Entry
        class Calc : UdonSharpBehaviour {
            public int total = 0;

            public void Compute() {
                total = 1 + 2;
            }
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();
    let config = CompilerConfig::new().with_optimize(false);
    let report = orchestrator::compile(&[program], &config);

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let assembly = report.entries[0].assembly.as_ref().unwrap();
    assert!(assembly.contains("op_Addition"));
}

#[test]
fn entry_class_missing_required_base_is_rejected() {
    let file = write_source(
        r#"
        @Entry
        class Orphan : SomeOtherBase {
            public void Start() { }
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();
    let config = CompilerConfig::new();
    let report = orchestrator::compile(&[program], &config);

    assert!(report.entries.is_empty());
    assert!(!report.errors.is_empty());
    assert!(report.errors[0].message.contains("UdonSharpBehaviour"));
}

#[test]
fn reachable_helper_class_is_scoped_into_its_entry_but_not_into_an_unrelated_one() {
    let file = write_source(
        r#"
        @Entry
        class Player : UdonSharpBehaviour {
            public void Start() {
                Helper h;
            }
        }

        @Entry
        class Lonely : UdonSharpBehaviour {
            public void Start() { }
        }

        class Helper {
            public int score = 0;
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();
    let config = CompilerConfig::new();
    let report = orchestrator::compile(&[program], &config);

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.entries.len(), 2);

    let player = report.entries.iter().find(|e| e.entry_name == "Player").unwrap();
    let lonely = report.entries.iter().find(|e| e.entry_name == "Lonely").unwrap();
    assert!(player.usage_by_class.iter().any(|(class, _)| class == "Helper"));
    assert!(!lonely.usage_by_class.iter().any(|(class, _)| class == "Helper"));
}

#[test]
fn reflection_entries_appear_only_when_requested() {
    let file = write_source(
        r#"
        @Entry
        class MyBehaviour : UdonSharpBehaviour {
            public void Start() { }
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();

    let plain = orchestrator::compile(&[program.clone()], &CompilerConfig::new());
    let plain_asm = plain.entries[0].assembly.as_ref().unwrap();
    assert!(!plain_asm.contains("__refl_typeid"));

    let with_reflection =
        orchestrator::compile(&[program], &CompilerConfig::new().with_emit_reflection(true));
    let asm = with_reflection.entries[0].assembly.as_ref().unwrap();
    assert!(asm.contains("__refl_typeid"));
    assert!(asm.contains("__refl_typename"));
    assert!(asm.contains("__refl_typeids"));
}

#[test]
fn extern_override_replaces_the_static_resolution() {
    let file = write_source(
        r#"
        @Entry
        class Calc : UdonSharpBehaviour {
            public void Compute() {
                int a;
                a = 1 + 2;
            }
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();
    let config = CompilerConfig::new()
        .with_optimize(false)
        .with_extern_override(ExternOverride::new("int", "op_Addition", "Custom.__Add__Custom"));
    let report = orchestrator::compile(&[program], &config);

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let assembly = report.entries[0].assembly.as_ref().unwrap();
    assert!(assembly.contains("Custom.__Add__Custom"));
}

#[test]
fn extended_budget_mode_raises_the_heap_limit() {
    let file = write_source(
        r#"
        @Entry
        class MyBehaviour : UdonSharpBehaviour {
            public void Start() { }
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();

    let short = orchestrator::compile(&[program.clone()], &CompilerConfig::new());
    let extended = orchestrator::compile(
        &[program],
        &CompilerConfig::new().with_budget_mode(BudgetMode::Extended),
    );

    assert_eq!(short.entries[0].budget_limit, 512);
    assert_eq!(extended.entries[0].budget_limit, 1_048_576);
}

#[test]
fn over_budget_entry_still_emits_assembly_by_default_with_split_candidates() {
    // `spec.md §8` scenario 6: a data section whose max address exceeds the
    // short-mode 512-entry limit. 600 distinct int properties on a helper
    // class reachable from the entry guarantees >512 heap addresses.
    let mut helper_fields = String::new();
    for i in 0..600 {
        helper_fields.push_str(&format!("    public int f{i} = {i};\n"));
    }
    let source = format!(
        r#"
        @Entry
        class Overloaded : UdonSharpBehaviour {{
            public void Start() {{
                Helper h;
            }}
        }}

        class Helper {{
{helper_fields}
        }}
        "#
    );
    let file = write_source(&source);
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();

    let default_report = orchestrator::compile(&[program.clone()], &CompilerConfig::new());
    assert!(default_report.errors.is_empty(), "{:?}", default_report.errors);
    let entry = &default_report.entries[0];
    assert!(entry.over_budget);
    assert!(entry.heap_usage > entry.budget_limit);
    assert!(
        entry.assembly.is_some(),
        "over-budget entries still emit assembly by default"
    );
    assert!(!entry.split_candidates.is_empty());
    assert!(entry.split_candidates.iter().any(|c| c.class_name == "Helper"));

    let withheld_report = orchestrator::compile(
        &[program],
        &CompilerConfig::new().with_write_over_budget(false),
    );
    let withheld_entry = &withheld_report.entries[0];
    assert!(withheld_entry.over_budget);
    assert!(withheld_entry.assembly.is_none());
}

#[test]
fn excluded_directory_entry_is_skipped_entirely() {
    let file = write_source(
        r#"
        @Entry
        class MyBehaviour : UdonSharpBehaviour {
            public void Start() { }
        }
        "#,
    );
    let program = parse_source(&std::fs::read_to_string(file.path()).unwrap(), file.path()).unwrap();
    let config = CompilerConfig::new().with_exclude_dir(
        file.path()
            .parent()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned(),
    );
    let report = orchestrator::compile(&[program], &config);
    assert!(report.entries.is_empty());
    assert!(report.errors.is_empty());
}
