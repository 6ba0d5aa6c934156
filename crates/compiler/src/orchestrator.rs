//! Per-entry-point compilation pipeline (`spec.md §4.6`): for every
//! `@Entry` class across the given programs, collects its reachable class
//! set, converts and optimizes TAC, lowers to a [`crate::vm::VmUnit`],
//! checks the result against the configured heap budget, and assembles
//! output text for every entry that passes.

use crate::ast::{ClassDecl, Program};
use crate::ast_to_tac::{convert_all, ConvertedProgram};
use crate::assembler;
use crate::call_graph::ClassReferenceGraph;
use crate::config::CompilerConfig;
use crate::error::{CompileError, ErrorKind};
use crate::esr::ExternRegistry;
use crate::inheritance::InheritanceValidator;
use crate::lowerer::Lowerer;
use crate::method_usage::MethodUsageAnalyzer;
use crate::optimizer;
use crate::registry::ClassRegistry;
use crate::vm::VmUnit;
use std::collections::HashSet;

/// How many over-budget classes to report as split candidates, per
/// `spec.md §4.6`'s "report up to 10".
const MAX_SPLIT_CANDIDATES: usize = 10;

/// One class's estimated standalone heap cost, offered as a split
/// candidate when its entry point is over budget.
#[derive(Debug, Clone)]
pub struct SplitCandidate {
    pub class_name: String,
    pub estimated_heap: u64,
}

/// The outcome of compiling a single entry point.
#[derive(Debug, Clone)]
pub struct EntryResult {
    pub entry_name: String,
    pub heap_usage: u64,
    pub budget_limit: u64,
    pub over_budget: bool,
    pub soft_warning: bool,
    pub usage_by_class: Vec<(String, usize)>,
    pub split_candidates: Vec<SplitCandidate>,
    /// Assembled output text. Present whenever the entry is within budget,
    /// and also when over budget unless `CompilerConfig::write_over_budget`
    /// is set to `false` (`spec.md §7`: over-budget is a warning by
    /// default, not a withheld-output failure).
    pub assembly: Option<String>,
}

/// Everything one orchestrator run produces: a result per entry point, plus
/// every collected diagnostic across every stage.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorReport {
    pub entries: Vec<EntryResult>,
    pub errors: Vec<CompileError>,
}

/// Compile every `@Entry` class found across `programs` into its own
/// [`EntryResult`].
pub fn compile(programs: &[Program], config: &CompilerConfig) -> OrchestratorReport {
    let mut report = OrchestratorReport::default();
    let mut registry = ClassRegistry::new();

    for program in programs {
        for dup in registry.add_program(program) {
            report.errors.push(CompileError::new(
                ErrorKind::TypeError,
                format!("duplicate class `{dup}` across source files"),
                program.file.clone(),
                0,
                0,
            ));
        }
    }

    report.errors.extend(InheritanceValidator::new(&registry).validate_all());
    if !report.errors.is_empty() {
        return report;
    }

    let graph = ClassReferenceGraph::build(&registry);
    let esr = ExternRegistry::new();

    let entry_classes: Vec<&ClassDecl> = registry
        .classes()
        .filter(|c| c.is_entry() && !config.is_excluded(&c.location.file))
        .collect();

    for entry in entry_classes {
        let span = tracing::info_span!("compile_entry", entry = %entry.name);
        let _guard = span.enter();
        match compile_entry(entry, &graph, programs, &esr, config) {
            Ok(result) => report.entries.push(result),
            Err(mut errors) => report.errors.append(&mut errors),
        }
    }

    report
}

/// Build the scoped `(registry, programs)` pair covering exactly
/// `{entry} ∪ R(entry)`: every reachable class's own file, so duplicate
/// top-level const detection and symbol resolution stay scoped to the
/// files that actually matter for this entry point (`spec.md §4.6` step 2).
fn scope_to_reachable(
    reachable: &HashSet<String>,
    all_programs: &[Program],
) -> (ClassRegistry, Vec<Program>) {
    let mut scoped_registry = ClassRegistry::new();
    let mut scoped_programs = Vec::new();

    for program in all_programs {
        let kept_classes: Vec<_> = program
            .classes
            .iter()
            .filter(|c| reachable.contains(&c.name))
            .cloned()
            .collect();
        if kept_classes.is_empty() {
            continue;
        }
        let mut scoped = Program::new(program.file.clone());
        scoped.classes = kept_classes;
        scoped.interfaces = program.interfaces.clone();
        scoped.consts = program.consts.clone();
        scoped_registry.add_program(&scoped);
        scoped_programs.push(scoped);
    }

    (scoped_registry, scoped_programs)
}

/// Drop any converted function whose containing class/method pair is never
/// called from the entry's own reachable call graph (`spec.md §6`'s "avoid
/// lowering dead methods"). Every constructor and every method declared
/// directly on the entry class is always kept: constructors always run,
/// and an entry class's own methods are the runtime's own event-handler
/// hooks, invoked by the host rather than by any visible call site.
fn prune_unused(
    mut converted: ConvertedProgram,
    entry: &ClassDecl,
    used: &HashSet<(String, String)>,
) -> ConvertedProgram {
    converted.functions.retain(|f| {
        let (class_name, member) = match f.name.split_once("::") {
            Some((c, m)) => (c, m),
            None => return true,
        };
        member == "ctor" || class_name == entry.name || used.contains(&(class_name.to_string(), member.to_string()))
    });
    converted
}

fn optimize_all(converted: &mut ConvertedProgram, config: &CompilerConfig) {
    if !config.optimize {
        return;
    }
    for function in &mut converted.functions {
        let fired = optimizer::optimize(function);
        if !fired.is_empty() {
            tracing::debug!(function = %function.name, passes = ?fired, "optimizer passes fired");
        }
    }
}

fn lower_entry(
    registry: &ClassRegistry,
    esr: &ExternRegistry,
    config: &CompilerConfig,
    converted: &ConvertedProgram,
    entry: &ClassDecl,
) -> Result<VmUnit, CompileError> {
    Lowerer::new(registry, esr, config).lower_program(converted, entry)
}

/// Re-lower a single reachable class in isolation, as if it were its own
/// entry point, purely to estimate its standalone heap cost for the
/// split-candidate report (`spec.md §4.6`). Never assembled to output.
fn estimate_standalone_heap(
    class: &ClassDecl,
    graph: &ClassReferenceGraph,
    all_programs: &[Program],
    esr: &ExternRegistry,
    config: &CompilerConfig,
) -> u64 {
    let mut reachable = graph.reachable_from(&class.name);
    reachable.insert(class.name.clone());
    let (scoped_registry, scoped_programs) = scope_to_reachable(&reachable, all_programs);
    let Some(scoped_class) = scoped_registry.get(&class.name) else {
        return 0;
    };
    let converted = match convert_all(&scoped_registry, &scoped_programs, esr, config) {
        Ok(c) => c,
        Err(_) => return 0,
    };
    match lower_entry(&scoped_registry, esr, config, &converted, scoped_class) {
        Ok(unit) => unit.heap_usage(),
        Err(_) => 0,
    }
}

fn compile_entry(
    entry: &ClassDecl,
    graph: &ClassReferenceGraph,
    all_programs: &[Program],
    esr: &ExternRegistry,
    config: &CompilerConfig,
) -> Result<EntryResult, Vec<CompileError>> {
    let mut reachable = graph.reachable_from(&entry.name);
    reachable.insert(entry.name.clone());

    let (scoped_registry, scoped_programs) = scope_to_reachable(&reachable, all_programs);
    let Some(scoped_entry) = scoped_registry.get(&entry.name) else {
        return Err(vec![CompileError::internal(format!(
            "entry class `{}` missing from its own scoped registry",
            entry.name
        ))]);
    };

    let mut converted = convert_all(&scoped_registry, &scoped_programs, esr, config)?;

    let used_methods = MethodUsageAnalyzer::new(&scoped_registry).used_methods(scoped_entry, &reachable);
    converted = prune_unused(converted, scoped_entry, &used_methods);

    optimize_all(&mut converted, config);

    let unit = lower_entry(&scoped_registry, esr, config, &converted, scoped_entry).map_err(|e| vec![e])?;

    let heap_usage = unit.heap_usage();
    let budget_limit = config.budget_mode.limit() as u64;
    let over_budget = heap_usage > budget_limit;
    let soft_warning = config
        .budget_mode
        .soft_warning_threshold()
        .is_some_and(|threshold| heap_usage > threshold as u64 && !over_budget);

    tracing::info!(
        entry = %entry.name,
        heap_usage,
        budget_limit,
        over_budget,
        "entry point lowered"
    );

    let split_candidates = if over_budget {
        let mut candidates: Vec<SplitCandidate> = reachable
            .iter()
            .filter(|name| *name != &entry.name)
            .filter_map(|name| scoped_registry.get(name))
            .map(|class| SplitCandidate {
                class_name: class.name.clone(),
                estimated_heap: estimate_standalone_heap(class, graph, all_programs, esr, config),
            })
            .collect();
        candidates.sort_by(|a, b| b.estimated_heap.cmp(&a.estimated_heap));
        candidates.truncate(MAX_SPLIT_CANDIDATES);
        candidates
    } else {
        Vec::new()
    };

    let assembly = if over_budget && !config.write_over_budget {
        None
    } else {
        Some(assembler::assemble(&unit, &entry.name, true))
    };

    Ok(EntryResult {
        entry_name: entry.name.clone(),
        heap_usage,
        budget_limit,
        over_budget,
        soft_warning,
        usage_by_class: unit.usage_by_class(),
        split_candidates,
        assembly,
    })
}
