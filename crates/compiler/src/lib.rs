//! Compiler library for the decorated-class source language this crate
//! targets: parses `@Entry`-decorated class files, lowers each reachable
//! entry point through three-address code and a fixed-point optimizer, and
//! assembles typed stack-VM assembly text subject to a per-entry-point heap
//! budget.
//!
//! # Extending the compiler
//!
//! Embedders can widen the extern resolution table or relax defaults via
//! [`CompilerConfig`]:
//!
//! ```rust,ignore
//! use uasmc::config::{CompilerConfig, ExternOverride};
//! use uasmc::orchestrator;
//!
//! let config = CompilerConfig::new()
//!     .with_extern_override(ExternOverride::new("MyType", "DoThing", "MyHost.__DoThing____SystemVoid"));
//!
//! let report = orchestrator::compile(&programs, &config);
//! ```

pub mod ast;
pub mod ast_to_tac;
pub mod assembler;
pub mod call_graph;
pub mod config;
pub mod error;
pub mod esr;
pub mod inheritance;
pub mod lexer;
pub mod lowerer;
pub mod method_usage;
pub mod optimizer;
pub mod orchestrator;
pub mod parser;
pub mod registry;
pub mod static_externs;
pub mod tac;
pub mod tmr;
pub mod types;
pub mod vm;

pub use ast::Program;
pub use config::CompilerConfig;
pub use error::{CompileError, ErrorCollector, ErrorKind};
pub use orchestrator::{compile, EntryResult, OrchestratorReport, SplitCandidate};
pub use parser::parse_source;

use std::fs;
use std::path::Path;

/// Parse every `.uc` source file at `paths`, failing on the first unreadable
/// file or parse error (the orchestrator itself aggregates semantic errors
/// across the whole set once parsing succeeds).
pub fn parse_files(paths: &[impl AsRef<Path>]) -> Result<Vec<Program>, CompileError> {
    let mut programs = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            CompileError::internal(format!("failed to read `{}`: {e}", path.display()))
        })?;
        programs.push(parse_source(&source, path)?);
    }
    Ok(programs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_files_reads_and_parses_each_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "@Entry class MyBehaviour : UdonSharpBehaviour {{ public void Start() {{ }} }}"
        )
        .unwrap();
        let programs = parse_files(&[file.path()]).unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].classes.len(), 1);
        assert_eq!(programs[0].classes[0].name, "MyBehaviour");
    }

    #[test]
    fn parse_files_reports_missing_file() {
        let result = parse_files(&["/nonexistent/path/Does.uc"]);
        assert!(result.is_err());
    }
}
