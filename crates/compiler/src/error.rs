//! Compiler error types and the error-collection sink.
//!
//! Parser and semantic errors accumulate into an [`ErrorCollector`] rather
//! than aborting immediately (`spec.md §5` / `§7`); the orchestrator drains
//! the collector between pipeline stages and raises an aggregate
//! [`CompileError::Aggregate`] if anything was collected before any output
//! is written. Internal invariant violations (e.g. a missing extern
//! signature at lowering) are the one case modeled as an immediate `Err`
//! rather than a collected diagnostic, per `spec.md §9`.

use std::fmt;
use std::path::PathBuf;

/// The four error kinds named in `spec.md §7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The AST contains a construct the converter cannot lower.
    UnsupportedSyntax,
    /// A construct is recognized but disabled.
    UnsupportedFeature,
    /// Includes duplicate top-level const, incompatible overrides, missing
    /// base class.
    TypeError,
    /// An invariant was violated inside a pass (e.g. missing extern
    /// signature at lowering).
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::UnsupportedSyntax => "unsupported syntax",
            ErrorKind::UnsupportedFeature => "unsupported feature",
            ErrorKind::TypeError => "type error",
            ErrorKind::InternalError => "internal error",
        };
        write!(f, "{s}")
    }
}

/// A single compiler diagnostic: file, line, column, an optional suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub suggestion: Option<String>,
}

impl CompileError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
    ) -> Self {
        CompileError {
            kind,
            message: message.into(),
            file: file.into(),
            line,
            column,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::new(ErrorKind::InternalError, message, PathBuf::new(), 0, 0)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file.display(),
            self.line + 1,
            self.column + 1,
            self.kind,
            self.message
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (suggestion: {suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// An accumulating sink for recoverable errors (teacher idiom: the
/// accumulate-then-report shape of `resolver::check_collisions`, made into
/// an explicit struct per `spec.md §9`'s "model the collector as an
/// explicit sink" note).
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<CompileError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        ErrorCollector::default()
    }

    pub fn push(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Drain the collector, returning `Err` with everything collected so
    /// far if non-empty, or `Ok(())` otherwise. Called at stage boundaries.
    pub fn into_result(self) -> Result<(), CompileError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CompileError::aggregate(self.errors))
        }
    }
}

impl CompileError {
    /// Wrap multiple collected errors into a single aggregate error, as
    /// raised by the orchestrator when the `ErrorCollector` is non-empty.
    pub fn aggregate(errors: Vec<CompileError>) -> CompileError {
        let message = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        CompileError {
            kind: ErrorKind::TypeError,
            message: format!("{} error(s):\n{}", errors.len(), message),
            file: PathBuf::new(),
            line: 0,
            column: 0,
            suggestion: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position_and_kind() {
        let e = CompileError::new(ErrorKind::TypeError, "duplicate const FOO", "a.uc", 4, 0);
        let s = e.to_string();
        assert!(s.contains("a.uc:5:1"));
        assert!(s.contains("type error"));
        assert!(s.contains("duplicate const FOO"));
    }

    #[test]
    fn collector_accumulates_and_reports() {
        let mut collector = ErrorCollector::new();
        assert!(!collector.has_errors());
        collector.push(CompileError::new(ErrorKind::UnsupportedSyntax, "oops", "a.uc", 0, 0));
        collector.push(CompileError::new(ErrorKind::TypeError, "oops2", "b.uc", 1, 0));
        assert_eq!(collector.len(), 2);
        let result = collector.into_result();
        assert!(result.is_err());
        let agg = result.unwrap_err();
        assert!(agg.message.contains("2 error(s)"));
        assert!(agg.message.contains("oops"));
        assert!(agg.message.contains("oops2"));
    }

    #[test]
    fn empty_collector_reports_ok() {
        let collector = ErrorCollector::new();
        assert!(collector.into_result().is_ok());
    }
}
