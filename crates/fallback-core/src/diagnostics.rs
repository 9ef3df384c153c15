use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// What a diagnostic is about. Every code is recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// Empty or non-string module name passed to `define`/`require`
    InvalidName,
    /// `define` on a module whose factory already ran
    Redefinition,
    /// Alias or global name already bound elsewhere
    AliasCollision,
    /// Alias target is not a registered module
    UnknownModule,
    /// Unknown key passed to `config`
    ConfigRejected,
    /// Known `config` key with a value of the wrong type
    InvalidValue,
    /// Fetch completion for a module that was not loading
    UnexpectedCompletion,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::InvalidName => "invalid-name",
            DiagnosticCode::Redefinition => "redefinition",
            DiagnosticCode::AliasCollision => "alias-collision",
            DiagnosticCode::UnknownModule => "unknown-module",
            DiagnosticCode::ConfigRejected => "config-rejected",
            DiagnosticCode::InvalidValue => "invalid-value",
            DiagnosticCode::UnexpectedCompletion => "unexpected-completion",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovered problem: the offending call was skipped or adjusted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Trait for handling diagnostics
/// This allows for dependency injection and testing with mock handlers
pub trait DiagnosticHandler: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    fn warning(&self, code: DiagnosticCode, message: &str) {
        self.report(Diagnostic::warning(code, message));
    }

    fn warning_count(&self) -> usize {
        self.get_diagnostics().len()
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic>;
}

fn lock(diagnostics: &Mutex<Vec<Diagnostic>>) -> MutexGuard<'_, Vec<Diagnostic>> {
    diagnostics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Forwards diagnostics to `tracing` and keeps them for later inspection
#[derive(Debug, Default)]
pub struct TracingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl TracingDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticHandler for TracingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(code = %diagnostic.code, "{}", diagnostic.message);
        lock(&self.diagnostics).push(diagnostic);
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        lock(&self.diagnostics).clone()
    }
}

/// Collecting diagnostic handler for testing
/// Collects all diagnostics without logging
#[derive(Debug, Default)]
pub struct CollectingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codes of every collected diagnostic, in report order
    pub fn codes(&self) -> Vec<DiagnosticCode> {
        lock(&self.diagnostics).iter().map(|d| d.code).collect()
    }
}

impl DiagnosticHandler for CollectingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        lock(&self.diagnostics).push(diagnostic);
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        lock(&self.diagnostics).clone()
    }
}
