pub mod autoload;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod fallback;
pub mod invoker;
pub mod loader;
pub mod namespace;
pub mod parallel;
pub mod registry;
mod resolver;
pub mod stats;
pub mod value;

pub use autoload::ScriptElement;
pub use config::Config;
pub use diagnostics::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticCode, DiagnosticHandler,
    TracingDiagnosticHandler,
};
pub use errors::{ConfigError, LoadError, RegistryError, ResolveError};
pub use fallback::{Fallback, RequestId, RequireResult};
pub use loader::{script, url_for, BatchStats, FetchRequest, Fetcher, Script};
pub use namespace::{BindReport, Binding, Namespace, Surface};
pub use parallel::{Completion, JobId, ParallelQueue};
pub use registry::{Definition, Factory, LoadState, LoaderRecord, Registry};
pub use stats::{ModuleStats, Report};
pub use value::{Names, ValueKind};
