use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::diagnostics::{DiagnosticCode, DiagnosticHandler, TracingDiagnosticHandler};
use crate::errors::{ConfigError, RegistryError, ResolveError};
use crate::loader::Loader;
use crate::parallel::JobId;
use crate::registry::{Definition, Factory, Registry};
use crate::resolver::Pass;
use crate::value::Names;

/// Values for each requested name, in request order
pub type RequireResult = Result<Vec<Value>, ResolveError>;

type Callback = Box<dyn FnOnce(&mut Fallback, RequireResult)>;

/// Handle for a `require` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

struct PendingRequest {
    names: Vec<String>,
    callback: Callback,
    /// Fetch batches started on behalf of this request
    batches: Vec<JobId>,
}

/// The module loader: registry, resolver, loader and invoker behind one handle.
///
/// Single-threaded and cooperative. Every operation runs to completion; the
/// only suspension point is a queued fetch waiting for [`Fallback::complete`].
pub struct Fallback {
    pub(crate) config: Config,
    pub(crate) registry: Registry,
    pub(crate) loader: Loader,
    diagnostics: Arc<dyn DiagnosticHandler>,
    /// Unsettled requests in arrival order
    pending: IndexMap<RequestId, PendingRequest>,
    next_request: u64,
    /// Set while requests are being settled; nested calls defer to the outer loop
    pub(crate) settling: bool,
}

impl Fallback {
    /// Create a loader reporting diagnostics through `tracing`
    pub fn new(config: Config) -> Self {
        Self::with_dependencies(config, Arc::new(TracingDiagnosticHandler::new()))
    }

    /// Create a loader with a custom diagnostic handler (for testing)
    pub fn with_dependencies(config: Config, diagnostics: Arc<dyn DiagnosticHandler>) -> Self {
        Self {
            config,
            registry: Registry::new(),
            loader: Loader::default(),
            diagnostics,
            pending: IndexMap::new(),
            next_request: 0,
            settling: false,
        }
    }

    /// Get the configuration
    pub fn configuration(&self) -> &Config {
        &self.config
    }

    /// Get the diagnostic handler
    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticHandler> {
        &self.diagnostics
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Merge runtime options; unknown keys and mistyped values are discarded
    /// with a warning.
    pub fn config(&mut self, options: &Value) -> &Config {
        for rejected in self.config.apply(options) {
            let code = match rejected {
                ConfigError::Rejected { .. } => DiagnosticCode::ConfigRejected,
                _ => DiagnosticCode::InvalidValue,
            };
            self.warn(code, &rejected.to_string());
        }

        &self.config
    }

    /// Register a module.
    ///
    /// Invalid names and redefinitions of invoked modules are warned about and
    /// ignored. Requests waiting on `name` resume.
    pub fn define(&mut self, name: &str, factory: Factory, dependencies: &[&str]) {
        let name = name.trim();
        let dependencies = self.normalize_dependencies(name, dependencies);

        match self.registry.define(name, factory, dependencies) {
            Ok(()) => {
                if self.config.debug {
                    debug!(module = name, "defined");
                }
                self.settle();
            }
            Err(err) => self.warn(registry_code(&err), &err.to_string()),
        }
    }

    fn normalize_dependencies(&self, name: &str, dependencies: &[&str]) -> Vec<String> {
        let mut normalized = Vec::with_capacity(dependencies.len());

        for dependency in dependencies {
            let dependency = dependency.trim();
            if dependency.is_empty() {
                self.warn(
                    DiagnosticCode::InvalidName,
                    &format!("dropping an empty dependency name from `{name}`"),
                );
            } else {
                normalized.push(dependency.to_string());
            }
        }

        normalized
    }

    pub fn lookup(&self, name: &str) -> Option<&Definition> {
        self.registry.lookup(name)
    }

    /// Bind `alias` to the module `name`; collisions are warned about and skipped
    pub fn alias(&mut self, name: &str, alias: &str) {
        if let Err(err) = self.registry.alias(name, alias) {
            self.warn(registry_code(&err), &err.to_string());
        }
    }

    /// Resolve `names` and call `callback` exactly once with their values or
    /// the first failure.
    ///
    /// The callback runs synchronously when everything is already available,
    /// otherwise once the fetches it waits on have settled.
    pub fn require(
        &mut self,
        names: impl Into<Names>,
        callback: impl FnOnce(&mut Fallback, RequireResult) + 'static,
    ) -> RequestId {
        let (names, dropped) = names.into().normalize();
        if dropped > 0 {
            self.warn(
                DiagnosticCode::InvalidName,
                &format!("dropped {dropped} invalid module name(s) from `require`"),
            );
        }

        let id = RequestId(self.next_request);
        self.next_request += 1;

        if self.config.debug {
            debug!(request = %id, names = ?names, "require");
        }

        self.pending.insert(
            id,
            PendingRequest {
                names,
                callback: Box::new(callback),
                batches: Vec::new(),
            },
        );
        self.settle();

        id
    }

    /// Fail a pending request with [`ResolveError::Cancelled`].
    ///
    /// In-flight fetches keep going; their modules still register for other
    /// requests. Returns `false` if the request already settled.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        let Some(request) = self.pending.shift_remove(&id) else {
            return false;
        };

        for job in &request.batches {
            self.loader.cancel(*job);
        }
        (request.callback)(self, Err(ResolveError::Cancelled));

        true
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Re-run resolution for every pending request until no callback fires
    pub(crate) fn settle(&mut self) {
        if self.settling {
            return;
        }
        self.settling = true;

        loop {
            let mut progressed = false;
            let ids: Vec<RequestId> = self.pending.keys().copied().collect();

            for id in ids {
                let Some(names) = self.pending.get(&id).map(|request| request.names.clone()) else {
                    // cancelled by an earlier callback
                    continue;
                };

                let mut pass = Pass::default();
                let outcome = self.resolve_all(&names, &mut pass);

                if !pass.fetches.is_empty() {
                    let job = self.loader.dispatch(pass.fetches, self.config.debug);
                    if let Some(request) = self.pending.get_mut(&id) {
                        request.batches.push(job);
                    }
                }

                if let Some(result) = outcome {
                    if let Some(request) = self.pending.shift_remove(&id) {
                        if self.config.debug {
                            debug!(request = %id, ok = result.is_ok(), "request settled");
                        }
                        (request.callback)(self, result);
                        progressed = true;
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        self.settling = false;
    }

    pub(crate) fn warn(&self, code: DiagnosticCode, message: &str) {
        self.diagnostics.warning(code, message);
    }
}

impl Default for Fallback {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("pending", &self.pending.len())
            .finish()
    }
}

fn registry_code(err: &RegistryError) -> DiagnosticCode {
    match err {
        RegistryError::InvalidName => DiagnosticCode::InvalidName,
        RegistryError::AlreadyInvoked { .. } => DiagnosticCode::Redefinition,
        RegistryError::AliasCollision { .. } => DiagnosticCode::AliasCollision,
        RegistryError::UnknownModule { .. } => DiagnosticCode::UnknownModule,
    }
}
