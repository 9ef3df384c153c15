use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use web_time::Instant;

use crate::errors::LoadError;
use crate::value::ValueKind;

type FactoryFn = dyn Fn(&[Value]) -> anyhow::Result<Value>;

/// How a module produces its value
#[derive(Clone)]
pub enum Factory {
    /// Called once with the dependency values in declared order
    Function(Rc<FactoryFn>),
    /// A plain value; the module resolves to it unchanged
    Value(Value),
}

impl Factory {
    pub fn function(factory: impl Fn(&[Value]) -> anyhow::Result<Value> + 'static) -> Self {
        Factory::Function(Rc::new(factory))
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Factory::Value(value.into())
    }

    /// "function" or the kind of the wrapped value
    pub fn kind(&self) -> &'static str {
        match self {
            Factory::Function(_) => "function",
            Factory::Value(value) => ValueKind::of(value).as_str(),
        }
    }

    /// True when both are the same function or equal values
    pub fn same_as(&self, other: &Factory) -> bool {
        match (self, other) {
            (Factory::Function(a), Factory::Function(b)) => Rc::ptr_eq(a, b),
            (Factory::Value(a), Factory::Value(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Value> for Factory {
    fn from(value: Value) -> Self {
        Factory::Value(value)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Function(_) => f.write_str("Factory::Function(..)"),
            Factory::Value(value) => f.debug_tuple("Factory::Value").field(value).finish(),
        }
    }
}

/// Per-module fetch state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Loader bookkeeping kept on every definition
#[derive(Debug, Clone, Default)]
pub struct LoaderRecord {
    pub(crate) state: LoadState,
    pub(crate) failed: Vec<LoadError>,
    time_start: Option<Instant>,
    time_end: Option<Instant>,
}

impl LoaderRecord {
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Every failed fetch attempt, oldest first
    pub fn failed(&self) -> &[LoadError] {
        &self.failed
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// A fetch settled, successfully or not
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded | LoadState::Failed)
    }

    /// `None` until a fetch settles
    pub fn success(&self) -> Option<bool> {
        match self.state {
            LoadState::Loaded => Some(true),
            LoadState::Failed => Some(false),
            LoadState::Unloaded | LoadState::Loading => None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        Some(self.time_end?.duration_since(self.time_start?))
    }

    pub(crate) fn begin(&mut self) {
        self.state = LoadState::Loading;
        self.time_start = Some(Instant::now());
    }

    pub(crate) fn finish(&mut self, outcome: Result<(), LoadError>) {
        self.time_end = Some(Instant::now());
        self.state = match outcome {
            Ok(()) => LoadState::Loaded,
            Err(err) => {
                self.failed.push(err);
                LoadState::Failed
            }
        };
    }

    /// Mark as loaded without a fetch (internal modules)
    pub(crate) fn preloaded(&mut self) {
        self.state = LoadState::Loaded;
    }
}

/// Registry record backing one module
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    factory: Option<Factory>,
    dependencies: Vec<String>,
    invoked: bool,
    value: Option<Value>,
    error: Option<String>,
    internal: bool,
    pub(crate) loader: LoaderRecord,
}

impl Definition {
    pub(crate) fn new(name: String, factory: Factory, dependencies: Vec<String>) -> Self {
        Self {
            factory: Some(factory),
            dependencies,
            ..Self::placeholder(name)
        }
    }

    /// A record created by a load attempt, before any `define`
    pub(crate) fn placeholder(name: String) -> Self {
        Self {
            name,
            factory: None,
            dependencies: Vec::new(),
            invoked: false,
            value: None,
            error: None,
            internal: false,
            loader: LoaderRecord::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn loader(&self) -> &LoaderRecord {
        &self.loader
    }

    pub fn factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// A factory has been registered (placeholders are not defined)
    pub fn is_defined(&self) -> bool {
        self.factory.is_some()
    }

    pub fn invoked(&self) -> bool {
        self.invoked
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Memoized factory failure
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Library-surface module (`require`, `define`, ...)
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Factory kind for reports; placeholders are "undefined"
    pub fn kind(&self) -> &'static str {
        self.factory.as_ref().map_or("undefined", Factory::kind)
    }

    pub(crate) fn redefine(&mut self, factory: Factory, dependencies: Vec<String>) {
        self.factory = Some(factory);
        self.dependencies = dependencies;
    }

    pub(crate) fn memoize(&mut self, outcome: Result<Value, String>) {
        self.invoked = true;
        match outcome {
            Ok(value) => self.value = Some(value),
            Err(message) => self.error = Some(message),
        }
    }

    pub(crate) fn mark_internal(&mut self) {
        self.internal = true;
        self.loader.preloaded();
    }
}
