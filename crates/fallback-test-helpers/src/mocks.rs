//! Mock implementations for testing

use fallback_core::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticHandler};
use fallback_core::{script, Factory, Fallback, FetchRequest, Fetcher, LoadError, RequireResult, Script};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// A mock diagnostic handler that collects diagnostics
#[derive(Debug, Default)]
pub struct MockDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MockDiagnosticHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn codes(&self) -> Vec<DiagnosticCode> {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.code)
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }
}

impl DiagnosticHandler for MockDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().unwrap().push(diagnostic);
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }
}

#[derive(Clone)]
enum Resource {
    /// Script that defines `name` with `factory`
    Module {
        name: String,
        factory: Factory,
        dependencies: Vec<String>,
    },
    /// Script that runs but defines nothing
    Empty,
    Fail(String),
}

/// Scripted fetch backend.
///
/// Names without a scripted resource fail like a 404.
#[derive(Default)]
pub struct MockFetcher {
    resources: FxHashMap<String, Resource>,
    log: Vec<FetchRequest>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a value module
    pub fn module(self, name: &str, dependencies: &[&str], value: impl Into<Value>) -> Self {
        self.factory(name, dependencies, Factory::value(value))
    }

    /// Serve a function module
    pub fn function(
        self,
        name: &str,
        dependencies: &[&str],
        factory: impl Fn(&[Value]) -> anyhow::Result<Value> + 'static,
    ) -> Self {
        self.factory(name, dependencies, Factory::function(factory))
    }

    pub fn factory(self, name: &str, dependencies: &[&str], factory: Factory) -> Self {
        self.serving(name, name, dependencies, factory)
    }

    /// Serve a script for `requested` that defines `defined` instead
    pub fn serving(
        mut self,
        requested: &str,
        defined: &str,
        dependencies: &[&str],
        factory: Factory,
    ) -> Self {
        self.resources.insert(
            requested.to_string(),
            Resource::Module {
                name: defined.to_string(),
                factory,
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            },
        );
        self
    }

    /// Serve a script that defines nothing
    pub fn empty(mut self, name: &str) -> Self {
        self.resources.insert(name.to_string(), Resource::Empty);
        self
    }

    /// Fail fetches of `name` with `message`
    pub fn fail(mut self, name: &str, message: &str) -> Self {
        self.resources
            .insert(name.to_string(), Resource::Fail(message.to_string()));
        self
    }

    /// Every request fetched so far, in fetch order
    pub fn log(&self) -> &[FetchRequest] {
        &self.log
    }

    /// Names fetched so far, in fetch order
    pub fn fetched(&self) -> Vec<&str> {
        self.log.iter().map(|request| request.name.as_str()).collect()
    }

    pub fn fetch_count(&self, name: &str) -> usize {
        self.log.iter().filter(|request| request.name == name).count()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&mut self, request: &FetchRequest) -> Result<Script, LoadError> {
        self.log.push(request.clone());

        match self.resources.get(&request.name).cloned() {
            Some(Resource::Module {
                name,
                factory,
                dependencies,
            }) => Ok(script(move |fallback: &mut Fallback| {
                let dependencies: Vec<&str> = dependencies.iter().map(String::as_str).collect();
                fallback.define(&name, factory, &dependencies);
            })),
            Some(Resource::Empty) => Ok(script(|_| {})),
            Some(Resource::Fail(message)) => Err(LoadError::new(&request.url, message)),
            None => Err(LoadError::new(&request.url, "404 Not Found")),
        }
    }
}

/// Records every result passed to the callbacks it hands out
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    results: Rc<RefCell<Vec<RequireResult>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl FnOnce(&mut Fallback, RequireResult) + 'static {
        let results = Rc::clone(&self.results);
        move |_: &mut Fallback, result| results.borrow_mut().push(result)
    }

    pub fn calls(&self) -> usize {
        self.results.borrow().len()
    }

    pub fn results(&self) -> Vec<RequireResult> {
        self.results.borrow().clone()
    }

    pub fn last(&self) -> Option<RequireResult> {
        self.results.borrow().last().cloned()
    }
}
