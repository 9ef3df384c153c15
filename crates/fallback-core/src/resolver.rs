//! Depth-first dependency resolution.
//!
//! A resolution pass walks a request's names through the registry: invoked
//! modules yield their memoized value, defined modules resolve their
//! dependencies first and are then invoked, and unknown modules are handed to
//! the loader. Passes are re-run whenever a fetch settles or a module is
//! defined, until every name is ready or one fails.

use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::debug;

use crate::errors::ResolveError;
use crate::fallback::{Fallback, RequireResult};
use crate::invoker;
use crate::loader::FetchRequest;
use crate::registry::LoadState;

/// State of one resolution pass over one request
#[derive(Debug, Default)]
pub(crate) struct Pass {
    /// Modules currently being resolved, outermost first
    path: Vec<String>,
    /// Members of `path`, for constant-time cycle checks
    on_path: FxHashSet<String>,
    /// Modules already known to be waiting on a fetch during this pass
    waiting: FxHashSet<String>,
    /// Fetches started by this pass
    pub(crate) fetches: Vec<FetchRequest>,
}

impl Pass {
    fn enter(&mut self, name: &str) {
        self.path.push(name.to_string());
        self.on_path.insert(name.to_string());
    }

    fn leave(&mut self) {
        if let Some(name) = self.path.pop() {
            self.on_path.remove(&name);
        }
    }

    fn unwind(&mut self, depth: usize) {
        while self.path.len() > depth {
            self.leave();
        }
    }

    fn cycle_through(&self, name: &str) -> Option<Vec<String>> {
        if !self.on_path.contains(name) {
            return None;
        }
        let start = self.path.iter().position(|entry| entry == name)?;
        let mut cycle = self.path[start..].to_vec();
        cycle.push(name.to_string());
        Some(cycle)
    }
}

#[derive(Debug)]
enum Resolution {
    Ready(Value),
    Waiting,
    Failed(ResolveError),
}

impl From<Result<Value, ResolveError>> for Resolution {
    fn from(result: Result<Value, ResolveError>) -> Self {
        match result {
            Ok(value) => Resolution::Ready(value),
            Err(err) => Resolution::Failed(err),
        }
    }
}

/// A defined module whose dependencies are being resolved
#[derive(Debug)]
struct Frame {
    name: String,
    dependencies: Vec<String>,
    next: usize,
    arguments: Vec<Value>,
    waiting: bool,
}

impl Frame {
    fn new(name: String, dependencies: Vec<String>) -> Self {
        let arguments = Vec::with_capacity(dependencies.len());
        Self {
            name,
            dependencies,
            next: 0,
            arguments,
            waiting: false,
        }
    }

    fn next_dependency(&mut self) -> Option<String> {
        let dependency = self.dependencies.get(self.next).cloned()?;
        self.next += 1;
        Some(dependency)
    }

    /// Record the resolution of the dependency last handed out
    fn accept(&mut self, resolution: Resolution) -> Result<(), ResolveError> {
        match resolution {
            Resolution::Ready(value) => self.arguments.push(value),
            Resolution::Waiting => self.waiting = true,
            Resolution::Failed(err) => return Err(err),
        }
        Ok(())
    }
}

enum Visit {
    Done(Resolution),
    Enter(Frame),
}

impl Fallback {
    /// Resolve `names` in order.
    ///
    /// Returns `None` while any name waits on a fetch, otherwise the values
    /// in `names` order or the first failure.
    pub(crate) fn resolve_all(&mut self, names: &[String], pass: &mut Pass) -> Option<RequireResult> {
        let mut values = Vec::with_capacity(names.len());
        let mut waiting = false;

        for name in names {
            match self.resolve(name, pass) {
                Resolution::Ready(value) => values.push(value),
                Resolution::Waiting => waiting = true,
                Resolution::Failed(err) => return Some(Err(err)),
            }
        }

        if waiting {
            None
        } else {
            Some(Ok(values))
        }
    }

    /// Walk the dependency graph below `name` depth-first.
    ///
    /// Frames live on an explicit stack so graph depth never grows the call
    /// stack. `pass.path` mirrors the frames for cycle detection.
    fn resolve(&mut self, name: &str, pass: &mut Pass) -> Resolution {
        let base = pass.path.len();
        let mut parents: Vec<Frame> = Vec::new();

        let mut frame = match self.visit(name, pass) {
            Visit::Done(resolution) => return resolution,
            Visit::Enter(frame) => frame,
        };
        pass.enter(&frame.name);

        loop {
            if let Some(dependency) = frame.next_dependency() {
                match self.visit(&dependency, pass) {
                    Visit::Done(resolution) => {
                        if let Err(err) = frame.accept(resolution) {
                            pass.unwind(base);
                            return Resolution::Failed(err);
                        }
                    }
                    Visit::Enter(child) => {
                        pass.enter(&child.name);
                        parents.push(std::mem::replace(&mut frame, child));
                    }
                }
                continue;
            }

            pass.leave();
            let resolution = self.finish(frame, pass);

            match parents.pop() {
                None => return resolution,
                Some(parent) => {
                    frame = parent;
                    if let Err(err) = frame.accept(resolution) {
                        pass.unwind(base);
                        return Resolution::Failed(err);
                    }
                }
            }
        }
    }

    fn visit(&mut self, name: &str, pass: &mut Pass) -> Visit {
        let name = self.registry.canonical_name(name).to_string();

        if let Some(cycle) = pass.cycle_through(&name) {
            return Visit::Done(Resolution::Failed(ResolveError::CyclicDependency { cycle }));
        }

        if pass.waiting.contains(&name) {
            return Visit::Done(Resolution::Waiting);
        }

        let visit = match self.registry.lookup(&name) {
            Some(definition) => match invoker::memoized(definition) {
                Some(outcome) => Some(Visit::Done(outcome.into())),
                None if definition.is_defined() => Some(Visit::Enter(Frame::new(
                    name.clone(),
                    definition.dependencies().to_vec(),
                ))),
                None => None,
            },
            None => None,
        };

        match visit {
            Some(visit) => visit,
            None => Visit::Done(self.await_load(name, pass)),
        }
    }

    /// Invoke a frame's factory once all of its dependencies are ready
    fn finish(&mut self, frame: Frame, pass: &mut Pass) -> Resolution {
        let Frame {
            name,
            dependencies,
            arguments,
            waiting,
            ..
        } = frame;

        if waiting {
            pass.waiting.insert(name);
            return Resolution::Waiting;
        }

        if self.config.debug {
            debug!(module = %name, dependencies = ?dependencies, "invoking factory");
        }

        match self.registry.lookup_mut(&name) {
            Some(definition) => invoker::invoke(definition, &arguments).into(),
            None => Resolution::Failed(ResolveError::UnresolvedDependency { name, cause: None }),
        }
    }

    fn await_load(&mut self, name: String, pass: &mut Pass) -> Resolution {
        if let Some(request) = self.begin_load(&name) {
            pass.fetches.push(request);
            pass.waiting.insert(name);
            return Resolution::Waiting;
        }

        // begin_load leaves a placeholder behind, so the lookup always succeeds
        let Some(definition) = self.registry.lookup(&name) else {
            return Resolution::Failed(ResolveError::UnresolvedDependency { name, cause: None });
        };

        match definition.loader.state {
            LoadState::Unloaded | LoadState::Loading => {
                pass.waiting.insert(name);
                Resolution::Waiting
            }
            LoadState::Loaded | LoadState::Failed => {
                let cause = definition.loader.failed.last().cloned();
                if self.config.debug {
                    debug!(module = %name, "load settled without a definition");
                }
                Resolution::Failed(ResolveError::UnresolvedDependency { name, cause })
            }
        }
    }
}
