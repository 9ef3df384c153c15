//! Script fetching.
//!
//! The engine never performs IO. Fetches are queued as [`FetchRequest`]s,
//! a host drains them with [`Fallback::take_fetches`], and reports back with
//! [`Fallback::complete`]. The fetched [`Script`] runs inside `complete` and
//! is expected to `define` the module it was fetched for.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::diagnostics::DiagnosticCode;
use crate::errors::LoadError;
use crate::fallback::Fallback;
use crate::parallel::{Completion, JobId, ParallelQueue};
use crate::registry::LoadState;

/// A fetched resource, run against the engine once the fetch succeeds
pub type Script = Box<dyn FnOnce(&mut Fallback)>;

/// Box a closure as a [`Script`]
pub fn script(run: impl FnOnce(&mut Fallback) + 'static) -> Script {
    Box::new(run)
}

/// One outstanding fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    /// Module the fetched script should define
    pub name: String,
    pub url: String,
}

impl FetchRequest {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Synchronous fetch backend used by [`Fallback::run_until_stalled`]
pub trait Fetcher {
    fn fetch(&mut self, request: &FetchRequest) -> Result<Script, LoadError>;
}

/// URL for a module name.
///
/// Names that already look like URLs (`scheme://`, `/path`, `*.js`) are
/// fetched as is; anything else becomes `{base}{name}.js`.
pub fn url_for(name: &str, base_prefix: &str) -> String {
    if name.contains("://") || name.starts_with('/') || name.ends_with(".js") {
        name.to_string()
    } else {
        format!("{base_prefix}{name}.js")
    }
}

/// Outcome counters for fetch batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub started: usize,
    pub succeeded: usize,
    /// Batches with a failed fetch, or cancelled before settling
    pub unsuccessful: usize,
}

impl BatchStats {
    pub fn in_flight(&self) -> usize {
        self.started - self.succeeded - self.unsuccessful
    }
}

/// Fetch queue plus per-batch join tracking
#[derive(Debug, Default)]
pub(crate) struct Loader {
    queue: VecDeque<FetchRequest>,
    batches: ParallelQueue,
    /// module name -> completion token of the batch that fetches it
    completions: FxHashMap<String, Completion>,
    stats: Rc<RefCell<BatchStats>>,
}

impl Loader {
    /// Queue a single fetch outside any batch
    pub(crate) fn enqueue(&mut self, request: FetchRequest) {
        self.queue.push_back(request);
    }

    /// Queue fetches started together and join them as one batch
    pub(crate) fn dispatch(&mut self, requests: Vec<FetchRequest>, verbose: bool) -> JobId {
        let size = requests.len();
        let stats = Rc::clone(&self.stats);
        stats.borrow_mut().started += 1;

        let (job, completions) = self.batches.start(size, move |succeeded| {
            let mut stats = stats.borrow_mut();
            if succeeded {
                stats.succeeded += 1;
            } else {
                stats.unsuccessful += 1;
            }
            if verbose {
                debug!(size, succeeded, "fetch batch settled");
            }
        });

        for (request, completion) in requests.into_iter().zip(completions) {
            self.completions.insert(request.name.clone(), completion);
            self.queue.push_back(request);
        }

        job
    }

    pub(crate) fn take(&mut self) -> Vec<FetchRequest> {
        self.queue.drain(..).collect()
    }

    /// Fire the batch completion for `name`, if it belongs to a batch
    pub(crate) fn settle(&mut self, name: &str, succeeded: bool) {
        if let Some(completion) = self.completions.remove(name) {
            if succeeded {
                completion.complete();
            } else {
                completion.fail();
            }
        }
    }

    pub(crate) fn cancel(&mut self, job: JobId) -> bool {
        self.batches.cancel(job)
    }

    pub(crate) fn stats(&self) -> BatchStats {
        *self.stats.borrow()
    }
}

impl Fallback {
    /// Start fetching `name` unless it is defined or a fetch already started.
    ///
    /// Returns `true` when a fetch was queued.
    pub fn load(&mut self, name: &str) -> bool {
        let name = self.registry.canonical_name(name).to_string();
        if name.is_empty() {
            self.warn(DiagnosticCode::InvalidName, "cannot load an empty module name");
            return false;
        }

        match self.begin_load(&name) {
            Some(request) => {
                self.loader.enqueue(request);
                true
            }
            None => false,
        }
    }

    /// Move `name` to `Loading` and build its fetch, if it is still unloaded
    pub(crate) fn begin_load(&mut self, name: &str) -> Option<FetchRequest> {
        let url = url_for(name, &self.config.base_prefix());
        let definition = self.registry.placeholder(name);
        if definition.is_defined() || definition.loader.state != LoadState::Unloaded {
            return None;
        }

        definition.loader.begin();
        if self.config.debug {
            debug!(module = name, url = %url, "fetch started");
        }
        Some(FetchRequest::new(name, url))
    }

    /// Drain queued fetches for the host to perform
    pub fn take_fetches(&mut self) -> Vec<FetchRequest> {
        self.loader.take()
    }

    /// Report the outcome of a fetch started for `name`.
    ///
    /// On success the script runs first, then the load settles, then waiting
    /// requests resume. Completions for modules that are not loading are
    /// ignored with a warning.
    pub fn complete(&mut self, name: &str, outcome: Result<Script, LoadError>) {
        let loading = self
            .registry
            .lookup(name)
            .is_some_and(|definition| definition.loader.is_loading());
        if !loading {
            self.warn(
                DiagnosticCode::UnexpectedCompletion,
                &format!("ignoring a fetch completion for `{name}`, which is not loading"),
            );
            return;
        }

        let outcome = match outcome {
            Ok(script) => {
                // definitions made by the script are resolved after the load settles
                let outer = std::mem::replace(&mut self.settling, true);
                script(self);
                self.settling = outer;
                Ok(())
            }
            Err(err) => {
                warn!(module = name, error = %err, "script failed to load");
                Err(err)
            }
        };

        let succeeded = outcome.is_ok();
        if let Some(definition) = self.registry.lookup_mut(name) {
            definition.loader.finish(outcome);
        }
        self.loader.settle(name, succeeded);

        self.settle();
    }

    /// Perform queued fetches with `fetcher` until none are left.
    ///
    /// Returns the number of fetches performed.
    pub fn run_until_stalled<F>(&mut self, fetcher: &mut F) -> usize
    where
        F: Fetcher + ?Sized,
    {
        let mut fetched = 0;

        loop {
            let requests = self.take_fetches();
            if requests.is_empty() {
                break;
            }

            for request in requests {
                fetched += 1;
                let outcome = fetcher.fetch(&request);
                self.complete(&request.name, outcome);
            }
        }

        fetched
    }
}
