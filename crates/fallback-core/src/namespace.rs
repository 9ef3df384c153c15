//! Host-global alias bindings.
//!
//! A [`Namespace`] stands in for the host's global object. [`Fallback::bind_aliases`]
//! publishes the public surfaces (`config`, `define`, `fallback`, `require`)
//! under their short names without ever overwriting a name the host already
//! bound.

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

use crate::diagnostics::DiagnosticCode;
use crate::errors::{RegistryError, Result};
use crate::fallback::Fallback;
use crate::registry::Factory;

/// A public entry point of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Config,
    Define,
    Fallback,
    Require,
}

impl Surface {
    pub const ALL: [Surface; 4] = [
        Surface::Config,
        Surface::Define,
        Surface::Fallback,
        Surface::Require,
    ];

    /// Name of the internal module exposing this surface
    pub fn module_name(self) -> &'static str {
        match self {
            Surface::Config => "config",
            Surface::Define => "define",
            Surface::Fallback => "fallback",
            Surface::Require => "require",
        }
    }

    /// Global names this surface is published under
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Surface::Config => &["cfg", "conf", "config"],
            Surface::Define => &["def", "define"],
            Surface::Fallback => &["fallback", "fbk"],
            Surface::Require => &["req", "require"],
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.module_name())
    }
}

/// What a global name is bound to
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Surface(Surface),
    /// Anything the host put there itself
    Host(Value),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Surface(surface) => write!(f, "fallback `{surface}`"),
            Binding::Host(value) => write!(f, "host value {value}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Namespace {
    bindings: FxHashMap<String, Binding>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Host-side assignment; always overwrites
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), Binding::Host(value));
    }

    /// Bind `name` unless it is already bound to something else.
    ///
    /// Re-binding a name to the binding it already has succeeds.
    pub fn bind(&mut self, name: &str, binding: Binding) -> Result<()> {
        match self.bindings.get(name) {
            Some(existing) if *existing == binding => Ok(()),
            Some(existing) => Err(RegistryError::AliasCollision {
                alias: name.to_string(),
                existing: existing.to_string(),
            }),
            None => {
                self.bindings.insert(name.to_string(), binding);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Outcome of [`Fallback::bind_aliases`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BindReport {
    pub bound: Vec<(String, Surface)>,
    /// Names left untouched because the host already used them
    pub skipped: Vec<String>,
}

impl Fallback {
    /// Define the internal surface modules and publish their aliases in `namespace`.
    ///
    /// Calling this again is harmless: names already bound to the same surface
    /// count as bound.
    pub fn bind_aliases(&mut self, namespace: &mut Namespace) -> BindReport {
        let mut report = BindReport::default();

        for surface in Surface::ALL {
            self.define_surface(surface);

            for alias in surface.aliases() {
                match namespace.bind(alias, Binding::Surface(surface)) {
                    Ok(()) => report.bound.push((alias.to_string(), surface)),
                    Err(err) => {
                        self.warn(DiagnosticCode::AliasCollision, &err.to_string());
                        report.skipped.push(alias.to_string());
                    }
                }
            }
        }

        report
    }

    fn define_surface(&mut self, surface: Surface) {
        let name = surface.module_name();

        if let Some(existing) = self.registry.lookup(name) {
            if existing.is_internal() {
                return;
            }
            if existing.is_defined() {
                self.warn(
                    DiagnosticCode::AliasCollision,
                    &format!("module `{name}` is already defined, keeping it"),
                );
                return;
            }
        }

        let value = json!({ "surface": name });
        if let Err(err) = self
            .registry
            .define(name, Factory::value(value.clone()), Vec::new())
        {
            self.warn(DiagnosticCode::AliasCollision, &err.to_string());
            return;
        }

        if let Some(definition) = self.registry.lookup_mut(name) {
            definition.mark_internal();
            definition.memoize(Ok(value));
        }
        self.settle();
    }
}
