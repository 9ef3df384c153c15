//! In-memory module store.
//!
//! Holds one [`Definition`] per module name plus a many-to-one alias table.
//! Every mutation is synchronous and visible to the next lookup.

mod definition;

pub use definition::{Definition, Factory, LoadState, LoaderRecord};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::errors::{RegistryError, Result};

/// Module definitions in definition order, plus aliases
#[derive(Debug, Default)]
pub struct Registry {
    definitions: IndexMap<String, Definition>,

    /// alias name -> canonical module name (never another alias)
    aliases: FxHashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite a module.
    ///
    /// Overwriting keeps the loader record so a definition arriving from a
    /// fetched script lands on its placeholder. A module whose factory has
    /// already run is never overwritten.
    pub fn define(&mut self, name: &str, factory: Factory, dependencies: Vec<String>) -> Result<()> {
        if name.is_empty() {
            return Err(RegistryError::InvalidName);
        }

        if let Some(target) = self.aliases.get(name) {
            return Err(RegistryError::AliasCollision {
                alias: name.to_string(),
                existing: target.clone(),
            });
        }

        match self.definitions.get_mut(name) {
            Some(existing) if existing.invoked() => Err(RegistryError::AlreadyInvoked {
                name: name.to_string(),
            }),
            Some(existing) => {
                existing.redefine(factory, dependencies);
                Ok(())
            }
            None => {
                self.definitions.insert(
                    name.to_string(),
                    Definition::new(name.to_string(), factory, dependencies),
                );
                Ok(())
            }
        }
    }

    /// Find a definition by module name or alias
    pub fn lookup(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(self.canonical_name(name))
    }

    pub(crate) fn lookup_mut(&mut self, name: &str) -> Option<&mut Definition> {
        let canonical = match self.aliases.get(name) {
            Some(target) => target.clone(),
            None => name.to_string(),
        };
        self.definitions.get_mut(&canonical)
    }

    /// Resolve an alias to its module name; other names map to themselves
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    /// Bind `alias_name` to the definition behind `name`.
    ///
    /// Binding an alias that already resolves to the same definition is a no-op.
    pub fn alias(&mut self, name: &str, alias_name: &str) -> Result<()> {
        if alias_name.is_empty() {
            return Err(RegistryError::InvalidName);
        }

        let target = self.canonical_name(name).to_string();
        if !self.definitions.contains_key(&target) {
            return Err(RegistryError::UnknownModule { name: target });
        }

        let existing = self.canonical_name(alias_name);
        if existing == target {
            return Ok(());
        }
        if self.definitions.contains_key(existing) || self.aliases.contains_key(alias_name) {
            return Err(RegistryError::AliasCollision {
                alias: alias_name.to_string(),
                existing: existing.to_string(),
            });
        }

        self.aliases.insert(alias_name.to_string(), target);
        Ok(())
    }

    /// The definition for `name`, creating a placeholder when absent
    pub(crate) fn placeholder(&mut self, name: &str) -> &mut Definition {
        self.definitions
            .entry(name.to_string())
            .or_insert_with(|| Definition::placeholder(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Aliases bound to `name`, sorted
    pub fn aliases_of(&self, name: &str) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.as_str())
            .collect();
        aliases.sort_unstable();
        aliases
    }

    /// All definitions, placeholders included, in definition order
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
