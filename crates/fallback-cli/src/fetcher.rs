//! Filesystem fetch backend.
//!
//! A module file holds JSON: one declaration object or an array of them.
//! When `name.js` is missing, `name.json` next to it is tried.

use fallback_core::value::Names;
use fallback_core::{script, Factory, FetchRequest, Fetcher, LoadError, Script};
use serde::Deserialize;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ModuleDecl {
    /// Defaults to the requested module name
    name: Option<String>,
    /// One name or an array of names
    #[serde(default)]
    dependencies: Option<Value>,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModuleFile {
    Many(Vec<ModuleDecl>),
    One(ModuleDecl),
}

impl ModuleFile {
    fn into_decls(self) -> Vec<ModuleDecl> {
        match self {
            ModuleFile::Many(decls) => decls,
            ModuleFile::One(decl) => vec![decl],
        }
    }
}

pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, url: &str) -> Result<(PathBuf, String), LoadError> {
        if url.contains("://") || url.starts_with("//") {
            return Err(LoadError::new(url, "remote URLs are not supported"));
        }

        // site-root URLs resolve against the root, like a page against its origin
        let path = self.root.join(url.trim_start_matches('/'));
        match std::fs::read_to_string(&path) {
            Ok(source) => Ok((path, source)),
            Err(err) if err.kind() == io::ErrorKind::NotFound && has_extension(&path, "js") => {
                let sibling = path.with_extension("json");
                std::fs::read_to_string(&sibling)
                    .map(|source| (sibling, source))
                    .map_err(|_| LoadError::new(url, err.to_string()))
            }
            Err(err) => Err(LoadError::new(url, err.to_string())),
        }
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

impl Fetcher for FsFetcher {
    fn fetch(&mut self, request: &FetchRequest) -> Result<Script, LoadError> {
        let (path, source) = self.read(&request.url)?;
        debug!(module = %request.name, path = %path.display(), "read module file");

        let decls = serde_json::from_str::<ModuleFile>(&source)
            .map_err(|err| LoadError::new(&request.url, format!("invalid module file: {err}")))?
            .into_decls();

        let requested = request.name.clone();
        Ok(script(move |fallback| {
            for decl in decls {
                let name = decl.name.as_deref().unwrap_or(&requested);
                let (dependencies, dropped) = decl
                    .dependencies
                    .as_ref()
                    .map(Names::from_value)
                    .unwrap_or_default()
                    .normalize();
                if dropped > 0 {
                    warn!(module = name, dropped, "ignoring dependencies that are not names");
                }
                let dependencies: Vec<&str> = dependencies.iter().map(String::as_str).collect();
                fallback.define(name, Factory::value(decl.value), &dependencies);
            }
        }))
    }
}
