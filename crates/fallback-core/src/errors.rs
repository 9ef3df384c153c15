use thiserror::Error;

/// A script fetch that did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load `{url}`: {message}")]
pub struct LoadError {
    pub url: String,
    pub message: String,
}

impl LoadError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Errors that fail a `require` request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("unresolved dependency `{name}`")]
    UnresolvedDependency {
        name: String,
        #[source]
        cause: Option<LoadError>,
    },

    #[error("factory for `{name}` failed: {message}")]
    FactoryError { name: String, message: String },

    #[error("request cancelled")]
    Cancelled,
}

impl ResolveError {
    /// Name of the module the failure is attributed to, if any.
    pub fn module(&self) -> Option<&str> {
        match self {
            ResolveError::CyclicDependency { cycle } => cycle.first().map(String::as_str),
            ResolveError::UnresolvedDependency { name, .. }
            | ResolveError::FactoryError { name, .. } => Some(name),
            ResolveError::Cancelled => None,
        }
    }
}

/// Registry and alias errors. The `Fallback` facade downgrades these to warnings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("module names must be non-empty strings")]
    InvalidName,

    #[error("module `{name}` was already invoked and cannot be redefined")]
    AlreadyInvoked { name: String },

    #[error("`{alias}` is already bound to `{existing}`")]
    AliasCollision { alias: String, existing: String },

    #[error("module `{name}` is not defined")]
    UnknownModule { name: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the key `{key}` is not allowed in `config`, discarding")]
    Rejected { key: String },

    #[error("the key `{key}` expects a {expected}, discarding")]
    InvalidValue { key: String, expected: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
