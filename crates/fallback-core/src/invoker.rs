//! Single-invocation factory runner.

use serde_json::Value;

use crate::errors::ResolveError;
use crate::registry::{Definition, Factory};

/// The memoized outcome of a definition whose factory already ran
pub fn memoized(definition: &Definition) -> Option<Result<Value, ResolveError>> {
    if !definition.invoked() {
        return None;
    }

    if let Some(message) = definition.error() {
        return Some(Err(ResolveError::FactoryError {
            name: definition.name().to_string(),
            message: message.to_string(),
        }));
    }

    Some(Ok(definition.value().cloned().unwrap_or(Value::Null)))
}

/// Run the factory of `definition` with `arguments` (dependency values in
/// declared order) and memoize the outcome.
///
/// The caller must have resolved every dependency first. Once a factory has
/// run, later calls return the memoized outcome without calling it again.
/// A failing factory is memoized as a failure.
pub fn invoke(definition: &mut Definition, arguments: &[Value]) -> Result<Value, ResolveError> {
    if let Some(outcome) = memoized(definition) {
        return outcome;
    }

    let Some(factory) = definition.factory().cloned() else {
        return Err(ResolveError::UnresolvedDependency {
            name: definition.name().to_string(),
            cause: definition.loader.failed.last().cloned(),
        });
    };

    let outcome = match factory {
        Factory::Function(factory) => factory(arguments).map_err(|err| format!("{err:#}")),
        Factory::Value(value) => Ok(value),
    };
    definition.memoize(outcome);

    memoized(definition).unwrap_or(Ok(Value::Null))
}
