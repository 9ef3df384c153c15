//! Bootstrapping from page `<script>` attributes.
//!
//! `base`/`data-base` seed the configuration and `main`/`data-main` name the
//! modules to require on start-up. Attribute values are comma separated.

use rustc_hash::FxHashMap;
use serde_json::json;
use tracing::debug;

use crate::fallback::{Fallback, RequestId, RequireResult};

/// Attributes of one `<script>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptElement {
    attributes: FxHashMap<String, String>,
}

impl ScriptElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Values of `attribute` and `data-{attribute}` across `scripts`, in page order
pub fn attribute_values(scripts: &[ScriptElement], attribute: &str) -> Vec<String> {
    let data_attribute = format!("data-{attribute}");

    scripts
        .iter()
        .flat_map(|script| [script.attribute(attribute), script.attribute(&data_attribute)])
        .flatten()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

impl Fallback {
    /// Apply the first `base` found in `scripts` and require every `main` module.
    ///
    /// Returns `None` when no script names a main module.
    pub fn autoload(
        &mut self,
        scripts: &[ScriptElement],
        callback: impl FnOnce(&mut Fallback, RequireResult) + 'static,
    ) -> Option<RequestId> {
        if let Some(base) = attribute_values(scripts, "base").into_iter().next() {
            self.config(&json!({ "base": base }));
        }

        let main = attribute_values(scripts, "main");
        if main.is_empty() {
            return None;
        }

        if self.config.debug {
            debug!(modules = ?main, "autoloading");
        }
        Some(self.require(main, callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_values_splits_and_trims() {
        let scripts = [
            ScriptElement::new().with_attribute("data-main", "app, ,  vendor "),
            ScriptElement::new().with_attribute("main", "extra"),
        ];

        assert_eq!(
            attribute_values(&scripts, "main"),
            vec!["app", "vendor", "extra"]
        );
    }

    #[test]
    fn test_attribute_names_are_case_insensitive() {
        let script = ScriptElement::new().with_attribute("DATA-BASE", "/js");
        assert_eq!(script.attribute("data-base"), Some("/js"));
    }

    #[test]
    fn test_autoload_without_main() {
        let mut fallback = Fallback::default();
        let scripts = [ScriptElement::new().with_attribute("base", "/static/")];

        assert!(fallback.autoload(&scripts, |_, _| {}).is_none());
        assert_eq!(fallback.configuration().base, "/static/");
    }

    #[test]
    fn test_autoload_uses_first_base() {
        let mut fallback = Fallback::default();
        let scripts = [
            ScriptElement::new().with_attribute("data-base", "first"),
            ScriptElement::new()
                .with_attribute("base", "second")
                .with_attribute("data-main", "app"),
        ];

        let id = fallback.autoload(&scripts, |_, _| {}).unwrap();

        assert!(fallback.is_pending(id));
        let fetches = fallback.take_fetches();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].url, "first/app.js");
    }
}
