use serde::Serialize;
use std::fmt;

use crate::fallback::Fallback;
use crate::loader::BatchStats;
use crate::registry::{Definition, Registry};

const SEPARATOR_WIDTH: usize = 84;

/// Load and invocation figures for one module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStats {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Fetch duration in seconds, when the module was fetched
    pub seconds: Option<f64>,
    pub loaded: bool,
    pub invoked: bool,
    /// Number of failed fetch attempts
    pub failed: usize,
    pub success: Option<bool>,
    /// Names bound to this module with `alias`, sorted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl ModuleStats {
    fn of(definition: &Definition, registry: &Registry) -> Self {
        Self {
            name: definition.name().to_string(),
            kind: definition.kind().to_string(),
            seconds: definition
                .loader
                .duration()
                .map(|duration| duration.as_secs_f64()),
            loaded: definition.loader.is_loaded(),
            invoked: definition.invoked(),
            failed: definition.loader.failed.len(),
            success: definition.loader.success(),
            aliases: registry
                .aliases_of(definition.name())
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Snapshot of every module the page touched, in registration order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub modules: Vec<ModuleStats>,
    pub batches: BatchStats,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<32}{:<10}{:<10}{:<8}{:<9}{:<8}Success",
            "Library", "Type", "Time", "Loaded", "Invoked", "Failed"
        )?;
        writeln!(f, "{}", "-".repeat(SEPARATOR_WIDTH))?;

        for module in &self.modules {
            let time = module
                .seconds
                .map_or_else(|| "N/A".to_string(), |seconds| format!("{seconds:.3}"));
            let success = module
                .success
                .map_or_else(|| "N/A".to_string(), |success| success.to_string());

            writeln!(
                f,
                "{:<32}{:<10}{:<10}{:<8}{:<9}{:<8}{}",
                module.name, module.kind, time, module.loaded, module.invoked, module.failed, success
            )?;
        }

        writeln!(f, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        write!(
            f,
            "Batches: {} started, {} succeeded, {} unsuccessful",
            self.batches.started, self.batches.succeeded, self.batches.unsuccessful
        )
    }
}

impl Fallback {
    /// Per-module load report. Internal surface modules are left out.
    pub fn stats(&self) -> Report {
        Report {
            modules: self
                .registry
                .definitions()
                .filter(|definition| !definition.is_internal())
                .map(|definition| ModuleStats::of(definition, &self.registry))
                .collect(),
            batches: self.loader.stats(),
        }
    }
}
