mod fetcher;
mod page;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use fallback_core::{Config, Fallback, Namespace, RequireResult};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::fetcher::FsFetcher;

/// Fallback - resolve modules and their dependencies from the filesystem
#[derive(Parser, Debug, Clone)]
#[command(name = "fallback")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Modules to require
    #[arg(value_name = "NAME")]
    names: Vec<String>,

    /// Prefix for module URLs, relative to the working directory
    #[arg(long, value_name = "DIR")]
    base: Option<String>,

    /// HTML page whose <script> tags carry base/main attributes
    #[arg(long, value_name = "FILE")]
    page: Option<PathBuf>,

    /// Path to a fallback.json or fallback.yaml options file
    #[arg(short, long, value_name = "FILE")]
    project: Option<PathBuf>,

    /// Log every resolution step
    #[arg(long)]
    debug: bool,

    /// Print the load report after resolving
    #[arg(long, value_name = "FORMAT")]
    stats: Option<StatsFormat>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum StatsFormat {
    Table,
    Json,
}

/// Project options files looked up in the working directory
const PROJECT_FILES: &[&str] = &["fallback.json", "fallback.yaml", "fallback.yml"];

type Outcomes = Rc<RefCell<Vec<(Vec<String>, RequireResult)>>>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set RUST_LOG to override; --debug raises the default level
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let mut fallback = Fallback::new(Config::default());
    if let Some(options) = load_project_options(cli.project.as_deref())? {
        fallback.config(&options);
    }
    fallback.config(&cli_overrides(&cli));

    let mut namespace = Namespace::new();
    fallback.bind_aliases(&mut namespace);

    let outcomes: Outcomes = Rc::default();
    let mut requested = false;

    if let Some(page) = &cli.page {
        let html = std::fs::read_to_string(page)
            .with_context(|| format!("failed to read page {}", page.display()))?;
        let scripts = page::scan_scripts(&html);
        debug!(scripts = scripts.len(), "scanned page");

        let main = fallback_core::autoload::attribute_values(&scripts, "main");
        if fallback
            .autoload(&scripts, record(&outcomes, main))
            .is_some()
        {
            requested = true;
        }
    }

    if !cli.names.is_empty() {
        fallback.require(cli.names.clone(), record(&outcomes, cli.names.clone()));
        requested = true;
    }

    if !requested {
        eprintln!("Error: No modules to require. Pass module names or a --page with data-main.");
        std::process::exit(2);
    }

    let root = std::env::current_dir().context("failed to resolve the working directory")?;
    let fetched = fallback.run_until_stalled(&mut FsFetcher::new(root));
    info!(fetched, "fetching finished");

    let mut resolved = Map::new();
    let mut failed = false;

    for (names, result) in outcomes.borrow_mut().drain(..) {
        match result {
            Ok(values) => {
                for (name, value) in names.into_iter().zip(values) {
                    resolved.insert(name, value);
                }
            }
            Err(err) => {
                failed = true;
                eprintln!("Error: {:#}", anyhow::Error::new(err));
            }
        }
    }

    if fallback.pending_requests() > 0 {
        failed = true;
        eprintln!(
            "Error: {} request(s) never settled",
            fallback.pending_requests()
        );
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(resolved))?);

    match cli.stats {
        Some(StatsFormat::Table) => println!("{}", fallback.stats()),
        Some(StatsFormat::Json) => println!("{}", serde_json::to_string_pretty(&fallback.stats())?),
        None => {}
    }

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

/// Callback storing the result of one request under its names
fn record(
    outcomes: &Outcomes,
    names: Vec<String>,
) -> impl FnOnce(&mut Fallback, RequireResult) + 'static {
    let outcomes = Rc::clone(outcomes);
    move |_: &mut Fallback, result| outcomes.borrow_mut().push((names, result))
}

/// Options from `--project`, or from the first project file in the working directory
fn load_project_options(project: Option<&Path>) -> anyhow::Result<Option<Value>> {
    let path = match project {
        Some(path) => path.to_path_buf(),
        None => match PROJECT_FILES.iter().map(PathBuf::from).find(|p| p.exists()) {
            Some(path) => path,
            None => return Ok(None),
        },
    };

    debug!(path = %path.display(), "loading project options");
    let options = Config::read_options(&path)
        .with_context(|| format!("failed to load project options from {}", path.display()))?;

    Ok(Some(options))
}

fn cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();
    if let Some(base) = &cli.base {
        overrides.insert("base".to_string(), json!(base));
    }
    if cli.debug {
        overrides.insert("debug".to_string(), json!(true));
    }
    Value::Object(overrides)
}
