//! adp-agent CLI: validate manifests, dry-run dispatch plans, print the manifest schema.
//!
//! Output on stdout is JSON. Logging: set `RUST_LOG=adp_agent=debug` (or pass
//! `--verbose`) to see matcher and settings logs on stderr.

mod cli;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use adp_agent::{
    DispatchError, DispatchResult, HandlerMatcher, load_runtime_settings, plan_dispatch,
    set_config_home_override,
};
use adp_types::{CapabilityManifest, manifest_json_schema};

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "adp_agent=debug"
        } else {
            "adp_agent=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Validate { manifest } => run_validate(&manifest),
        Command::Plan {
            manifest,
            text,
            params,
            min_confidence,
        } => run_plan(&manifest, &text, &params, min_confidence),
        Command::Schema => print_json(&manifest_json_schema()),
    }
}

fn run_validate(path: &Path) -> Result<()> {
    let manifest = read_manifest(path)?;
    print_json(&manifest)
}

fn run_plan(path: &Path, text: &str, params: &[String], min_confidence: Option<f64>) -> Result<()> {
    let manifest = read_manifest(path)?;
    let config = load_runtime_settings().dispatcher_config();
    let matcher = HandlerMatcher::new(min_confidence.unwrap_or(config.min_confidence));
    let overrides = parse_params(params)?;

    match plan_dispatch(&matcher, &manifest, text, &overrides) {
        Ok(plan) => print_json(&plan),
        Err(error) => {
            let message = error.to_string();
            print_json(&DispatchResult::from(error))?;
            bail!(message)
        }
    }
}

fn read_manifest(path: &Path) -> Result<CapabilityManifest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    match CapabilityManifest::from_json(&raw) {
        Ok(manifest) => Ok(manifest),
        Err(error) => {
            let unsupported = DispatchError::Unsupported {
                process_id: path.display().to_string(),
                reason: error.to_string(),
            };
            let message = unsupported.to_string();
            print_json(&DispatchResult::from(unsupported))?;
            bail!(message)
        }
    }
}

fn parse_params(raw: &[String]) -> Result<Map<String, Value>> {
    let mut params = Map::new();
    for entry in raw {
        let Some((name, value)) = entry.split_once('=') else {
            bail!("invalid --param '{entry}': expected NAME=VALUE");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("invalid --param '{entry}': empty name");
        }
        params.insert(name.to_string(), Value::String(value.to_string()));
    }
    Ok(params)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
