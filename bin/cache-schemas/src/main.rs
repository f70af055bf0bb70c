#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use std::fmt::Write as _;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use alloy_provider::ProviderBuilder;
use anyhow::{Context, Result};
use args::CacheArgs;
use clap::Parser;
use schema_cache::abi::ContractArtifact;
use schema_cache::input::load_component_ids;
use schema_cache::{Pipeline, ResultStore, RunReport};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod args;

/// Some components could not be resolved, the catalog holds the rest.
const EXIT_PARTIAL: i32 = 2;

const LOG_TARGET: &str = "cache_schemas";

#[tokio::main]
async fn main() {
    let args = CacheArgs::parse();
    let _ = args.init_logging();

    match run(args).await {
        Ok(report) if report.is_success() => {}
        Ok(_) => exit(EXIT_PARTIAL),
        Err(err) => {
            eprintln!("error: {err:?}");
            exit(1);
        }
    }
}

async fn run(args: CacheArgs) -> Result<RunReport> {
    ContractArtifact::load(&args.world_abi)?.require_world()?;
    ContractArtifact::load(&args.component_abi)?.require_component()?;
    let ids = load_component_ids(&args.components)?;

    let provider = ProviderBuilder::new()
        .on_builtin(args.rpc_url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", args.rpc_url))?;
    info!(target: LOG_TARGET, url = %args.rpc_url, world = %args.world_address, "Using node.");

    let pipeline = Pipeline::new(Arc::new(provider), args.world_address, args.pipeline_config());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(target: LOG_TARGET, "Received Ctrl-C, shutting down.");
                cancel.cancel();
            }
        }
    });

    if let Some(deadline) = args.deadline() {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!(target: LOG_TARGET, ?deadline, "Deadline reached, shutting down.");
            cancel.cancel();
        });
    }

    let report = pipeline
        .run_until_cancelled(&ids, &cancel)
        .await
        .with_context(|| format!("Failed to resolve components of world {}", args.world_address))?;

    let store = ResultStore::new(&args.output);
    store.persist(&report.catalog)?;

    print!("{}", summary(&report, store.path()));
    Ok(report)
}

fn summary(report: &RunReport, output: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Resolved {} component schema(s) at block {}.",
        report.catalog.len(),
        report.block
    );

    if !report.failures.is_empty() {
        let _ = writeln!(out, "Failed to resolve {} component(s):", report.failures.len());
        for failure in &report.failures {
            let _ = writeln!(out, "  {}: {}: {}", failure.id, failure.kind(), failure.error);
        }
    }

    let _ = writeln!(out, "Schemas written to {}.", output.display());
    out
}
