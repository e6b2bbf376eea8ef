use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::utils::aux_from_args;
use standalone::args::Args;
use standalone::{cleanup_intermediate, discover_inputs, run_job, JobConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Configuration errors surface before any task exists.
    let workload = workload::named(&args.workload)?;
    let input_files = discover_inputs(&args.input)?;
    info!("Found {} input files for `{}`", input_files.len(), args.input);

    let config = JobConfig {
        input_files,
        workload,
        n_reduce: args.reduce,
        n_workers: args.workers,
        work_dir: args.output.clone(),
        request_timeout: Duration::from_millis(args.timeout_ms),
        sort_buffer: args.sort_buffer,
        aux: aux_from_args(&args.args),
    };

    let report = run_job(config, |coordinator| {
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl-C, stopping workers...");
                    coordinator.shutdown();
                }
                Err(err) => error!("Unable to listen for shutdown signal: {}", err),
            }
        });
    })
    .await
    .context("MapReduce job failed")?;

    info!("[Status] {}", report.status);
    for output in &report.outputs {
        info!("Output written to {}", output.display());
    }

    if args.cleanup {
        let removed = cleanup_intermediate(&args.output)?;
        info!("Removed {} intermediate files", removed);
    }

    println!("MapReduce completed.");
    Ok(())
}
