use std::path::PathBuf;

use clap::Parser;

//
// For parsing user specified job configuration.
//
#[derive(Parser, Debug)]
#[command(version, about = "Run a MapReduce job with an in-process worker pool", long_about = None)]
pub struct Args {
    /// Glob spec for the input files.
    #[arg(short, long)]
    pub input: String,

    /// Name of the workload (wc, grep, vertex-degree).
    #[arg(short, long, default_value = "wc")]
    pub workload: String,

    /// Directory for intermediate and output files.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Number of workers.
    #[arg(short = 'n', long, default_value_t = 4)]
    pub workers: usize,

    /// Number of reduce partitions.
    #[arg(short, long, default_value_t = 3)]
    pub reduce: u32,

    /// How long a worker waits for a task before asking again, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Records sorted in memory per chunk during reduce.
    #[arg(long, default_value_t = 1_000_000)]
    pub sort_buffer: usize,

    /// Remove intermediate files once the job completes.
    #[arg(long)]
    pub cleanup: bool,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[arg(last = true)]
    pub args: Vec<String>,
}
