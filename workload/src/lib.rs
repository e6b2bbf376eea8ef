//! MapReduce applications that can be run by name.

use anyhow::{anyhow, Result};
use common::Workload;

pub mod grep;
pub mod vertex_degree;
pub mod wc;

/// Names of every known workload, for help text and error messages.
pub const WORKLOAD_NAMES: [&str; 3] = ["wc", "grep", "vertex-degree"];

/// Look up a workload by name.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" => Some(Workload {
            map_fn: wc::map,
            reduce_fn: wc::reduce,
        }),
        "grep" => Some(Workload {
            map_fn: grep::map,
            reduce_fn: grep::reduce,
        }),
        "vertex-degree" => Some(Workload {
            map_fn: vertex_degree::map,
            reduce_fn: vertex_degree::reduce,
        }),
        _ => None,
    }
}

/// Look up a workload by name, failing with the list of known names.
pub fn named(name: &str) -> Result<Workload> {
    try_named(name).ok_or_else(|| {
        anyhow!(
            "The workload `{}` is not a known workload (expected one of: {})",
            name,
            WORKLOAD_NAMES.join(", ")
        )
    })
}
