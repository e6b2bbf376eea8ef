use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Error};
use bytes::Bytes;
use tracing::{debug, info};

use common::codec::{intermediate_file_name, write_key_value};
use common::{partition, KeyValue, MapTask, Workload};

/// Run the map function over one input file and split its output into
/// `n_reduce` intermediate files in `work_dir`.
///
/// Returns the intermediate file names indexed by partition. Every
/// partition gets a file, even an empty one.
pub fn perform_map(
    task: &MapTask,
    workload: &Workload,
    aux: Bytes,
    work_dir: &Path,
) -> Result<Vec<String>, Error> {
    info!("Starting map task {} on `{}`", task.id, task.input_file);

    let content = fs::read_to_string(&task.input_file)
        .with_context(|| format!("failed to read input file `{}`", task.input_file))?;

    let input = KeyValue::new(task.input_file.clone(), content);
    let output = (workload.map_fn)(input, aux)
        .with_context(|| format!("map function failed on `{}`", task.input_file))?;

    let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); task.n_reduce as usize];
    for kv in output {
        let kv = kv.with_context(|| format!("map function failed on `{}`", task.input_file))?;
        buckets[partition(&kv.key, task.n_reduce) as usize].push(kv);
    }

    let mut intermediate_files = Vec::with_capacity(buckets.len());
    for (index, bucket) in buckets.iter().enumerate() {
        let file_name = intermediate_file_name(task.id, index as u32);
        let path = work_dir.join(&file_name);

        let file = File::create(&path)
            .with_context(|| format!("failed to create intermediate file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for kv in bucket {
            write_key_value(&mut writer, kv)?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to write intermediate file {}", path.display()))?;

        debug!("Wrote {} records to {}", bucket.len(), file_name);
        intermediate_files.push(file_name);
    }

    Ok(intermediate_files)
}
