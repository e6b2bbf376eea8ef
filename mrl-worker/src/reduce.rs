use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Error};
use bytes::Bytes;
use ext_sort::{ExternalSorter, ExternalSorterBuilder, LimitedBufferBuilder};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use common::codec::{output_file_name, parse_record, write_record};
use common::{ReduceTask, Workload};

/// An intermediate record tagged with the order it was read in.
///
/// Ordering compares `key` first and `seq` second. `seq` is unique, so the
/// order is total and records with equal keys keep their read order even
/// when they end up in different sorted chunks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct SortRecord {
    key: String,
    seq: u64,
    value: String,
}

/// Read every intermediate file of the task as one stream of records.
fn read_records(
    task: &ReduceTask,
    work_dir: &Path,
) -> Result<impl Iterator<Item = io::Result<SortRecord>>, Error> {
    let mut readers = Vec::with_capacity(task.partition_files.len());
    for name in &task.partition_files {
        let path = work_dir.join(name);
        let file = File::open(&path)
            .with_context(|| format!("failed to open intermediate file {}", path.display()))?;
        readers.push(BufReader::new(file));
    }

    // Split on '\n' only, so a value ending in '\r' survives.
    let records = readers
        .into_iter()
        .flat_map(|reader| reader.split(b'\n'))
        .map(|line| {
            line.and_then(|bytes| {
                String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            })
        })
        .filter_map(|line| match line {
            Ok(line) if line.is_empty() => None,
            Ok(line) => match parse_record(&line) {
                Some((key, value)) => Some(Ok((key.to_string(), value.to_string()))),
                None => {
                    warn!("Skipping malformed intermediate record: {:?}", line);
                    None
                }
            },
            Err(e) => Some(Err(e)),
        })
        .zip(0u64..)
        .map(|(record, seq)| record.map(|(key, value)| SortRecord { key, seq, value }));

    Ok(records)
}

/// Sort every record of the task's partition by key, group equal keys and
/// write one `key<TAB>result` line per group to `output-<id>` in `work_dir`.
///
/// Returns the output file name.
pub fn perform_reduce(
    task: &ReduceTask,
    workload: &Workload,
    aux: Bytes,
    work_dir: &Path,
    sort_buffer: usize,
) -> Result<String, Error> {
    info!(
        "Starting reduce task {} over {} intermediate files",
        task.id,
        task.partition_files.len()
    );

    let records = read_records(task, work_dir)?;

    let sorter: ExternalSorter<SortRecord, io::Error, LimitedBufferBuilder> =
        ExternalSorterBuilder::new()
            .with_tmp_dir(work_dir)
            .with_buffer(LimitedBufferBuilder::new(sort_buffer.max(1), false))
            .build()
            .context("failed to set up the external sorter")?;
    let sorted = sorter
        .sort(records)
        .with_context(|| format!("failed to sort records of reduce task {}", task.id))?;

    let output_name = output_file_name(task.id);
    let output_path = work_dir.join(&output_name);
    let file = File::create(&output_path)
        .with_context(|| format!("failed to create output file {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    let reduce_fn = workload.reduce_fn;
    let mut groups = 0usize;
    itertools::process_results(sorted, |records| -> Result<(), Error> {
        for (key, group) in &records.chunk_by(|record| record.key.clone()) {
            let values = group.map(|record| Bytes::from(record.value));
            let result = reduce_fn(Bytes::from(key.clone()), Box::new(values), aux.clone())
                .with_context(|| format!("reduce function failed on key `{}`", key))?;
            write_record(&mut writer, key.as_bytes(), &result)?;
            groups += 1;
        }
        Ok(())
    })
    .context("failed to read back sorted records")??;

    writer
        .flush()
        .with_context(|| format!("failed to write output file {}", output_path.display()))?;

    debug!("Wrote {} keys to {}", groups, output_name);
    Ok(output_name)
}
