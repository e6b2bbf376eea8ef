//! A MapReduce-compatible application that finds the lines containing
//! a pattern, passed as the auxiliary argument.
//!
//! Keys are `<source>:<line number>`, values are the matching lines.

use anyhow::{anyhow, Result};
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput};

pub fn map(kv: KeyValue, aux: Bytes) -> MapOutput {
    let source = string_from_bytes(kv.key)?;
    let content = string_from_bytes(kv.value)?;
    let pattern = string_from_bytes(aux)?;
    if pattern.is_empty() {
        return Err(anyhow!("grep requires a pattern as its auxiliary argument"));
    }

    let matches = content
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains(pattern.as_str()))
        // Tabs would split the record in the intermediate file.
        .map(|(index, line)| {
            Ok(KeyValue::new(
                format!("{}:{}", source, index + 1),
                line.replace('\t', " "),
            ))
        })
        .collect::<Vec<Result<KeyValue>>>();
    Ok(Box::new(matches.into_iter()))
}

/// Each key is a distinct line, so there is exactly one value.
pub fn reduce(
    key: Bytes,
    mut values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    values
        .next()
        .ok_or_else(|| anyhow!("no line for key {}", String::from_utf8_lossy(&key)))
}
