//! Text format of intermediate and output files.
//!
//! One record per line, key and value separated by a single tab. Nothing is
//! escaped, so a key containing a tab or a newline corrupts the file.

use std::io::{self, Write};

use crate::task::TaskId;
use crate::KeyValue;

/// Name of the file holding map task `map_id`'s records for `partition`.
pub fn intermediate_file_name(map_id: TaskId, partition: u32) -> String {
    format!("mr-{}-{}", map_id, partition)
}

/// Whether `name` has the exact shape of an intermediate file name,
/// `mr-<digits>-<digits>`.
pub fn is_intermediate_file_name(name: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    name.strip_prefix("mr-")
        .and_then(|rest| rest.split_once('-'))
        .is_some_and(|(map_id, partition)| all_digits(map_id) && all_digits(partition))
}

/// Name of the file holding reduce task `reduce_id`'s output.
pub fn output_file_name(reduce_id: TaskId) -> String {
    format!("output-{}", reduce_id)
}

/// Write `key<TAB>value<NEWLINE>`.
pub fn write_record<W: Write>(writer: &mut W, key: &[u8], value: &[u8]) -> io::Result<()> {
    writer.write_all(key)?;
    writer.write_all(b"\t")?;
    writer.write_all(value)?;
    writer.write_all(b"\n")
}

/// Write a key-value pair as one record.
pub fn write_key_value<W: Write>(writer: &mut W, kv: &KeyValue) -> io::Result<()> {
    write_record(writer, &kv.key, &kv.value)
}

/// Split a line (without its newline) on the first tab.
///
/// Returns [`None`] for lines with no tab.
pub fn parse_record(line: &str) -> Option<(&str, &str)> {
    line.split_once('\t')
}
