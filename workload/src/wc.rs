//! A MapReduce-compatible application that counts the occurrences of
//! each word in a set of text files.

use anyhow::Result;
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput};

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Emits `(word, "1")` for every word of the input, lowercased.
///
/// Words are maximal runs of ASCII letters, digits and underscores.
pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let content = string_from_bytes(kv.value)?.to_lowercase();
    let words = content
        .split(|c: char| !is_word_char(c))
        .filter(|word| !word.is_empty())
        .map(|word| Ok(KeyValue::new(word.to_string(), "1")))
        .collect::<Vec<Result<KeyValue>>>();
    Ok(Box::new(words.into_iter()))
}

/// Sums the counts for a word.
pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let mut count = 0u64;
    for value in values {
        count += string_from_bytes(value)?.trim().parse::<u64>()?;
    }
    Ok(Bytes::from(count.to_string()))
}
