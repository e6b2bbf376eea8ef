use anyhow::Context;
use bytes::Bytes;

/// Convert bytes holding UTF-8 text into a [`String`].
pub fn string_from_bytes(bytes: Bytes) -> anyhow::Result<String> {
    String::from_utf8(bytes.to_vec()).context("value is not valid UTF-8")
}

/// Join auxiliary arguments into the bytes handed to map and reduce.
pub fn aux_from_args(args: &[String]) -> Bytes {
    Bytes::from(args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8() {
        assert_eq!(string_from_bytes(Bytes::from("héllo")).unwrap(), "héllo");
        assert!(string_from_bytes(Bytes::from_static(&[0xff, 0xfe])).is_err());
    }

    #[test]
    fn joins_args_with_spaces() {
        let args = vec!["foo".to_string(), "bar".to_string()];
        assert_eq!(aux_from_args(&args), Bytes::from("foo bar"));
        assert!(aux_from_args(&[]).is_empty());
    }
}
