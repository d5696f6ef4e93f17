//! Raw query-string lookup.
//!
//! Values are kept as bytes so message payloads survive untouched, and a
//! repeated key resolves to its first occurrence.

use axum::body::Bytes;
use percent_encoding::percent_decode;

/// Decode one `application/x-www-form-urlencoded` component to bytes.
fn decode(component: &str) -> Vec<u8> {
    let spaced: Vec<u8> = component
        .bytes()
        .map(|b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}

/// First value for `key` in `query`, or `None` if the key is absent.
///
/// A key without `=` yields an empty value.
pub fn first_value(query: Option<&str>, key: &str) -> Option<Bytes> {
    query?
        .split('&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(k) == key.as_bytes()).then(|| Bytes::from(decode(v)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_value_lookup() {
        assert_eq!(first_value(None, "v"), None);
        assert_eq!(first_value(Some(""), "v"), None);
        assert_eq!(first_value(Some("x=1"), "v"), None);
        assert_eq!(first_value(Some("v=hello"), "v"), Some(Bytes::from("hello")));
        assert_eq!(first_value(Some("v"), "v"), Some(Bytes::new()));
        assert_eq!(first_value(Some("v="), "v"), Some(Bytes::new()));
    }

    #[test]
    fn test_repeated_key_takes_first() {
        assert_eq!(first_value(Some("v=a&v=b"), "v"), Some(Bytes::from("a")));
        assert_eq!(
            first_value(Some("timeout=1&timeout=2"), "timeout"),
            Some(Bytes::from("1"))
        );
    }

    #[test]
    fn test_decoding_keeps_raw_bytes() {
        assert_eq!(
            first_value(Some("v=%FF%00a"), "v"),
            Some(Bytes::from_static(&[0xFF, 0x00, b'a']))
        );
        assert_eq!(first_value(Some("v=a+b%2Bc"), "v"), Some(Bytes::from("a b+c")));
        assert_eq!(first_value(Some("%76=encoded-key"), "v"), Some(Bytes::from("encoded-key")));
    }
}
