use regex::Regex;
use std::sync::OnceLock;

fn whitespace_runs() -> &'static Regex {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Collapses every whitespace run to one space and trims both ends.
pub fn clean_text(text: &str) -> String {
    whitespace_runs().replace_all(text, " ").trim().to_string()
}

/// Decodes `bytes` as UTF-8, dropping invalid sequences, then cleans the result.
pub fn clean_bytes(bytes: &[u8]) -> String {
    clean_text(&decode_lossy(bytes))
}

/// UTF-8 decode that skips undecodable bytes instead of substituting U+FFFD.
pub fn decode_lossy(mut bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());

    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                decoded.push_str(valid);
                return decoded;
            }
            Err(error) => {
                let (valid, rest) = bytes.split_at(error.valid_up_to());
                // valid_up_to guarantees this prefix decodes
                decoded.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match error.error_len() {
                    Some(skip) => bytes = &rest[skip..],
                    None => return decoded,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_runs_collapse_and_ends_are_trimmed() {
        assert_eq!(clean_text("  Hello\n\nWorld  "), "Hello World");
        assert_eq!(clean_text("A  \t  lot\nof   spacing"), "A lot of spacing");
    }

    #[test]
    fn unicode_whitespace_is_collapsed() {
        assert_eq!(clean_text("a\u{a0}\u{2003}b"), "a b");
    }

    #[test]
    fn blank_input_cleans_to_empty() {
        assert_eq!(clean_text(" \n\t "), "");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn invalid_bytes_are_dropped_not_replaced() {
        let bytes = b"caf\xc3\xa9 \xff\xfeok\n\xe2\x82";
        assert_eq!(decode_lossy(bytes), "café ok\n");
        assert_eq!(clean_bytes(bytes), "café ok");
    }
}
