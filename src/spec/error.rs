//! Error types for the spec parser.

use thiserror::Error;

/// A fatal parse failure. Everything else in the grammar is skipped leniently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("No target section found in spec file")]
    MissingTarget,

    #[error("Target section at line {line} declares no instruments")]
    EmptyTarget { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_target_message() {
        assert_eq!(
            ParseError::MissingTarget.to_string(),
            "No target section found in spec file"
        );
    }

    #[test]
    fn empty_target_mentions_line() {
        let msg = ParseError::EmptyTarget { line: 7 }.to_string();
        assert!(msg.contains("line 7"), "got: {msg}");
    }
}
