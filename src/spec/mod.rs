//! Mix spec parsing — text → classified lines → [`Spec`].

pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;

pub use error::ParseError;
pub use model::*;

use lexer::Lexer;
use parser::Parser;

/// The spec parser.
///
/// Classifies source lines by indentation and shape, then runs the two-pass
/// block parser over them.
pub struct SpecParser;

impl SpecParser {
    /// Parse spec source text into a [`Spec`].
    pub fn parse(source: &str) -> Result<Spec, ParseError> {
        let lines = Lexer::new(source).tokenize();
        Parser::new(lines).parse()
    }
}
