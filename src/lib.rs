//! EngLang: code written as English prose.
//!
//! Text goes through the lexer, the segmenter and the grammar parser (with a
//! regex fallback) into a closed AST, which the converters turn into C# or
//! JavaScript and the VM can execute.

pub mod codegen;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod lexer;
pub mod parser;
pub mod segmenter;
pub mod vm;

pub use codegen::{ConvertError, Converter, Target};
pub use config::{Config, ParserConfig};
pub use errors::ParseError;
pub use parser::ast::{Expression, NodeRef, ParagraphList, Statement, SyntaxNode};
pub use segmenter::Segmenter;
pub use vm::{RuntimeError, Value, Vm};

/// Parse with the default configuration.
///
/// Text containing `.` or `;` always parses into a `ParagraphList`, with
/// unrecognized sentences kept as `Invalid` statements. Anything else is a
/// single fragment and fails on the first token no rule accepts.
pub fn parse(text: &str) -> Result<SyntaxNode, ParseError> {
    parse_with(text, &ParserConfig::default())
}

pub fn parse_with(text: &str, config: &ParserConfig) -> Result<SyntaxNode, ParseError> {
    Segmenter::new(config).parse(text)
}

/// Document mode regardless of terminators. Never fails.
pub fn parse_document(text: &str) -> ParagraphList {
    Segmenter::new(&ParserConfig::default()).parse_document(text)
}
