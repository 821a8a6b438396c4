mod csharp;
mod javascript;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::ast::{LogicalOperator, MathOperator, NodeRef, SyntaxNode};

pub use csharp::CSharpConverter;
pub use javascript::JavaScriptConverter;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("{kind} is not supported by the {target} converter")]
    Unsupported { kind: &'static str, target: Target },
}

/// Output language of a converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    #[value(name = "csharp")]
    CSharp,
    #[value(name = "javascript")]
    JavaScript,
}

impl Target {
    pub fn converter(self) -> Box<dyn Converter> {
        match self {
            Target::CSharp => Box::new(CSharpConverter),
            Target::JavaScript => Box::new(JavaScriptConverter),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::CSharp => write!(f, "C#"),
            Target::JavaScript => write!(f, "JavaScript"),
        }
    }
}

/// Source-to-source conversion of a parsed node.
pub trait Converter {
    fn target(&self) -> Target;

    fn convert_node(&self, node: NodeRef<'_>) -> Result<String, ConvertError>;

    fn convert(&self, node: &SyntaxNode) -> Result<String, ConvertError> {
        self.convert_node(node.as_node())
    }

    fn unsupported(&self, kind: &'static str) -> ConvertError {
        ConvertError::Unsupported { kind, target: self.target() }
    }
}

/// Line-oriented output with four-space indentation.
#[derive(Default)]
pub(crate) struct CodeWriter {
    output: String,
    indent: usize,
}

impl CodeWriter {
    pub(crate) fn new() -> Self {
        CodeWriter::default()
    }

    pub(crate) fn emit(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    pub(crate) fn push_indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn pop_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// `{` on its own line, then indent.
    pub(crate) fn open_braces(&mut self) {
        self.emit("{");
        self.push_indent();
    }

    pub(crate) fn close_braces(&mut self) {
        self.pop_indent();
        self.emit("}");
    }

    pub(crate) fn finish(self) -> String {
        self.output
    }
}

/// Names become identifiers by replacing separators with `_`.
pub fn mangle(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '-' | '(' | ')' | '\'' => '_',
            c => c,
        })
        .collect()
}

pub(crate) fn math_operator(operator: MathOperator) -> &'static str {
    match operator {
        MathOperator::Plus => "+",
        MathOperator::Minus => "-",
        MathOperator::Multiply => "*",
        MathOperator::Divide => "/",
    }
}

pub(crate) fn logical_operator(operator: LogicalOperator) -> Option<&'static str> {
    match operator {
        LogicalOperator::Equals => Some("=="),
        LogicalOperator::NotEquals => Some("!="),
        LogicalOperator::Less => Some("<"),
        LogicalOperator::LessOrEquals => Some("<="),
        LogicalOperator::Greater => Some(">"),
        LogicalOperator::GreaterOrEquals => Some(">="),
        LogicalOperator::Invalid => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle() {
        assert_eq!(mangle("fill colour"), "fill_colour");
        assert_eq!(mangle("zero-index variable"), "zero_index_variable");
        assert_eq!(mangle("factorial (recursion)"), "factorial__recursion_");
        assert_eq!(mangle("o'clock"), "o_clock");
    }

    #[test]
    fn test_writer_indents() {
        let mut writer = CodeWriter::new();
        writer.emit("void run()");
        writer.open_braces();
        writer.emit("return 1;");
        writer.close_braces();
        assert_eq!(writer.finish(), "void run()\n{\n    return 1;\n}\n");
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::default(), Target::CSharp);
        assert_eq!(Target::JavaScript.converter().target(), Target::JavaScript);
        let err = ConvertError::Unsupported { kind: "invalid statement", target: Target::JavaScript };
        assert_eq!(err.to_string(), "invalid statement is not supported by the JavaScript converter");
    }
}
