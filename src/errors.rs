use std::fmt::Write as _;

use thiserror::Error;

use crate::lexer::{Token, TokenKind, KEYWORDS};

/// Line and column (both from 1) of a byte offset, with the line's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub line_content: String,
}

/// A grammar rule could not consume the input. Carries the first token
/// no alternative could get past.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    pub found: Option<String>,
    pub expected: Vec<&'static str>,
    pub suggestion: Option<String>,
}

impl ParseError {
    pub fn new(message: &str, offset: usize) -> Self {
        ParseError {
            message: message.to_string(),
            offset,
            found: None,
            expected: Vec::new(),
            suggestion: None,
        }
    }

    /// Mismatch at `token` after every alternative in `expected` failed.
    pub fn mismatch(token: &Token, expected: &[&'static str]) -> Self {
        let found = match token.kind {
            TokenKind::End => TokenKind::End.describe().to_string(),
            _ => format!("'{}'", token.text),
        };
        let message = if expected.is_empty() {
            format!("Unexpected {}", found)
        } else {
            format!("Expected {} but found {}", expected.join(" or "), found)
        };
        let mut err = ParseError::new(&message, token.start).with_expected(expected);
        err.found = Some(token.text.clone());
        if token.kind == TokenKind::Identifier {
            if let Some(suggestion) = find_similar_keyword(&token.text, KEYWORDS) {
                err = err.with_suggestion(&suggestion);
            }
        }
        err
    }

    pub fn with_expected(mut self, expected: &[&'static str]) -> Self {
        self.expected = expected.to_vec();
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    /// Compiler style report with the offending line and a caret.
    pub fn render(&self, source: &SourceFile) -> String {
        render_diagnostic("error", &self.message, &source.locate(self.offset), self.suggestion.as_deref())
    }
}

/// Shared by parse errors and the CLI's invalid statement warnings.
pub fn render_diagnostic(
    severity: &str,
    message: &str,
    loc: &SourceLocation,
    suggestion: Option<&str>,
) -> String {
    const RED: &str = "\x1b[1;31m";
    const BLUE: &str = "\x1b[1;34m";
    const YELLOW: &str = "\x1b[1;33m";
    const GREEN: &str = "\x1b[1;32m";
    const RESET: &str = "\x1b[0m";
    const BOLD: &str = "\x1b[1m";

    let color = if severity == "error" { RED } else { YELLOW };
    let mut out = String::new();
    let _ = writeln!(out, "{}{}{}: {}{}{}", color, severity, RESET, BOLD, message, RESET);
    let _ = writeln!(out, "  {}-->{} {}:{}:{}", BLUE, RESET, loc.file, loc.line, loc.column);

    let gutter = loc.line.to_string().len();
    let _ = writeln!(out, "  {:width$} {}|{}", "", BLUE, RESET, width = gutter);
    let _ = writeln!(out, "  {}{}{} {}|{} {}", BLUE, loc.line, RESET, BLUE, RESET, loc.line_content.trim_end());
    let spaces = " ".repeat(loc.column.saturating_sub(1));
    let _ = writeln!(
        out,
        "  {:width$} {}|{} {}{}^--- here{}",
        "", BLUE, RESET, spaces, color, RESET, width = gutter
    );

    if let Some(suggestion) = suggestion {
        let _ = writeln!(out, "  {}help{}: did you mean `{}{}{}`?", GREEN, RESET, YELLOW, suggestion, RESET);
    }
    out
}

/// Case-insensitive edit distance over characters.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

/// Closest keyword within a small edit distance, if `word` looks like a
/// misspelling of one.
pub fn find_similar_keyword(word: &str, keywords: &[&str]) -> Option<String> {
    // two letters or less is a name, not a typo
    if word.len() <= 2 {
        return None;
    }
    let lowered = word.to_lowercase();
    if keywords.contains(&lowered.as_str()) {
        return None;
    }
    let limit = if word.len() >= 4 { 2 } else { 1 };
    keywords
        .iter()
        .filter(|keyword| word.len().abs_diff(keyword.len()) <= 2)
        .map(|&keyword| (keyword, levenshtein_distance(&lowered, keyword)))
        .filter(|&(_, distance)| distance <= limit)
        .min_by_key(|&(_, distance)| distance)
        .map(|(keyword, _)| keyword.to_string())
}

/// A named document, for turning byte offsets into locations.
pub struct SourceFile {
    pub filename: String,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(filename: &str, content: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        SourceFile { filename: filename.to_string(), text: content.to_string(), line_starts }
    }

    /// Text of a 1-based line without its line break.
    pub fn line(&self, number: usize) -> Option<&str> {
        let start = *self.line_starts.get(number.checked_sub(1)?)?;
        let end = self.line_starts.get(number).map_or(self.text.len(), |&next| next - 1);
        Some(self.text[start..end].trim_end_matches('\r'))
    }

    /// Columns count characters, so multi-byte text still lines up.
    pub fn locate(&self, offset: usize) -> SourceLocation {
        let index = self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let content = self.line(index + 1).unwrap_or("");
        let within = offset.saturating_sub(self.line_starts[index]).min(content.len());
        let column = content.char_indices().take_while(|&(i, _)| i < within).count() + 1;
        SourceLocation {
            file: self.filename.clone(),
            line: index + 1,
            column,
            line_content: content.to_string(),
        }
    }
}
