use crate::config::ParserConfig;
use crate::errors::ParseError;
use crate::fallback;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::parser::ast::*;
use crate::parser::{invalid_statement, EntryRule, Fragment, Parser};

/// Splits a document into paragraphs and fragments and routes each
/// fragment through the grammar, then the fallback, then `Invalid`.
pub struct Segmenter<'c> {
    config: &'c ParserConfig,
    strict: bool,
}

impl<'c> Segmenter<'c> {
    pub fn new(config: &'c ParserConfig) -> Self {
        Segmenter { config, strict: false }
    }

    /// Rejected fragments become errors instead of `Invalid` statements.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Text with a `.` or `;` is a document; anything else is parsed as a
    /// single fragment and may fail.
    pub fn parse(&self, text: &str) -> Result<SyntaxNode, ParseError> {
        let cleaned = strip_comment_lines(text, self.config.comment_marker);
        let tokens = Lexer::new(&cleaned).significant();
        if tokens.iter().any(|t| t.kind.is_terminator()) {
            return Ok(SyntaxNode::ParagraphList(self.parse_document(text)));
        }
        let Some(first) = tokens.first().filter(|t| t.kind != TokenKind::End) else {
            return Ok(SyntaxNode::ParagraphList(ParagraphList {
                paragraphs: Vec::new(),
                range: Range::new(0, text.len()),
            }));
        };
        match EntryRule::for_token(first) {
            Some(entry) if entry.is_statement_only() => {
                log::debug!("single {:?} fragment, parsing as a strict document", entry);
                Segmenter::new(self.config).strict().document(text).map(SyntaxNode::ParagraphList)
            }
            _ => Parser::new(&tokens, self.config).node(),
        }
    }

    /// Document mode. Never fails unless the segmenter is strict.
    pub fn parse_document(&self, text: &str) -> ParagraphList {
        match self.document(text) {
            Ok(list) => list,
            Err(err) => {
                // only reachable in strict mode; keep the text as one invalid paragraph
                log::warn!("document rejected: {}", err);
                let tokens: Vec<Token> = Lexer::new(text).significant();
                let statement = invalid_statement(&tokens);
                ParagraphList {
                    paragraphs: vec![Paragraph {
                        range: statement.range(),
                        statements: vec![statement],
                        label: None,
                    }],
                    range: Range::new(0, text.len()),
                }
            }
        }
    }

    fn document(&self, text: &str) -> Result<ParagraphList, ParseError> {
        let cleaned = strip_comment_lines(text, self.config.comment_marker);
        let mut paragraphs = Vec::new();
        for range in split_paragraphs(text) {
            log::trace!("paragraph at {}..{}", range.start, range.end);
            paragraphs.push(self.paragraph(&cleaned, range)?);
        }
        Ok(ParagraphList { paragraphs, range: Range::new(0, text.len()) })
    }

    fn paragraph(&self, document: &str, range: Range) -> Result<Paragraph, ParseError> {
        let tokens: Vec<Token> = Lexer::with_offset(&document[range.start..range.end], range.start)
            .significant()
            .into_iter()
            .filter(|t| t.kind != TokenKind::End)
            .collect();

        let mut builder = ParagraphBuilder::default();
        for fragment in split_fragments(&tokens) {
            log::trace!("fragment at {}..{}", fragment[0].start, fragment[fragment.len() - 1].end);
            match self.fragment(document, fragment)? {
                Fragment::Statement(statement) => builder.statement(statement),
                Fragment::Label { label, body } => {
                    let body = match body {
                        Some(body) => Some(self.body(document, &body)?),
                        None => None,
                    };
                    builder.label(label, body);
                }
            }
        }
        Ok(builder.finish(range))
    }

    /// Label bodies run through the same chain; a nested label becomes a
    /// labeled statement.
    fn body(&self, document: &str, tokens: &[Token]) -> Result<Statement, ParseError> {
        match self.fragment(document, tokens)? {
            Fragment::Statement(statement) => Ok(statement),
            Fragment::Label { label, body } => {
                let statement = match body {
                    Some(body) => self.body(document, &body)?,
                    None => Statement::Block { statements: Vec::new(), range: label.range },
                };
                let range = label.range.cover(statement.range());
                Ok(Statement::Labeled { label, statement: Box::new(statement), range })
            }
        }
    }

    fn fragment(&self, document: &str, tokens: &[Token]) -> Result<Fragment, ParseError> {
        let err = match Parser::new(tokens, self.config).fragment() {
            Ok(fragment) => return Ok(fragment),
            Err(err) if self.strict => return Err(err),
            Err(err) => err,
        };
        let range = Range::new(tokens[0].start, tokens[tokens.len() - 1].end);
        let text = &document[range.start..range.end];
        log::debug!("grammar rejected '{}': {}", text, err);

        if self.config.fallback {
            match fallback::parse_statement(text, range) {
                Ok(statement) => {
                    log::debug!("fallback parsed '{}' as {}", text, statement.kind_name());
                    return Ok(Fragment::Statement(statement));
                }
                Err(failure) => log::debug!("{}", failure),
            }
        }
        log::warn!("invalid statement at {}..{}: {}", range.start, range.end, text);
        Ok(Fragment::Statement(invalid_statement(tokens)))
    }
}

/// Label placement within one paragraph.
#[derive(Default)]
struct ParagraphBuilder {
    label: Option<InvokableLabel>,
    statements: Vec<Statement>,
    label_open: bool,
}

impl ParagraphBuilder {
    fn statement(&mut self, statement: Statement) {
        self.statements.push(statement);
        self.label_open = false;
    }

    fn label(&mut self, label: InvokableLabel, body: Option<Statement>) {
        let heads_paragraph = self.statements.is_empty() && (self.label.is_none() || self.label_open);
        if !heads_paragraph {
            let statement = body.unwrap_or(Statement::Block { statements: Vec::new(), range: label.range });
            let range = label.range.cover(statement.range());
            self.statement(Statement::Labeled { label, statement: Box::new(statement), range });
            return;
        }

        match self.label.as_mut() {
            Some(existing) => {
                existing.markers.extend(label.markers);
                if existing.parameters.is_empty() {
                    existing.parameters = label.parameters;
                }
                if existing.result.is_none() {
                    existing.result = label.result;
                }
                existing.range = existing.range.cover(label.range);
            }
            None => self.label = Some(label),
        }
        self.label_open = body.is_none();
        if let Some(body) = body {
            self.statement(body);
        }
    }

    fn finish(self, range: Range) -> Paragraph {
        Paragraph { statements: self.statements, label: self.label, range }
    }
}

/// Trimmed ranges of blank-line separated chunks. Whitespace-only lines
/// count as blank.
pub fn split_paragraphs(text: &str) -> Vec<Range> {
    let mut paragraphs = Vec::new();
    let mut chunk: Option<(usize, usize)> = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        if line.trim().is_empty() {
            if let Some((start, end)) = chunk.take() {
                paragraphs.push(trimmed(text, start, end));
            }
        } else {
            chunk = Some((chunk.map_or(start, |(first, _)| first), offset));
        }
    }
    if let Some((start, end)) = chunk {
        paragraphs.push(trimmed(text, start, end));
    }
    paragraphs
}

fn trimmed(text: &str, start: usize, end: usize) -> Range {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    Range::new(start + leading, end - trailing)
}

/// Blank out full-line comments. Every byte of a comment line becomes a
/// space, so offsets into the result match the input.
pub fn strip_comment_lines(text: &str, marker: char) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if !line.trim_start().starts_with(marker) {
            out.push_str(line);
            continue;
        }
        for ch in line.chars() {
            match ch {
                '\n' | '\r' => out.push(ch),
                _ => out.extend(std::iter::repeat(' ').take(ch.len_utf8())),
            }
        }
    }
    out
}

/// Sentences end at `.`; a sentence is further split on `;` unless it is
/// an `if`, whose `;` belong to its branch.
pub fn split_fragments(tokens: &[Token]) -> Vec<&[Token]> {
    let mut fragments = Vec::new();
    for sentence in tokens.split(|t| t.kind == TokenKind::Dot) {
        if sentence.first().is_some_and(|t| t.kind == TokenKind::If) {
            fragments.push(sentence);
            continue;
        }
        fragments.extend(sentence.split(|t| t.kind == TokenKind::Semicolon));
    }
    fragments.retain(|fragment| !fragment.is_empty());
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(text: &str) -> ParagraphList {
        let config = ParserConfig::default();
        Segmenter::new(&config).parse_document(text)
    }

    #[test]
    fn test_paragraph_count_matches_blank_line_chunks() {
        let text = "the width is a number.\nthe height is a number.\n\n   \n\nadd 1 to a width.\n\n";
        let list = document(text);
        assert_eq!(list.paragraphs.len(), 2);
        assert_eq!(list.paragraphs[0].statements.len(), 2);
        let range = list.paragraphs[1].range;
        assert_eq!(&text[range.start..range.end], "add 1 to a width.");
    }

    #[test]
    fn test_fragments_split_on_dot_and_semicolon() {
        let list = document("add 42 to a value; subtract 42 from a value; multiply a value by 42; divide a value by 42.");
        let paragraph = &list.paragraphs[0];
        let kinds: Vec<&str> = paragraph
            .statements
            .iter()
            .map(|s| match s {
                Statement::Expression { expression, .. } => expression.kind_name(),
                other => other.kind_name(),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "in-place addition expression",
                "in-place subtract expression",
                "in-place multiply expression",
                "in-place division expression",
            ]
        );
    }

    #[test]
    fn test_if_sentence_keeps_its_semicolons() {
        let list = document("if a number is 0 then add 1 to a value; return 1.");
        assert_eq!(list.paragraphs[0].statements.len(), 1);
        assert!(matches!(list.paragraphs[0].statements[0], Statement::If { .. }));
    }

    #[test]
    fn test_bad_fragment_is_contained() {
        let list = document("the width is a number. 42 is nonsense here. add 1 to a width.");
        let statements = &list.paragraphs[0].statements;
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[1].invalid_text().as_deref(), Some("42 is nonsense here"));
        assert_eq!(list.invalid_statements().len(), 1);
    }

    #[test]
    fn test_label_heads_paragraph() {
        let text = "the width is a number.\n\nTo calculate area from a width and a height ->\n  result is a width multiplied by a height.";
        let list = document(text);
        assert_eq!(list.paragraphs.len(), 2);
        let label = list.paragraphs[1].label.as_ref().unwrap();
        assert_eq!(label.marker(), "calculate area from");
        let parameters: Vec<&str> = label.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(parameters, vec!["width", "height"]);
        assert!(matches!(list.paragraphs[1].statements[0], Statement::Result { .. }));
    }

    #[test]
    fn test_alias_labels_merge() {
        let list = document("to do something else with a parameter identi; to do something a parameter identi: result is 1.");
        let paragraph = &list.paragraphs[0];
        let label = paragraph.label.as_ref().unwrap();
        assert_eq!(label.markers, vec!["do something else with", "do something"]);
        assert_eq!(paragraph.statements.len(), 1);
    }

    #[test]
    fn test_later_label_is_a_statement() {
        let list = document("add 1 to a value. to finish: return 1.");
        let paragraph = &list.paragraphs[0];
        assert!(paragraph.label.is_none());
        match &paragraph.statements[1] {
            Statement::Labeled { label, statement, .. } => {
                assert_eq!(label.marker(), "finish");
                assert!(matches!(**statement, Statement::Result { .. }));
            }
            other => panic!("Expected LabeledStatement, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_lines_are_blanked() {
        let text = "\\ a note about\nthe width is a number.";
        assert_eq!(strip_comment_lines(text, '\\').len(), text.len());
        let list = document(text);
        assert_eq!(list.paragraphs.len(), 1);
        assert_eq!(list.paragraphs[0].statements.len(), 1);
        assert_eq!(list.paragraphs[0].statements[0].range(), Range::new(15, 36));

        let config = ParserConfig { comment_marker: '#', ..ParserConfig::default() };
        let list = Segmenter::new(&config).parse_document("# heading\nthe width is a number.");
        assert_eq!(list.invalid_statements().len(), 0);
    }

    #[test]
    fn test_comment_only_paragraph_is_kept() {
        let list = document("add 1 to a value.\n\n\\ nothing here\n\nadd 2 to a value.");
        assert_eq!(list.paragraphs.len(), 3);
        assert!(list.paragraphs[1].statements.is_empty());
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let text = "a rectangle has a width, a height and a fill colour.\n\nif a flag is set, exit.";
        assert_eq!(document(text), document(text));
    }

    #[test]
    fn test_single_fragment_mode() {
        let config = ParserConfig::default();
        let segmenter = Segmenter::new(&config);
        assert!(matches!(segmenter.parse("an apple"), Ok(SyntaxNode::IdentifierReference(_))));
        assert!(matches!(segmenter.parse("the name is a string"), Ok(SyntaxNode::VariableDeclaration(_))));
        assert!(matches!(segmenter.parse("to initialize terminal: "), Ok(SyntaxNode::ParagraphList(_))));
        assert!(matches!(segmenter.parse("the name is an apple."), Ok(SyntaxNode::ParagraphList(_))));
        let err = segmenter.parse("if a number").unwrap_err();
        assert_eq!(err.found.as_deref(), Some(""));
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let text = "the answer to all things is a number equal to 42.";
        assert!(matches!(
            document(text).paragraphs[0].statements[0],
            Statement::VariableDeclaration { .. }
        ));
        let config = ParserConfig { fallback: false, ..ParserConfig::default() };
        let list = Segmenter::new(&config).parse_document(text);
        assert!(matches!(list.paragraphs[0].statements[0], Statement::Invalid { .. }));
    }
}
