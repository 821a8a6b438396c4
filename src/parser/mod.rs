pub mod ast;
mod expressions;
mod labels;
mod statements;

use std::collections::HashMap;

use crate::config::ParserConfig;
use crate::errors::ParseError;
use crate::lexer::{Token, TokenKind};
use ast::*;

/// Grammar entry rule picked from the first token of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRule {
    Reference,
    Declaration,
    Expression,
    If,
    Labeled,
    Result,
    Invocation,
}

impl EntryRule {
    pub fn for_token(token: &Token) -> Option<EntryRule> {
        match token.kind {
            TokenKind::IndefiniteArticle => Some(EntryRule::Reference),
            TokenKind::DefiniteArticle => Some(EntryRule::Declaration),
            TokenKind::Add
            | TokenKind::Subtract
            | TokenKind::Multiply
            | TokenKind::Divide
            | TokenKind::Put
            | TokenKind::Let => Some(EntryRule::Expression),
            TokenKind::If => Some(EntryRule::If),
            TokenKind::To | TokenKind::Define => Some(EntryRule::Labeled),
            TokenKind::ResultKeyword | TokenKind::Return => Some(EntryRule::Result),
            TokenKind::Identifier => Some(EntryRule::Invocation),
            _ => None,
        }
    }

    /// Procedure headers and calls keep `(...)` comments as marker text;
    /// everywhere else they are trivia.
    pub fn keeps_comments(self) -> bool {
        matches!(self, EntryRule::Labeled | EntryRule::Invocation)
    }

    /// Entries whose single-fragment form is a whole statement rather
    /// than a bare expression or declaration.
    pub fn is_statement_only(self) -> bool {
        matches!(
            self,
            EntryRule::If | EntryRule::Labeled | EntryRule::Result | EntryRule::Invocation
        )
    }
}

/// A statement-mode fragment after reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Statement(Statement),
    /// Procedure header. `body` holds the tokens after `:`, `->` or `as`.
    Label {
        label: InvokableLabel,
        body: Option<Vec<Token>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MemoRule {
    Expression,
    Arithmetic,
}

type Rule<'c, T> = fn(&mut Parser<'c>) -> Option<T>;

/// Backtracking recursive descent over one fragment's tokens.
///
/// Rules return `None` on mismatch and leave the cursor where they found
/// it when wrapped in [`Parser::attempt`]. The furthest mismatch is kept
/// so a failed parse can report the token nothing could get past.
pub struct Parser<'c> {
    tokens: Vec<Token>,
    pos: usize,
    config: &'c ParserConfig,
    depth: usize,
    furthest: usize,
    expected: Vec<&'static str>,
    expression_memo: HashMap<(MemoRule, usize, usize), Option<(Expression, usize)>>,
    reference_memo: HashMap<(usize, usize), Option<(IdentifierReference, usize)>>,
}

impl<'c> Parser<'c> {
    /// Whitespace and `End` are dropped; a fresh `End` closes the run.
    pub fn new(tokens: &[Token], config: &'c ParserConfig) -> Self {
        let mut tokens: Vec<Token> = tokens
            .iter()
            .filter(|t| !t.is_trivia() && t.kind != TokenKind::End)
            .cloned()
            .collect();
        let end = tokens.last().map(|t| t.end).unwrap_or(0);
        tokens.push(Token::new(TokenKind::End, "", end, end));
        Parser {
            tokens,
            pos: 0,
            config,
            depth: 0,
            furthest: 0,
            expected: Vec::new(),
            expression_memo: HashMap::new(),
            reference_memo: HashMap::new(),
        }
    }

    /// Only called before any rule has run, so cursor and memo stay valid.
    fn drop_comments(&mut self) {
        if self.tokens.iter().any(|t| t.kind == TokenKind::Comment) {
            self.tokens.retain(|t| t.kind != TokenKind::Comment);
        }
    }

    fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::End)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind())
    }

    fn at_end(&self) -> bool {
        self.at(TokenKind::End)
    }

    fn end_index(&self) -> usize {
        self.tokens.len() - 1
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_end() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            self.expected(kind.describe());
            None
        }
    }

    fn eat_any(&mut self, kinds: &[TokenKind], description: &'static str) -> Option<Token> {
        if self.at_any(kinds) {
            Some(self.advance())
        } else {
            self.expected(description);
            None
        }
    }

    /// Record a mismatch at the cursor.
    fn expected(&mut self, what: &'static str) {
        if self.pos > self.furthest {
            self.furthest = self.pos;
            self.expected.clear();
        }
        if self.pos == self.furthest && !self.expected.contains(&what) {
            self.expected.push(what);
        }
    }

    /// Run `rule`, rewinding the cursor if it does not match.
    fn attempt<T>(&mut self, rule: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let saved = self.pos;
        let result = rule(self);
        if result.is_none() {
            self.pos = saved;
        }
        result
    }

    /// Ordered alternation: the first rule that matches wins.
    fn first_of<T>(&mut self, rules: &[Rule<'c, T>]) -> Option<T> {
        rules.iter().find_map(|rule| self.attempt(|p| rule(p)))
    }

    /// `rule` must consume every remaining token.
    fn complete<T>(&mut self, rule: Rule<'c, T>) -> Option<T> {
        self.attempt(|p| {
            let value = rule(p)?;
            if p.at_end() {
                Some(value)
            } else {
                p.expected(TokenKind::End.describe());
                None
            }
        })
    }

    /// Ordered alternation where only a whole-fragment match counts.
    fn first_complete<T>(&mut self, rules: &[Rule<'c, T>]) -> Option<T> {
        rules.iter().find_map(|rule| self.complete(*rule))
    }

    /// Packrat wrapper for the expression rules. Entries are keyed by depth
    /// too, since the nesting cap changes what a rule can match.
    fn memoized(&mut self, rule: MemoRule, parse: Rule<'c, Expression>) -> Option<Expression> {
        let key = (rule, self.pos, self.depth);
        if self.config.memoize {
            if let Some(entry) = self.expression_memo.get(&key).cloned() {
                return entry.map(|(expression, end)| {
                    self.pos = end;
                    expression
                });
            }
        }
        let result = self.attempt(parse);
        if self.config.memoize {
            let entry = result.as_ref().map(|e| (e.clone(), self.pos));
            self.expression_memo.insert(key, entry);
        }
        result
    }

    /// Guard for rules that recurse into themselves.
    fn nested<T>(&mut self, rule: Rule<'c, T>) -> Option<T> {
        if self.depth >= self.config.max_depth {
            self.expected("shallower nesting");
            return None;
        }
        self.depth += 1;
        let result = self.attempt(rule);
        self.depth -= 1;
        result
    }

    /// Range from token `start` up to the last consumed token.
    fn range_from(&self, start: usize) -> Range {
        let first = &self.tokens[start.min(self.end_index())];
        let last = if self.pos > start { &self.tokens[self.pos - 1] } else { first };
        Range::new(first.start, last.end.max(first.start))
    }

    pub fn error(&self) -> ParseError {
        let token = &self.tokens[self.furthest.min(self.end_index())];
        ParseError::mismatch(token, &self.expected)
    }

    /// Statement-mode parse of one fragment. The selected entry rule has
    /// to consume the whole fragment.
    pub fn fragment(&mut self) -> Result<Fragment, ParseError> {
        let Some(entry) = EntryRule::for_token(self.current()) else {
            self.expected("statement");
            return Err(self.error());
        };
        log::trace!("dispatching '{}' to {:?}", self.current().text, entry);
        if !entry.keeps_comments() {
            self.drop_comments();
        }

        let parsed = match entry {
            EntryRule::Reference => self
                .first_complete(&[
                    Self::pointer_declaration,
                    Self::shape_declaration,
                    Self::shape_with_slots,
                ])
                .map(Fragment::Statement),
            EntryRule::Declaration => self
                .first_complete(&[
                    Self::variable_declaration_statement,
                    Self::unit_alias_declaration,
                    Self::constant_declaration,
                ])
                .map(Fragment::Statement),
            EntryRule::Expression => self
                .first_complete(&[Self::in_place_arithmetic, Self::assignment])
                .map(|expression| {
                    Fragment::Statement(Statement::Expression { range: expression.range(), expression })
                }),
            EntryRule::If => self.complete(Self::if_statement).map(Fragment::Statement),
            EntryRule::Labeled => self.complete(Self::labeled_fragment),
            EntryRule::Result => self.complete(Self::result_statement).map(Fragment::Statement),
            EntryRule::Invocation => self.first_complete(&[Self::bare_label, Self::invocation]),
        };
        parsed.ok_or_else(|| self.error())
    }

    /// Single-fragment mode for text without terminators: references,
    /// declarations and expressions come back bare.
    pub fn node(&mut self) -> Result<SyntaxNode, ParseError> {
        let entry = EntryRule::for_token(self.current());
        if !entry.is_some_and(EntryRule::keeps_comments) {
            self.drop_comments();
        }
        let parsed = match entry {
            Some(EntryRule::Reference) => self
                .complete(Self::identifier_reference)
                .map(SyntaxNode::IdentifierReference)
                .or_else(|| self.complete(Self::expression).map(SyntaxNode::Expression)),
            Some(EntryRule::Declaration) => self
                .complete(Self::variable_declaration)
                .map(SyntaxNode::VariableDeclaration),
            Some(EntryRule::Expression) => self
                .first_complete(&[Self::standalone_arithmetic, Self::assignment])
                .map(SyntaxNode::Expression),
            Some(_) => None,
            None => self.complete(Self::expression).map(SyntaxNode::Expression),
        };
        match parsed {
            Some(node) => Ok(node),
            None => match self.fragment()? {
                Fragment::Statement(statement) => Ok(SyntaxNode::Statement(statement)),
                Fragment::Label { .. } => Err(ParseError::new(
                    "Procedure labels need a paragraph around them",
                    self.tokens[0].start,
                )),
            },
        }
    }

    /// Statement for a sub-run of tokens, as used for if-branches. Failures
    /// stay local as an `Invalid` statement.
    fn sub_statement(&self, tokens: &[Token]) -> (Statement, bool) {
        let mut parser = Parser::new(tokens, self.config).at_depth(self.depth + 1);
        match parser.fragment() {
            Ok(Fragment::Statement(statement)) => (statement, true),
            Ok(Fragment::Label { label, body }) => {
                let (statement, ok) = match body {
                    Some(body) => self.sub_statement(&body),
                    None => (Statement::Block { statements: Vec::new(), range: label.range }, true),
                };
                let range = label.range.cover(statement.range());
                (Statement::Labeled { label, statement: Box::new(statement), range }, ok)
            }
            Err(err) => {
                log::debug!("branch fragment rejected: {}", err);
                (invalid_statement(tokens), false)
            }
        }
    }
}

/// Wrap a token run nothing could classify.
pub fn invalid_statement(tokens: &[Token]) -> Statement {
    let tokens: Vec<Token> = tokens
        .iter()
        .filter(|t| !t.is_trivia() && t.kind != TokenKind::End)
        .cloned()
        .collect();
    let range = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => Range::new(first.start, last.end),
        _ => Range::default(),
    };
    Statement::Invalid { tokens, range }
}
