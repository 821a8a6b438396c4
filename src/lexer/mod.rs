use std::iter::Peekable;
use std::str::CharIndices;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Articles
    IndefiniteArticle, DefiniteArticle, SomeKeyword,

    // Arithmetic
    Add, Subtract, Multiply, Divide, Multiplied, Divided, Plus, Minus,

    // Comparisons
    Is, Are, Not, Equal, Smaller, Bigger, Less, Greater, Than, At, Most, Least,

    // Statements
    If, Then, Put, Let, ResultKeyword, Return, Define, As, Has, With,

    // Prepositions
    To, From, By, Into, In, Of, And,

    // Literals
    Null, Inch, IntLiteral, StringLiteral, ByteArrayLiteral, RatioLiteral,

    // Identifiers
    Identifier,

    // Punctuation
    Dot, Semicolon, Comma, Colon, Arrow, Possessive, Comment,

    // Special
    Whitespace, Error, End,
}

/// Every word the lexer classifies as a keyword, in lowercase.
pub const KEYWORDS: &[&str] = &[
    "a", "an", "the", "some",
    "add", "subtract", "multiply", "divide", "multiplied", "divided", "plus", "minus",
    "is", "are", "not", "equal", "equals", "smaller", "bigger", "less", "greater",
    "than", "at", "most", "least",
    "if", "then", "put", "let", "result", "return", "define", "as", "has", "with",
    "to", "from", "by", "into", "in", "of", "and",
    "null", "nil", "inch", "inches",
];

impl TokenKind {
    /// Classify a whole word. A capitalized keyword (`The`, `If`) is the
    /// same keyword; anything else is left to the identifier pattern.
    pub fn from_keyword(word: &str) -> Option<TokenKind> {
        let lowered = lowercase_initial(word);
        let kind = match lowered.as_str() {
            "a" | "an" => TokenKind::IndefiniteArticle,
            "the" => TokenKind::DefiniteArticle,
            "some" => TokenKind::SomeKeyword,
            "add" => TokenKind::Add,
            "subtract" => TokenKind::Subtract,
            "multiply" => TokenKind::Multiply,
            "divide" => TokenKind::Divide,
            "multiplied" => TokenKind::Multiplied,
            "divided" => TokenKind::Divided,
            "plus" => TokenKind::Plus,
            "minus" => TokenKind::Minus,
            "is" => TokenKind::Is,
            "are" => TokenKind::Are,
            "not" => TokenKind::Not,
            "equal" | "equals" => TokenKind::Equal,
            "smaller" => TokenKind::Smaller,
            "bigger" => TokenKind::Bigger,
            "less" => TokenKind::Less,
            "greater" => TokenKind::Greater,
            "than" => TokenKind::Than,
            "at" => TokenKind::At,
            "most" => TokenKind::Most,
            "least" => TokenKind::Least,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "put" => TokenKind::Put,
            "let" => TokenKind::Let,
            "result" => TokenKind::ResultKeyword,
            "return" => TokenKind::Return,
            "define" => TokenKind::Define,
            "as" => TokenKind::As,
            "has" => TokenKind::Has,
            "with" => TokenKind::With,
            "to" => TokenKind::To,
            "from" => TokenKind::From,
            "by" => TokenKind::By,
            "into" => TokenKind::Into,
            "in" => TokenKind::In,
            "of" => TokenKind::Of,
            "and" => TokenKind::And,
            "null" | "nil" => TokenKind::Null,
            "inch" | "inches" => TokenKind::Inch,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_keyword(self) -> bool {
        !matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::StringLiteral
                | TokenKind::ByteArrayLiteral
                | TokenKind::RatioLiteral
                | TokenKind::Identifier
                | TokenKind::Dot
                | TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::Arrow
                | TokenKind::Possessive
                | TokenKind::Comment
                | TokenKind::Whitespace
                | TokenKind::Error
                | TokenKind::End
        )
    }

    /// Words are what marker phrases are made of.
    pub fn is_word(self) -> bool {
        self == TokenKind::Identifier || self.is_keyword()
    }

    pub fn is_terminator(self) -> bool {
        matches!(self, TokenKind::Dot | TokenKind::Semicolon)
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::StringLiteral
                | TokenKind::ByteArrayLiteral
                | TokenKind::RatioLiteral
                | TokenKind::Null
        )
    }

    /// Human readable name used in "expected ..." diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::IndefiniteArticle => "'a' or 'an'",
            TokenKind::DefiniteArticle => "'the'",
            TokenKind::SomeKeyword => "'some'",
            TokenKind::Add => "'add'",
            TokenKind::Subtract => "'subtract'",
            TokenKind::Multiply => "'multiply'",
            TokenKind::Divide => "'divide'",
            TokenKind::Multiplied => "'multiplied'",
            TokenKind::Divided => "'divided'",
            TokenKind::Plus => "'plus'",
            TokenKind::Minus => "'minus'",
            TokenKind::Is => "'is'",
            TokenKind::Are => "'are'",
            TokenKind::Not => "'not'",
            TokenKind::Equal => "'equal'",
            TokenKind::Smaller => "'smaller'",
            TokenKind::Bigger => "'bigger'",
            TokenKind::Less => "'less'",
            TokenKind::Greater => "'greater'",
            TokenKind::Than => "'than'",
            TokenKind::At => "'at'",
            TokenKind::Most => "'most'",
            TokenKind::Least => "'least'",
            TokenKind::If => "'if'",
            TokenKind::Then => "'then'",
            TokenKind::Put => "'put'",
            TokenKind::Let => "'let'",
            TokenKind::ResultKeyword => "'result'",
            TokenKind::Return => "'return'",
            TokenKind::Define => "'define'",
            TokenKind::As => "'as'",
            TokenKind::Has => "'has'",
            TokenKind::With => "'with'",
            TokenKind::To => "'to'",
            TokenKind::From => "'from'",
            TokenKind::By => "'by'",
            TokenKind::Into => "'into'",
            TokenKind::In => "'in'",
            TokenKind::Of => "'of'",
            TokenKind::And => "'and'",
            TokenKind::Null => "'null'",
            TokenKind::Inch => "'inch'",
            TokenKind::IntLiteral => "number",
            TokenKind::StringLiteral => "string",
            TokenKind::ByteArrayLiteral => "byte array",
            TokenKind::RatioLiteral => "ratio",
            TokenKind::Identifier => "identifier",
            TokenKind::Dot => "'.'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Arrow => "'->'",
            TokenKind::Possessive => "'s",
            TokenKind::Comment => "comment",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Error => "unrecognised input",
            TokenKind::End => "end of input",
        }
    }
}

fn lowercase_initial(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() && chars.clone().all(|c| !c.is_uppercase()) => {
            first.to_lowercase().chain(chars).collect()
        }
        _ => word.to_string(),
    }
}

/// A classified slice of the input. `start` and `end` are byte offsets
/// into the whole document, even when only a paragraph was lexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, start: usize, end: usize) -> Self {
        Token { kind, text: text.to_string(), start, end }
    }

    pub fn is_trivia(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }
}

/// Lazy token stream. Cloning a lexer restarts it from the same place.
#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    input: Peekable<CharIndices<'a>>,
    offset: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer::with_offset(source, 0)
    }

    /// Lex a slice that starts `offset` bytes into a larger document.
    pub fn with_offset(source: &'a str, offset: usize) -> Self {
        Lexer {
            source,
            input: source.char_indices().peekable(),
            offset,
            done: false,
        }
    }

    /// Every token including whitespace, ending with a single `End`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        self.by_ref().collect()
    }

    /// The tokens grammar rules look at: whitespace dropped, `End` kept.
    pub fn significant(&mut self) -> Vec<Token> {
        self.by_ref().filter(|t| !t.is_trivia()).collect()
    }

    fn position(&mut self) -> usize {
        self.input.peek().map(|&(i, _)| i).unwrap_or(self.source.len())
    }

    fn advance(&mut self) -> Option<char> {
        self.input.next().map(|(_, c)| c)
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.input.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.advance();
        }
    }

    /// Parenthesised text, nesting allowed.
    fn read_comment(&mut self) -> TokenKind {
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match self.advance() {
                Some('(') => depth += 1,
                Some(')') => depth -= 1,
                Some(_) => {}
                None => return TokenKind::Error,
            }
        }
        TokenKind::Comment
    }

    fn read_string(&mut self) -> TokenKind {
        self.advance();
        loop {
            match self.advance() {
                Some('"') => return TokenKind::StringLiteral,
                Some(_) => {}
                None => return TokenKind::Error,
            }
        }
    }

    fn read_bytes(&mut self) -> TokenKind {
        self.advance();
        if !self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            return TokenKind::Error;
        }
        self.skip_while(|c| c.is_ascii_hexdigit());
        TokenKind::ByteArrayLiteral
    }

    fn read_number(&mut self) -> TokenKind {
        self.skip_while(|c| c.is_ascii_digit());
        if self.peek() == Some('/') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.skip_while(|c| c.is_ascii_digit());
            return TokenKind::RatioLiteral;
        }
        TokenKind::IntLiteral
    }

    fn read_word(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else if ch == '-' && self.peek_second().is_some_and(|c| c.is_alphanumeric()) {
                // zero-index is one word, height-> is a word and an arrow
                self.advance();
            } else {
                break;
            }
        }
        let end = self.position();
        TokenKind::from_keyword(&self.source[start..end]).unwrap_or(TokenKind::Identifier)
    }

    fn read_possessive(&mut self) -> TokenKind {
        self.advance();
        let is_possessive = matches!(self.peek(), Some('s') | Some('S'))
            && !self.peek_second().is_some_and(|c| c.is_alphanumeric());
        if is_possessive {
            self.advance();
            TokenKind::Possessive
        } else {
            TokenKind::Error
        }
    }

    fn next_kind(&mut self, start: usize, ch: char) -> TokenKind {
        match ch {
            c if c.is_whitespace() => {
                self.skip_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            '.' => { self.advance(); TokenKind::Dot }
            ';' => { self.advance(); TokenKind::Semicolon }
            ',' => { self.advance(); TokenKind::Comma }
            ':' => { self.advance(); TokenKind::Colon }
            '-' => {
                self.advance();
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    TokenKind::Error
                }
            }
            '\'' | '\u{2019}' => self.read_possessive(),
            '(' => self.read_comment(),
            '"' => self.read_string(),
            '$' => self.read_bytes(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_word(start),
            _ => {
                self.advance();
                TokenKind::Error
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let Some((start, ch)) = self.input.peek().copied() else {
            self.done = true;
            let end = self.offset + self.source.len();
            return Some(Token::new(TokenKind::End, "", end, end));
        };
        let kind = self.next_kind(start, ch);
        let end = self.position();
        Some(Token::new(
            kind,
            &self.source[start..end],
            self.offset + start,
            self.offset + end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).significant().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keyword_wins_only_for_whole_words() {
        assert_eq!(
            kinds("then theory something some"),
            vec![
                TokenKind::Then,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::SomeKeyword,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_capitalized_keywords() {
        assert_eq!(
            kinds("The If To A An Define"),
            vec![
                TokenKind::DefiniteArticle,
                TokenKind::If,
                TokenKind::To,
                TokenKind::IndefiniteArticle,
                TokenKind::IndefiniteArticle,
                TokenKind::Define,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_multi_word_names_stay_separate_tokens() {
        let tokens = Lexer::new("a fill colour").significant();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].text, "fill");
        assert_eq!(tokens[2].text, "colour");
    }

    #[test]
    fn test_tokens_cover_input_without_gaps() {
        let source = "the width is a number.\n  add 42 to a value; (note) \"x y\"";
        let tokens = Lexer::new(source).tokenize();
        let mut expected_start = 0;
        for token in &tokens {
            assert_eq!(token.start, expected_start, "gap before {:?}", token);
            assert_eq!(&source[token.start..token.end], token.text);
            expected_start = token.end;
        }
        assert_eq!(expected_start, source.len());
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::End));
    }

    #[test]
    fn test_offsets_are_document_relative() {
        let tokens = Lexer::with_offset("a value", 10).significant();
        assert_eq!(tokens[0].start, 10);
        assert_eq!(tokens[1].start, 12);
        assert_eq!(tokens[1].end, 17);
        assert_eq!(tokens[2].kind, TokenKind::End);
        assert_eq!(tokens[2].start, 17);
    }

    #[test]
    fn test_unmatched_input_becomes_error_token() {
        let tokens = Lexer::new("add # to \"open").significant();
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].text, "#");
        assert_eq!(tokens[3].kind, TokenKind::Error);
        assert_eq!(tokens[3].text, "\"open");
        assert_eq!(tokens[4].kind, TokenKind::End);
    }

    #[test]
    fn test_punctuation_and_hyphenated_words() {
        assert_eq!(
            kinds("a rectangle's zero-index height-> x: y, z;"),
            vec![
                TokenKind::IndefiniteArticle,
                TokenKind::Identifier,
                TokenKind::Possessive,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::End,
            ]
        );
        let tokens = Lexer::new("zero-index").significant();
        assert_eq!(tokens[0].text, "zero-index");
    }

    #[test]
    fn test_nested_comment_is_one_token() {
        let tokens = Lexer::new("calculate (the (inner) part). done").significant();
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text, "(the (inner) part)");
        assert_eq!(tokens[2].kind, TokenKind::Dot);
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds("42 \"a. b\" $0A0B 3/4 null 5 inches"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::StringLiteral,
                TokenKind::ByteArrayLiteral,
                TokenKind::RatioLiteral,
                TokenKind::Null,
                TokenKind::IntLiteral,
                TokenKind::Inch,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_end_is_emitted_once() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::End));
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_clone_restarts_from_same_position() {
        let mut lexer = Lexer::new("put 5 into a value");
        lexer.next();
        let rest: Vec<Token> = lexer.clone().collect();
        let again: Vec<Token> = lexer.collect();
        assert_eq!(rest, again);
    }
}
