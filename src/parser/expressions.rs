use super::ast::*;
use super::{MemoRule, Parser};
use crate::lexer::TokenKind;

/// Comparator phrases, longest first. The first full match wins.
const COMPARATORS: &[(&[TokenKind], LogicalOperator)] = &[
    (&[TokenKind::Is, TokenKind::Not], LogicalOperator::NotEquals),
    (&[TokenKind::Is, TokenKind::Equal, TokenKind::To], LogicalOperator::Equals),
    (&[TokenKind::Is, TokenKind::Less, TokenKind::Than], LogicalOperator::Less),
    (&[TokenKind::Is, TokenKind::Smaller, TokenKind::Than], LogicalOperator::Less),
    (&[TokenKind::Is, TokenKind::Greater, TokenKind::Than], LogicalOperator::Greater),
    (&[TokenKind::Is, TokenKind::Bigger, TokenKind::Than], LogicalOperator::Greater),
    (&[TokenKind::Is, TokenKind::At, TokenKind::Most], LogicalOperator::LessOrEquals),
    (&[TokenKind::Is, TokenKind::At, TokenKind::Least], LogicalOperator::GreaterOrEquals),
    (&[TokenKind::Is], LogicalOperator::Equals),
    (&[TokenKind::Equal], LogicalOperator::Equals),
    (&[TokenKind::Smaller, TokenKind::Than], LogicalOperator::Less),
    (&[TokenKind::Less, TokenKind::Than], LogicalOperator::Less),
    (&[TokenKind::Greater, TokenKind::Than], LogicalOperator::Greater),
    (&[TokenKind::Bigger, TokenKind::Than], LogicalOperator::Greater),
    (&[TokenKind::At, TokenKind::Most], LogicalOperator::LessOrEquals),
    (&[TokenKind::At, TokenKind::Least], LogicalOperator::GreaterOrEquals),
];

const ARTICLES: &[TokenKind] = &[TokenKind::IndefiniteArticle, TokenKind::DefiniteArticle];

/// `add 42 to a value` and friends before they are placed.
pub(super) struct ArithmeticPhrase {
    operator: MathOperator,
    value: Expression,
    target: IdentifierReference,
    range: Range,
}

impl ArithmeticPhrase {
    fn in_place(self) -> Expression {
        let ArithmeticPhrase { operator, value, target, range } = self;
        let value = Box::new(value);
        match operator {
            MathOperator::Plus => Expression::InPlaceAddition { addend: value, target, range },
            MathOperator::Minus => Expression::InPlaceSubtract { subtrahend: value, target, range },
            MathOperator::Multiply => Expression::InPlaceMultiply { factor: value, target, range },
            MathOperator::Divide => Expression::InPlaceDivision { denominator: value, target, range },
        }
    }

    fn standalone(self) -> Expression {
        let ArithmeticPhrase { operator, value, target, range } = self;
        let value = Box::new(value);
        match operator {
            MathOperator::Plus => Expression::Addition { addend: value, target, range },
            MathOperator::Minus => Expression::Subtract { subtrahend: value, target, range },
            MathOperator::Multiply => Expression::Multiply { factor: value, target, range },
            MathOperator::Divide => Expression::Division { denominator: value, target, range },
        }
    }
}

impl<'c> Parser<'c> {
    /// One or more identifier words joined by single spaces.
    pub(super) fn long_identifier(&mut self) -> Option<(String, Range)> {
        let start = self.pos;
        let mut words = Vec::new();
        while self.at(TokenKind::Identifier) {
            words.push(self.advance().text);
        }
        if words.is_empty() {
            self.expected("identifier");
            return None;
        }
        Some((words.join(" "), self.range_from(start)))
    }

    /// `a|an <name>`, a plain use of a name.
    pub(super) fn identifier_reference(&mut self) -> Option<IdentifierReference> {
        let start = self.pos;
        self.eat(TokenKind::IndefiniteArticle)?;
        let (name, _) = self.long_identifier()?;
        Some(IdentifierReference::new(name, self.range_from(start)))
    }

    /// `(a|an|the) <name>` with any `'s <name>` suffixes and an
    /// `of <reference>` owner.
    pub(super) fn reference(&mut self) -> Option<IdentifierReference> {
        let start = self.pos;
        let key = (start, self.depth);
        if self.config.memoize {
            if let Some(entry) = self.reference_memo.get(&key).cloned() {
                return entry.map(|(reference, end)| {
                    self.pos = end;
                    reference
                });
            }
        }
        let result = self.attempt(Self::reference_uncached);
        if self.config.memoize {
            let entry = result.as_ref().map(|r| (r.clone(), self.pos));
            self.reference_memo.insert(key, entry);
        }
        result
    }

    fn reference_uncached(&mut self) -> Option<IdentifierReference> {
        let start = self.pos;
        self.eat_any(ARTICLES, "'a', 'an' or 'the'")?;
        let (name, _) = self.long_identifier()?;
        let mut reference = IdentifierReference::new(name, self.range_from(start));

        while self.at(TokenKind::Possessive) {
            let saved = self.pos;
            self.advance();
            if self.at_any(ARTICLES) {
                self.advance();
            }
            match self.long_identifier() {
                Some((name, _)) => {
                    reference = IdentifierReference {
                        name,
                        owner: Some(Box::new(reference)),
                        range: self.range_from(start),
                    };
                }
                None => {
                    self.pos = saved;
                    break;
                }
            }
        }

        if self.at(TokenKind::Of) && ARTICLES.contains(&self.peek_kind(1)) {
            let saved = self.pos;
            self.advance();
            match self.nested(Self::reference) {
                Some(owner) => reference = reference.with_root_owner(owner),
                None => self.pos = saved,
            }
        }
        Some(reference)
    }

    pub(super) fn literal(&mut self) -> Option<Expression> {
        let token = self.current().clone();
        let range = Range::of(&token);
        let expression = match token.kind {
            TokenKind::IntLiteral => {
                let Ok(value) = token.text.parse::<i64>() else {
                    self.expected("number that fits in 64 bits");
                    return None;
                };
                self.advance();
                let int = Expression::IntLiteral { value, range };
                if self.at(TokenKind::Inch) {
                    let inch = self.advance();
                    Expression::InchLiteral { value: Box::new(int), range: range.cover(Range::of(&inch)) }
                } else {
                    int
                }
            }
            TokenKind::StringLiteral => {
                self.advance();
                let value = token.text.trim_start_matches('"').trim_end_matches('"').to_string();
                Expression::StringLiteral { value, range }
            }
            TokenKind::ByteArrayLiteral => {
                let Some(value) = parse_hex(&token.text[1..]) else {
                    self.expected("byte array");
                    return None;
                };
                self.advance();
                Expression::ByteArrayLiteral { value, range }
            }
            TokenKind::RatioLiteral => {
                let parsed = token
                    .text
                    .split_once('/')
                    .and_then(|(n, d)| Some((n.parse::<i64>().ok()?, d.parse::<i64>().ok()?)));
                let Some((numerator, denominator)) = parsed else {
                    self.expected("ratio");
                    return None;
                };
                self.advance();
                Expression::RatioLiteral { numerator, denominator, range }
            }
            TokenKind::Null => {
                self.advance();
                Expression::NullLiteral { range }
            }
            _ => {
                self.expected("literal");
                return None;
            }
        };
        Some(expression)
    }

    fn primary(&mut self) -> Option<Expression> {
        if let Some(identifier) = self.reference() {
            return Some(Expression::Variable { range: identifier.range, identifier });
        }
        let start = self.pos;
        let literal = self.literal()?;
        if self.at(TokenKind::Possessive) && self.peek_kind(1) == TokenKind::Identifier {
            self.advance();
            let (name, name_range) = self.long_identifier()?;
            return Some(Expression::Posessive {
                identifier: IdentifierReference::new(name, name_range),
                owner: Box::new(literal),
                range: self.range_from(start),
            });
        }
        Some(literal)
    }

    /// `multiplied by` and `divided by`, binding tighter than `plus`/`minus`.
    fn term(&mut self) -> Option<Expression> {
        let mut left = self.primary()?;
        loop {
            let operator = match (self.kind(), self.peek_kind(1)) {
                (TokenKind::Multiplied, TokenKind::By) => MathOperator::Multiply,
                (TokenKind::Divided, TokenKind::By) => MathOperator::Divide,
                _ => break,
            };
            let saved = self.pos;
            self.pos += 2;
            match self.primary() {
                Some(right) => left = math(operator, left, right),
                None => {
                    self.pos = saved;
                    break;
                }
            }
        }
        Some(left)
    }

    pub(super) fn arithmetic(&mut self) -> Option<Expression> {
        self.memoized(MemoRule::Arithmetic, Self::arithmetic_uncached)
    }

    fn arithmetic_uncached(&mut self) -> Option<Expression> {
        let mut left = self.term()?;
        loop {
            let operator = match self.kind() {
                TokenKind::Plus => MathOperator::Plus,
                TokenKind::Minus => MathOperator::Minus,
                _ => break,
            };
            let saved = self.pos;
            self.advance();
            match self.term() {
                Some(right) => left = math(operator, left, right),
                None => {
                    self.pos = saved;
                    break;
                }
            }
        }
        Some(left)
    }

    fn comparator(&mut self) -> Option<LogicalOperator> {
        for (phrase, operator) in COMPARATORS {
            if phrase.iter().enumerate().all(|(i, kind)| self.peek_kind(i) == *kind) {
                self.pos += phrase.len();
                return Some(*operator);
            }
        }
        self.expected("comparison");
        None
    }

    fn logical(&mut self) -> Option<Expression> {
        let first = self.arithmetic()?;
        let operator = self.comparator()?;
        let second = self.arithmetic()?;
        let range = first.range().cover(second.range());
        Some(Expression::Logical { operator, first: Box::new(first), second: Box::new(second), range })
    }

    pub(super) fn expression(&mut self) -> Option<Expression> {
        self.memoized(MemoRule::Expression, Self::expression_uncached)
    }

    fn expression_uncached(&mut self) -> Option<Expression> {
        self.first_of(&[Self::logical, Self::arithmetic])
    }

    fn arithmetic_phrase(&mut self) -> Option<ArithmeticPhrase> {
        let start = self.pos;
        let (operator, value, target) = match self.kind() {
            TokenKind::Add => {
                self.advance();
                let value = self.expression()?;
                self.eat(TokenKind::To)?;
                (MathOperator::Plus, value, self.reference()?)
            }
            TokenKind::Subtract => {
                self.advance();
                let value = self.expression()?;
                self.eat(TokenKind::From)?;
                (MathOperator::Minus, value, self.reference()?)
            }
            TokenKind::Multiply => {
                self.advance();
                let target = self.reference()?;
                self.eat(TokenKind::By)?;
                (MathOperator::Multiply, self.expression()?, target)
            }
            TokenKind::Divide => {
                self.advance();
                let target = self.reference()?;
                self.eat(TokenKind::By)?;
                (MathOperator::Divide, self.expression()?, target)
            }
            _ => {
                self.expected("'add', 'subtract', 'multiply' or 'divide'");
                return None;
            }
        };
        Some(ArithmeticPhrase { operator, value, target, range: self.range_from(start) })
    }

    /// Statement position: the target is changed in place.
    pub(super) fn in_place_arithmetic(&mut self) -> Option<Expression> {
        self.arithmetic_phrase().map(ArithmeticPhrase::in_place)
    }

    pub(super) fn standalone_arithmetic(&mut self) -> Option<Expression> {
        self.arithmetic_phrase().map(ArithmeticPhrase::standalone)
    }

    /// `put <expr> into|in <ref>` or `let <ref> is|equals <expr>`.
    pub(super) fn assignment(&mut self) -> Option<Expression> {
        let start = self.pos;
        let (variable, expression) = if self.at(TokenKind::Put) {
            self.advance();
            let expression = self.expression()?;
            self.eat_any(&[TokenKind::Into, TokenKind::In], "'into' or 'in'")?;
            (self.reference()?, expression)
        } else {
            self.eat(TokenKind::Let)?;
            let variable = self.reference()?;
            self.eat_any(&[TokenKind::Is, TokenKind::Equal], "'is' or 'equals'")?;
            if self.at(TokenKind::To) {
                self.advance();
            }
            (variable, self.expression()?)
        };
        Some(Expression::Assignment {
            variable,
            expression: Box::new(expression),
            range: self.range_from(start),
        })
    }
}

fn math(operator: MathOperator, first: Expression, second: Expression) -> Expression {
    let range = first.range().cover(second.range());
    Expression::Math { operator, first: Box::new(first), second: Box::new(second), range }
}

/// Hex digits to bytes; an odd count gets a leading zero nibble.
fn parse_hex(digits: &str) -> Option<Vec<u8>> {
    let padded = if digits.len() % 2 == 1 { format!("0{}", digits) } else { digits.to_string() };
    padded
        .as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).ok().and_then(|s| u8::from_str_radix(s, 16).ok()))
        .collect()
}
