use super::ast::*;
use super::labels::degraded_condition;
use super::Parser;
use crate::lexer::{Token, TokenKind};

const SLOT_ARTICLES: &[TokenKind] = &[TokenKind::IndefiniteArticle, TokenKind::SomeKeyword];

impl<'c> Parser<'c> {
    /// `a|an <run>`, or `some <run>` for a collection.
    pub(super) fn type_reference(&mut self) -> Option<TypeIdentifierReference> {
        let start = self.pos;
        let article = self.eat_any(SLOT_ARTICLES, "'a', 'an' or 'some'")?;
        let (name, _) = self.long_identifier()?;
        Some(TypeIdentifierReference {
            name,
            is_collection: article.kind == TokenKind::SomeKeyword,
            range: self.range_from(start),
        })
    }

    /// `the <name> is|are <type> [equal(s) [to] <expr>]`
    pub(super) fn variable_declaration(&mut self) -> Option<VariableDeclaration> {
        let start = self.pos;
        self.eat(TokenKind::DefiniteArticle)?;
        let (name, _) = self.long_identifier()?;
        self.eat_any(&[TokenKind::Is, TokenKind::Are], "'is' or 'are'")?;
        let type_reference = self.type_reference()?;
        let initializer = self.attempt(Self::initializer);
        Some(VariableDeclaration { name, type_reference, initializer, range: self.range_from(start) })
    }

    fn initializer(&mut self) -> Option<Expression> {
        self.eat(TokenKind::Equal)?;
        if self.at(TokenKind::To) {
            self.advance();
        }
        self.expression()
    }

    pub(super) fn variable_declaration_statement(&mut self) -> Option<Statement> {
        let declaration = self.variable_declaration()?;
        Some(Statement::VariableDeclaration { range: declaration.range, declaration })
    }

    /// `the <name> is <int> <units>`; the base unit drops one trailing `s`.
    pub(super) fn unit_alias_declaration(&mut self) -> Option<Statement> {
        let start = self.pos;
        self.eat(TokenKind::DefiniteArticle)?;
        let (name, name_range) = self.long_identifier()?;
        self.eat(TokenKind::Is)?;
        let amount = self.eat(TokenKind::IntLiteral)?;
        let Ok(value) = amount.text.parse::<i64>() else {
            self.expected("number that fits in 64 bits");
            return None;
        };
        let unit = self.eat(TokenKind::Identifier)?;
        let base = unit.text.strip_suffix('s').unwrap_or(&unit.text);
        Some(Statement::UnitAliasDeclaration {
            identifier: IdentifierReference::new(name, name_range),
            value: Expression::IntLiteral { value, range: Range::of(&amount) },
            base_unit: IdentifierReference::new(base, Range::of(&unit)),
            range: self.range_from(start),
        })
    }

    /// `the <name> is <literal>`
    pub(super) fn constant_declaration(&mut self) -> Option<Statement> {
        let start = self.pos;
        self.eat(TokenKind::DefiniteArticle)?;
        let (name, name_range) = self.long_identifier()?;
        self.eat(TokenKind::Is)?;
        let value = self.literal()?;
        Some(Statement::ConstantDeclaration {
            identifier: IdentifierReference::new(name, name_range),
            value,
            range: self.range_from(start),
        })
    }

    /// `a <name> is a pointer to <type>`
    pub(super) fn pointer_declaration(&mut self) -> Option<Statement> {
        let start = self.pos;
        self.eat(TokenKind::IndefiniteArticle)?;
        let (name, _) = self.long_identifier()?;
        let pointer_type = IdentifierReference::new(name, self.range_from(start));
        self.eat(TokenKind::Is)?;
        self.eat(TokenKind::IndefiniteArticle)?;
        if !(self.at(TokenKind::Identifier) && self.current().text.eq_ignore_ascii_case("pointer")) {
            self.expected("'pointer'");
            return None;
        }
        self.advance();
        self.eat(TokenKind::To)?;
        let base_type = self.type_reference()?;
        Some(Statement::PointerDeclaration { pointer_type, base_type, range: self.range_from(start) })
    }

    /// `a <name> is <base> [with <slots>]`
    pub(super) fn shape_declaration(&mut self) -> Option<Statement> {
        let start = self.pos;
        self.eat(TokenKind::IndefiniteArticle)?;
        let (name, _) = self.long_identifier()?;
        self.eat(TokenKind::Is)?;
        let base_shape = self.type_reference()?;
        let slots = if self.at(TokenKind::With) {
            self.advance();
            Some(self.slot_list()?)
        } else {
            None
        };
        Some(shape(name, Some(base_shape), slots, self.range_from(start)))
    }

    /// `a <name> has <slots>`
    pub(super) fn shape_with_slots(&mut self) -> Option<Statement> {
        let start = self.pos;
        self.eat(TokenKind::IndefiniteArticle)?;
        let (name, _) = self.long_identifier()?;
        self.eat(TokenKind::Has)?;
        let slots = self.slot_list()?;
        Some(shape(name, None, Some(slots), self.range_from(start)))
    }

    fn slot_list(&mut self) -> Option<Vec<SlotDeclaration>> {
        let mut slots = vec![self.slot()?];
        loop {
            let saved = self.pos;
            let mut separated = false;
            if self.at(TokenKind::Comma) {
                self.advance();
                separated = true;
            }
            if self.at(TokenKind::And) {
                self.advance();
                separated = true;
            }
            if !separated {
                break;
            }
            match self.slot() {
                Some(slot) => slots.push(slot),
                None => {
                    self.pos = saved;
                    break;
                }
            }
        }
        Some(slots)
    }

    fn slot(&mut self) -> Option<SlotDeclaration> {
        let start = self.pos;
        let article = self.eat_any(SLOT_ARTICLES, "'a', 'an' or 'some'")?;
        let (name, _) = self.long_identifier()?;
        let alias_for = self.attempt(Self::slot_alias);
        Some(SlotDeclaration {
            name,
            alias_for,
            is_collection: article.kind == TokenKind::SomeKeyword,
            range: self.range_from(start),
        })
    }

    /// `is [a|an|the] <other>` or `at the <other>`
    fn slot_alias(&mut self) -> Option<String> {
        match self.kind() {
            TokenKind::Is => {
                self.advance();
                if self.at_any(&[TokenKind::IndefiniteArticle, TokenKind::DefiniteArticle]) {
                    self.advance();
                }
            }
            TokenKind::At => {
                self.advance();
                self.eat(TokenKind::DefiniteArticle)?;
            }
            _ => {
                self.expected("'is' or 'at'");
                return None;
            }
        }
        self.long_identifier().map(|(name, _)| name)
    }

    /// `result is <expr>` or `return <expr>`
    pub(super) fn result_statement(&mut self) -> Option<Statement> {
        let start = self.pos;
        if self.at(TokenKind::ResultKeyword) {
            self.advance();
            self.eat(TokenKind::Is)?;
        } else {
            self.eat(TokenKind::Return)?;
        }
        let value = self.expression()?;
        Some(Statement::Result { value, range: self.range_from(start) })
    }

    /// `if <condition> then|, <statement>[; <statement>]...`
    pub(super) fn if_statement(&mut self) -> Option<Statement> {
        let start = self.pos;
        self.eat(TokenKind::If)?;
        let condition_start = self.pos;
        let Some(separator) = self.find_from(condition_start, &[TokenKind::Then, TokenKind::Comma]) else {
            self.pos = self.end_index();
            self.expected("'then' or ','");
            return None;
        };
        if separator == condition_start {
            self.expected("condition");
            return None;
        }
        let condition = self.condition(separator);
        self.pos = separator + 1;
        let then = self.then_branch()?;
        Some(Statement::If { condition, then: Box::new(then), range: self.range_from(start) })
    }

    /// A comparison that spans the whole condition, or a degraded
    /// invocation built from its words.
    fn condition(&mut self, end: usize) -> Expression {
        let logical = self.attempt(|p| {
            let expression = p.expression()?;
            (p.pos == end && matches!(expression, Expression::Logical { .. })).then_some(expression)
        });
        match logical {
            Some(expression) => expression,
            None => {
                log::debug!("condition is not a comparison, degrading");
                degraded_condition(&self.tokens[self.pos..end])
            }
        }
    }

    fn then_branch(&mut self) -> Option<Statement> {
        let body_start = self.pos;
        let end = self.end_index();
        if self.depth >= self.config.max_depth {
            self.expected("shallower nesting");
            return None;
        }
        let pieces: Vec<Vec<Token>> = self.tokens[body_start..end]
            .split(|t| t.kind == TokenKind::Semicolon)
            .filter(|piece| !piece.is_empty())
            .map(<[Token]>::to_vec)
            .collect();
        if pieces.is_empty() {
            self.expected("statement");
            return None;
        }
        self.pos = end;

        let mut parsed: Vec<(Statement, bool)> = pieces.iter().map(|piece| self.sub_statement(piece)).collect();
        if parsed.len() == 1 && parsed[0].1 {
            return parsed.pop().map(|(statement, _)| statement);
        }
        Some(Statement::Block {
            statements: parsed.into_iter().map(|(statement, _)| statement).collect(),
            range: self.range_from(body_start),
        })
    }
}

fn shape(
    name: String,
    base_shape: Option<TypeIdentifierReference>,
    slots: Option<Vec<SlotDeclaration>>,
    range: Range,
) -> Statement {
    Statement::ShapeDeclaration {
        declaration: ShapeDeclaration { name, base_shape, slots, range },
        range,
    }
}
