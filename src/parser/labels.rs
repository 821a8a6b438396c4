use super::ast::*;
use super::{Fragment, Parser};
use crate::lexer::{Token, TokenKind};

const PARAMETER_ARTICLES: &[TokenKind] = &[TokenKind::IndefiniteArticle, TokenKind::SomeKeyword];
const RESULT_ARTICLES: &[TokenKind] = &[TokenKind::IndefiniteArticle, TokenKind::DefiniteArticle];

/// A header or call phrase split into marker words, parameters and result.
#[derive(Debug, Default)]
pub(super) struct MarkerPhrase {
    words: Vec<String>,
    parameters: Vec<IdentifierReference>,
    result: Option<IdentifierReference>,
}

impl MarkerPhrase {
    fn marker(&self) -> String {
        self.words.join(" ")
    }
}

/// `a|an|some <run>` starting at `i`.
fn parameter_at(tokens: &[Token], i: usize) -> Option<(IdentifierReference, usize)> {
    if !PARAMETER_ARTICLES.contains(&tokens.get(i)?.kind) {
        return None;
    }
    identifier_run(tokens, i, i + 1)
}

/// `into|in a|an|the <run>` starting at `i`.
fn result_at(tokens: &[Token], i: usize) -> Option<(IdentifierReference, usize)> {
    if !RESULT_ARTICLES.contains(&tokens.get(i + 1)?.kind) {
        return None;
    }
    identifier_run(tokens, i + 1, i + 2)
}

fn identifier_run(tokens: &[Token], start: usize, from: usize) -> Option<(IdentifierReference, usize)> {
    let words = tokens[from..].iter().take_while(|t| t.kind == TokenKind::Identifier).count();
    if words == 0 {
        return None;
    }
    let end = from + words;
    let name = tokens[from..end].iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
    let range = Range::new(tokens[start].start, tokens[end - 1].end);
    Some((IdentifierReference::new(name, range), end))
}

/// Split a phrase into marker text and references. Parameters are lifted
/// out, along with an `and` that only joins two of them; comments and
/// `the` phrases stay in the marker. Fails with the index of the first
/// token that cannot be part of a marker.
pub(super) fn marker_phrase(tokens: &[Token], result_keywords: &[TokenKind]) -> Result<MarkerPhrase, usize> {
    let mut phrase = MarkerPhrase::default();
    let mut after_parameter = false;
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if let Some((parameter, next)) = parameter_at(tokens, i) {
            phrase.parameters.push(parameter);
            after_parameter = true;
            i = next;
            continue;
        }
        if token.kind == TokenKind::And && after_parameter && parameter_at(tokens, i + 1).is_some() {
            i += 1;
            continue;
        }
        if result_keywords.contains(&token.kind) {
            if let Some((result, next)) = result_at(tokens, i) {
                let trailing = &tokens[next..];
                if trailing.iter().all(|t| t.kind == TokenKind::Comment) {
                    phrase.result = Some(result);
                    phrase.words.extend(trailing.iter().map(|t| t.text.clone()));
                    break;
                }
            }
        }
        if !(token.kind.is_word() || token.kind == TokenKind::Comment) {
            return Err(i);
        }
        phrase.words.push(token.text.clone());
        after_parameter = false;
        i += 1;
    }
    Ok(phrase)
}

/// Condition that is not a comparison. Word phrases become an invocation
/// of their marker; anything else is kept as invalid code.
pub(super) fn degraded_condition(tokens: &[Token]) -> Expression {
    let code = tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
    let range = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => Range::new(first.start, last.end),
        _ => Range::default(),
    };
    match marker_phrase(tokens, &[]) {
        Ok(phrase) => {
            let marker = if phrase.words.is_empty() { code } else { phrase.marker() };
            let parameters = phrase
                .parameters
                .into_iter()
                .map(|identifier| Expression::Variable { range: identifier.range, identifier })
                .collect();
            Expression::Invocation { marker, parameters, range }
        }
        Err(_) => Expression::Invalid { code, range },
    }
}

impl<'c> Parser<'c> {
    pub(super) fn find_from(&self, from: usize, kinds: &[TokenKind]) -> Option<usize> {
        self.tokens[from.min(self.tokens.len())..]
            .iter()
            .position(|t| kinds.contains(&t.kind))
            .map(|i| i + from)
    }

    /// `to <header> [:|-> [body]]` or `define <header> as [body]`.
    pub(super) fn labeled_fragment(&mut self) -> Option<Fragment> {
        let start = self.pos;
        let keyword = self.eat_any(&[TokenKind::To, TokenKind::Define], "'to' or 'define'")?;
        if keyword.kind == TokenKind::Define {
            let Some(separator) = self.find_from(self.pos, &[TokenKind::As]) else {
                self.expected("'as'");
                return None;
            };
            return self.label(start, self.pos, Some(separator));
        }
        let separator = self.find_from(self.pos, &[TokenKind::Colon, TokenKind::Arrow]);
        self.label(start, self.pos, separator)
    }

    /// `<header> -> [body]` with no leading keyword.
    pub(super) fn bare_label(&mut self) -> Option<Fragment> {
        let start = self.pos;
        let Some(arrow) = self.find_from(start, &[TokenKind::Arrow]) else {
            self.expected("'->'");
            return None;
        };
        self.label(start, start, Some(arrow))
    }

    fn label(&mut self, start: usize, header_start: usize, separator: Option<usize>) -> Option<Fragment> {
        let end = self.end_index();
        let header_end = separator.unwrap_or(end);
        let phrase = match marker_phrase(&self.tokens[header_start..header_end], &[TokenKind::Into]) {
            Ok(phrase) if !phrase.words.is_empty() => phrase,
            Ok(_) => {
                self.pos = header_end;
                self.expected("procedure name");
                return None;
            }
            Err(offset) => {
                self.pos = header_start + offset;
                self.expected("word");
                return None;
            }
        };

        let body = separator
            .map(|s| self.tokens[s + 1..end].to_vec())
            .filter(|body| !body.is_empty());
        let last = header_end.saturating_sub(1).max(start);
        let range = Range::new(self.tokens[start].start, self.tokens[last].end);
        self.pos = end;
        let label = InvokableLabel {
            markers: vec![phrase.marker()],
            parameters: phrase.parameters,
            result: phrase.result,
            range,
        };
        Some(Fragment::Label { label, body })
    }

    /// `<marker phrase> <ref>... [into|in <ref>]`
    pub(super) fn invocation(&mut self) -> Option<Fragment> {
        let start = self.pos;
        let end = self.end_index();
        let phrase = match marker_phrase(&self.tokens[start..end], &[TokenKind::Into, TokenKind::In]) {
            Ok(phrase) if !phrase.words.is_empty() => phrase,
            Ok(_) => {
                self.expected("identifier");
                return None;
            }
            Err(offset) => {
                self.pos = start + offset;
                self.expected("word");
                return None;
            }
        };
        self.pos = end;
        Some(Fragment::Statement(Statement::Invocation {
            marker: phrase.marker(),
            parameters: phrase.parameters,
            result: phrase.result,
            range: self.range_from(start),
        }))
    }
}
