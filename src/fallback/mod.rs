//! Text-pattern parser for fragments the grammar rejects.
//!
//! Works on the raw fragment text with regular expressions, so names may
//! contain words the grammar treats as keywords. Produces the same node
//! shapes as the grammar does.

use once_cell::sync::Lazy;
use regex::{Captures, Match, Regex};
use thiserror::Error;

use crate::parser::ast::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fallback could not classify '{fragment}': {reason}")]
pub struct FallbackFailure {
    pub fragment: String,
    pub reason: String,
}

impl FallbackFailure {
    fn new(fragment: &str, reason: impl Into<String>) -> Self {
        FallbackFailure { fragment: fragment.to_string(), reason: reason.into() }
    }
}

type Pattern = Lazy<Result<Regex, regex::Error>>;

static VARIABLE: Pattern = Lazy::new(|| {
    Regex::new(
        r"(?is)^the\s+(?P<name>.+?)\s+(?:is|are)\s+(?:(?P<article>an?|some)\s+)?(?P<type>[a-z][\w-]*(?:\s+[a-z][\w-]*)*?)(?:\s+equals?(?:\s+to)?\s+(?P<value>.+?))?\s*$",
    )
});

static SHAPE_WITH_BASE_AND_SLOTS: Pattern = Lazy::new(|| {
    Regex::new(
        r"(?is)^an?\s+(?P<name>.+?)\s+is\s+(?:(?P<article>an?|some)\s+)?(?P<base>[a-z][\w-]*(?:\s+[a-z][\w-]*)*?)\s+with\s+(?P<slots>.+?)\s*$",
    )
});

static SHAPE: Pattern = Lazy::new(|| {
    Regex::new(r"(?is)^an?\s+(?P<name>.+?)\s+is\s+(?:(?P<article>an?|some)\s+)?(?P<base>[a-z][\w-]*(?:\s+[a-z][\w-]*)*)\s*$")
});

static SHAPE_WITH_SLOTS: Pattern = Lazy::new(|| Regex::new(r"(?is)^an?\s+(?P<name>.+?)\s+has\s+(?P<slots>.+?)\s*$"));

static SLOT: Pattern = Lazy::new(|| {
    Regex::new(
        r"(?is)^(?P<article>an?|some)\s+(?P<name>\S.*?)(?:\s+(?:is\s+(?:(?:an?|the)\s+)?|at\s+the\s+)(?P<alias>\S.*?))?\s*$",
    )
});

static SLOT_SEPARATOR: Pattern = Lazy::new(|| Regex::new(r"(?i)\s*,\s*(?:and\s+)?|\s+and\s+"));

fn pattern<'p>(pattern: &'p Pattern, fragment: &str) -> Result<&'p Regex, FallbackFailure> {
    pattern
        .as_ref()
        .map_err(|err| FallbackFailure::new(fragment, format!("pattern failed to compile: {}", err)))
}

/// Classify `text`, whose first byte sits at `range.start` in the document.
pub fn parse_statement(text: &str, range: Range) -> Result<Statement, FallbackFailure> {
    if let Some(caps) = pattern(&VARIABLE, text)?.captures(text) {
        return variable_declaration(text, range, &caps);
    }
    // `has` first: slot aliases may contain `is`
    if let Some(caps) = pattern(&SHAPE_WITH_SLOTS, text)?.captures(text) {
        let slots = match caps.name("slots") {
            Some(list) => slot_list(text, list, range)?,
            None => return Err(FallbackFailure::new(text, "empty slot list")),
        };
        let declaration = ShapeDeclaration { name: collapse(&caps["name"]), base_shape: None, slots: Some(slots), range };
        return Ok(Statement::ShapeDeclaration { declaration, range });
    }
    if let Some(caps) = pattern(&SHAPE_WITH_BASE_AND_SLOTS, text)?.captures(text) {
        let (Some(base), Some(list)) = (caps.name("base"), caps.name("slots")) else {
            return Err(FallbackFailure::new(text, "incomplete shape declaration"));
        };
        let declaration = ShapeDeclaration {
            name: collapse(&caps["name"]),
            base_shape: Some(type_reference(&caps, base, range)),
            slots: Some(slot_list(text, list, range)?),
            range,
        };
        return Ok(Statement::ShapeDeclaration { declaration, range });
    }
    if let Some(caps) = pattern(&SHAPE, text)?.captures(text) {
        let base = &caps["base"];
        if base.eq_ignore_ascii_case("pointer") {
            return Err(FallbackFailure::new(text, "pointer declarations need a target type"));
        }
        if base.split_whitespace().any(|word| word.eq_ignore_ascii_case("with")) {
            return Err(FallbackFailure::new(text, "'with' needs a slot list"));
        }
        let declaration = ShapeDeclaration {
            name: collapse(&caps["name"]),
            base_shape: caps.name("base").map(|base| type_reference(&caps, base, range)),
            slots: None,
            range,
        };
        return Ok(Statement::ShapeDeclaration { declaration, range });
    }
    Err(FallbackFailure::new(text, "no declaration pattern matches"))
}

fn variable_declaration(text: &str, range: Range, caps: &Captures) -> Result<Statement, FallbackFailure> {
    let Some(type_name) = caps.name("type") else {
        return Err(FallbackFailure::new(text, "missing type"));
    };
    let initializer = match caps.name("value") {
        Some(value) => Some(literal(text, value, range)?),
        None => None,
    };
    let declaration = VariableDeclaration {
        name: collapse(&caps["name"]),
        type_reference: type_reference(caps, type_name, range),
        initializer,
        range,
    };
    Ok(Statement::VariableDeclaration { declaration, range })
}

fn type_reference(caps: &Captures, name: Match, range: Range) -> TypeIdentifierReference {
    let is_collection = caps.name("article").is_some_and(|a| a.as_str().eq_ignore_ascii_case("some"));
    TypeIdentifierReference { name: collapse(name.as_str()), is_collection, range: within(range, &name) }
}

fn literal(text: &str, value: Match, range: Range) -> Result<Expression, FallbackFailure> {
    let raw = value.as_str().trim();
    let range = within(range, &value);
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Expression::IntLiteral { value, range });
    }
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Ok(Expression::StringLiteral { value: raw[1..raw.len() - 1].to_string(), range });
    }
    Err(FallbackFailure::new(text, format!("initializer '{}' is not a literal", raw)))
}

fn slot_list(text: &str, list: Match, range: Range) -> Result<Vec<SlotDeclaration>, FallbackFailure> {
    let slot = pattern(&SLOT, text)?;
    let separator = pattern(&SLOT_SEPARATOR, text)?;
    let base = range.start + list.start();
    let mut slots = Vec::new();
    let mut start = 0;
    let source = list.as_str();
    let pieces = separator
        .find_iter(source)
        .map(|m| (m.start(), m.end()))
        .chain(std::iter::once((source.len(), source.len())));
    for (end, next) in pieces {
        let piece = &source[start..end];
        let Some(caps) = slot.captures(piece) else {
            return Err(FallbackFailure::new(text, format!("'{}' is not a slot", piece.trim())));
        };
        slots.push(SlotDeclaration {
            name: collapse(&caps["name"]),
            alias_for: caps.name("alias").map(|alias| collapse(alias.as_str())),
            is_collection: caps["article"].eq_ignore_ascii_case("some"),
            range: Range::new(base + start, base + end),
        });
        start = next;
    }
    Ok(slots)
}

fn within(range: Range, capture: &Match) -> Range {
    Range::new(range.start + capture.start(), range.start + capture.end())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Statement, FallbackFailure> {
        parse_statement(text, Range::new(10, 10 + text.len()))
    }

    #[test]
    fn test_declaration_with_keywords_in_name() {
        match parse("the answer to all things is a number equal to 42") {
            Ok(Statement::VariableDeclaration { declaration, range }) => {
                assert_eq!(declaration.name, "answer to all things");
                assert_eq!(declaration.type_reference.name, "number");
                assert!(matches!(declaration.initializer, Some(Expression::IntLiteral { value: 42, .. })));
                assert_eq!(range, Range::new(10, 58));
            }
            other => panic!("Expected VariableDeclarationStatement, got {:?}", other),
        }
    }

    #[test]
    fn test_declaration_with_string_initializer() {
        match parse("The greeting for the day is a string equals to \"Hello\"") {
            Ok(Statement::VariableDeclaration { declaration, .. }) => {
                assert_eq!(declaration.name, "greeting for the day");
                assert!(matches!(declaration.initializer, Some(Expression::StringLiteral { ref value, .. }) if value == "Hello"));
            }
            other => panic!("Expected VariableDeclarationStatement, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_with_base() {
        match parse("a state of the art is a technique") {
            Ok(Statement::ShapeDeclaration { declaration, .. }) => {
                assert_eq!(declaration.name, "state of the art");
                assert_eq!(declaration.base_shape.map(|b| b.name), Some("technique".to_string()));
                assert_eq!(declaration.slots, None);
            }
            other => panic!("Expected ShapeDeclarationStatement, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_with_slot_list() {
        match parse("a box to ship has a top to bottom,  a width and some items") {
            Ok(Statement::ShapeDeclaration { declaration, .. }) => {
                assert_eq!(declaration.name, "box to ship");
                let slots = declaration.slots.unwrap();
                let names: Vec<&str> = slots.iter().map(|s| s.name.as_str()).collect();
                assert_eq!(names, vec!["top to bottom", "width", "items"]);
                assert!(slots[2].is_collection);
            }
            other => panic!("Expected ShapeDeclarationStatement, got {:?}", other),
        }
    }

    #[test]
    fn test_slot_aliases() {
        match parse("a state of the art has a left at the x and a right is the y") {
            Ok(Statement::ShapeDeclaration { declaration, .. }) => {
                let slots = declaration.slots.unwrap();
                let pairs: Vec<(&str, Option<&str>)> =
                    slots.iter().map(|s| (s.name.as_str(), s.alias_for.as_deref())).collect();
                assert_eq!(pairs, vec![("left", Some("x")), ("right", Some("y"))]);
            }
            other => panic!("Expected ShapeDeclarationStatement, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_with_base_and_slots() {
        match parse("a rectangle is shape with a width and a height") {
            Ok(Statement::ShapeDeclaration { declaration, .. }) => {
                assert_eq!(declaration.name, "rectangle");
                assert_eq!(declaration.base_shape.map(|b| b.name), Some("shape".to_string()));
                let names: Vec<String> = declaration.slots.unwrap().into_iter().map(|s| s.name).collect();
                assert_eq!(names, vec!["width", "height"]);
            }
            other => panic!("Expected ShapeDeclarationStatement, got {:?}", other),
        }

        let failure = parse("a rectangle is shape with").unwrap_err();
        assert!(failure.reason.contains("slot list"), "{}", failure.reason);
        let failure = parse("a rectangle is shape with 42").unwrap_err();
        assert!(failure.reason.contains("'42' is not a slot"));
    }

    #[test]
    fn test_failures_are_values() {
        let failure = parse("42 is nonsense").unwrap_err();
        assert_eq!(failure.fragment, "42 is nonsense");
        assert!(failure.to_string().contains("no declaration pattern"));

        let failure = parse("a box has a top, 42").unwrap_err();
        assert!(failure.reason.contains("'42' is not a slot"));

        let failure = parse("the answer is a number equal to a width").unwrap_err();
        assert!(failure.reason.contains("not a literal"));
    }
}
