//! Whole-document behavior through the public entry points.

use englang::parser::ast::*;
use englang::{parse, parse_document, parse_with, ParserConfig, SyntaxNode};
use rstest::rstest;

fn only_statement(list: &ParagraphList) -> &Statement {
    assert_eq!(list.paragraphs.len(), 1);
    assert_eq!(list.paragraphs[0].statements.len(), 1);
    &list.paragraphs[0].statements[0]
}

fn document(text: &str) -> ParagraphList {
    match parse(text) {
        Ok(SyntaxNode::ParagraphList(list)) => list,
        other => panic!("Expected ParagraphList, got {:?}", other),
    }
}

#[test]
fn test_variable_declaration_document() {
    let list = document("the width is a number.");
    match only_statement(&list) {
        Statement::VariableDeclaration { declaration, .. } => {
            assert_eq!(declaration.name, "width");
            assert_eq!(declaration.type_reference.name, "number");
            assert!(!declaration.type_reference.is_collection);
            assert_eq!(declaration.initializer, None);
        }
        other => panic!("Expected VariableDeclarationStatement, got {:?}", other),
    }
}

#[test]
fn test_four_arithmetic_statements() {
    let list = document("add 42 to a value; subtract 42 from a value; multiply a value by 42; divide a value by 42.");
    assert_eq!(list.paragraphs.len(), 1);
    let statements = &list.paragraphs[0].statements;
    assert_eq!(statements.len(), 4);
    let kinds: Vec<&str> = statements
        .iter()
        .map(|statement| match statement {
            Statement::Expression { expression, .. } => expression.kind_name(),
            other => panic!("Expected ExpressionStatement, got {:?}", other),
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
    for statement in statements {
        let Statement::Expression { expression, .. } = statement else { unreachable!() };
        let children = NodeRef::Expression(expression).children();
        assert!(matches!(children[0], NodeRef::IdentifierReference(target) if target.name == "value"));
        assert!(matches!(children[1], NodeRef::Expression(Expression::IntLiteral { value: 42, .. })));
    }
}

#[test]
fn test_if_statement_document() {
    let list = document("if a number is 0 then add 42 to a value.");
    match only_statement(&list) {
        Statement::If { condition, then, .. } => {
            match condition {
                Expression::Logical { operator, first, second, .. } => {
                    assert_eq!(*operator, LogicalOperator::Equals);
                    assert!(matches!(first.as_ref(), Expression::Variable { identifier, .. } if identifier.name == "number"));
                    assert!(matches!(second.as_ref(), Expression::IntLiteral { value: 0, .. }));
                }
                other => panic!("Expected LogicalExpression, got {:?}", other),
            }
            match then.as_ref() {
                Statement::Expression { expression: Expression::InPlaceAddition { addend, target, .. }, .. } => {
                    assert_eq!(target.name, "value");
                    assert!(matches!(addend.as_ref(), Expression::IntLiteral { value: 42, .. }));
                }
                other => panic!("Expected InPlaceAddition, got {:?}", other),
            }
        }
        other => panic!("Expected IfStatement, got {:?}", other),
    }
}

#[test]
fn test_labeled_second_paragraph() {
    let list = document(
        "the width is a number.\nthe height is a number.\n\nTo calculate area from a width and a height ->\n    multiply a width by a height.\n",
    );
    assert_eq!(list.paragraphs.len(), 2);
    assert_eq!(list.paragraphs[0].label, None);
    let label = list.paragraphs[1].label.as_ref().unwrap();
    assert_eq!(label.marker(), "calculate area from");
    let parameters: Vec<&str> = label.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(parameters, vec!["width", "height"]);
    assert_eq!(list.paragraphs[1].statements.len(), 1);
}

#[test]
fn test_shape_with_slot_list() {
    let list = document("a rectangle has a width, a height and a fill colour.");
    match only_statement(&list) {
        Statement::ShapeDeclaration { declaration, .. } => {
            assert_eq!(declaration.name, "rectangle");
            assert_eq!(declaration.base_shape, None);
            let slots = declaration.slots.as_ref().unwrap();
            let names: Vec<&str> = slots.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["width", "height", "fill colour"]);
            assert!(slots.iter().all(|s| s.alias_for.is_none()));
        }
        other => panic!("Expected ShapeDeclarationStatement, got {:?}", other),
    }
}

#[rstest]
#[case("is", LogicalOperator::Equals)]
#[case("is equal to", LogicalOperator::Equals)]
#[case("equal", LogicalOperator::Equals)]
#[case("equals", LogicalOperator::Equals)]
#[case("is not", LogicalOperator::NotEquals)]
#[case("is less than", LogicalOperator::Less)]
#[case("is smaller than", LogicalOperator::Less)]
#[case("less than", LogicalOperator::Less)]
#[case("smaller than", LogicalOperator::Less)]
#[case("is greater than", LogicalOperator::Greater)]
#[case("is bigger than", LogicalOperator::Greater)]
#[case("greater than", LogicalOperator::Greater)]
#[case("bigger than", LogicalOperator::Greater)]
#[case("is at most", LogicalOperator::LessOrEquals)]
#[case("at most", LogicalOperator::LessOrEquals)]
#[case("is at least", LogicalOperator::GreaterOrEquals)]
#[case("at least", LogicalOperator::GreaterOrEquals)]
fn test_comparator_synonyms(#[case] comparator: &str, #[case] expected: LogicalOperator) {
    let list = document(&format!("if a number {} 0 then add 1 to a value.", comparator));
    match only_statement(&list) {
        Statement::If { condition, .. } => assert_eq!(condition.logical_operator(), Some(expected)),
        other => panic!("Expected IfStatement, got {:?}", other),
    }
}

#[rstest]
#[case("the width is a number.\n\n42 is nonsense.\n\nadd 1 to a width.", 1)]
#[case("the width is a number. 42 is nonsense; add 1 to a width.", 0)]
fn test_invalid_fragment_is_contained(#[case] text: &str, #[case] paragraph: usize) {
    let list = parse_document(text);
    let invalid = list.invalid_statements();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].invalid_text().as_deref(), Some("42 is nonsense"));
    let range = invalid[0].range();
    assert_eq!(&text[range.start..range.end], "42 is nonsense");
    assert!(list.paragraphs[paragraph].statements.contains(invalid[0]));
}

#[rstest]
#[case("the width is a number.\n\n\n   \nthe height is a number.", 2)]
#[case("\n\nthe width is a number.\n\n", 1)]
#[case("a.\n\nb.\n\nc.", 3)]
#[case("", 0)]
fn test_paragraph_count(#[case] text: &str, #[case] expected: usize) {
    assert_eq!(parse_document(text).paragraphs.len(), expected);
}

#[test]
fn test_parsing_is_deterministic() {
    let text = "To do something: add 1 to a value.\n\nif a value is at least 3 then exit; result is 2.\n\nthe width is a number.";
    assert_eq!(parse(text), parse(text));
    assert_eq!(parse_document(text), parse_document(text));
}

#[rstest]
#[case("an apple", "identifier reference")]
#[case("the name is an apple", "variable declaration")]
#[case("add 42 to a value", "addition expression")]
#[case("\"Hello\"", "string literal")]
#[case("if a number is 0 then exit", "paragraph list")]
fn test_single_fragment_mode(#[case] text: &str, #[case] kind: &str) {
    let node = parse(text).unwrap();
    assert_eq!(node.as_node().kind_name(), kind);
}

#[test]
fn test_single_fragment_errors_abort() {
    let err = parse("add 42 to").unwrap_err();
    assert!(err.message.starts_with("Expected"), "{}", err.message);
    assert_eq!(err.offset, 9);
}

#[test]
fn test_custom_comment_marker() {
    let config = ParserConfig { comment_marker: '#', ..ParserConfig::default() };
    let text = "# setup\nthe width is a number.";
    match parse_with(text, &config) {
        Ok(SyntaxNode::ParagraphList(list)) => {
            assert!(list.invalid_statements().is_empty());
            assert_eq!(list.paragraphs[0].statements.len(), 1);
        }
        other => panic!("Expected ParagraphList, got {:?}", other),
    }
}

#[test]
fn test_nodes_serialize_to_json() {
    let list = parse_document("the width is a number.");
    let json = serde_json::to_value(&list).unwrap();
    assert_eq!(json["paragraphs"][0]["statements"][0]["VariableDeclaration"]["declaration"]["name"], "width");
}

#[test]
fn test_keyword_named_shape_keeps_slot_aliases() {
    let list = parse_document("a state of the art has a left at the x and a right.");
    match only_statement(&list) {
        Statement::ShapeDeclaration { declaration, .. } => {
            assert_eq!(declaration.name, "state of the art");
            let slots = declaration.slots.as_ref().unwrap();
            assert_eq!(slots[0].name, "left");
            assert_eq!(slots[0].alias_for.as_deref(), Some("x"));
            assert_eq!(slots[1].name, "right");
            assert_eq!(slots[1].alias_for, None);
        }
        other => panic!("Expected ShapeDeclarationStatement, got {:?}", other),
    }
}

#[test]
fn test_shape_base_without_article_keeps_slots() {
    let list = parse_document("a rectangle is shape with a width and a height.");
    match only_statement(&list) {
        Statement::ShapeDeclaration { declaration, .. } => {
            assert_eq!(declaration.base_shape.as_ref().map(|b| b.name.as_str()), Some("shape"));
            let names: Vec<&str> = declaration.slots.iter().flatten().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["width", "height"]);
        }
        other => panic!("Expected ShapeDeclarationStatement, got {:?}", other),
    }
}

#[test]
fn test_parenthesized_comment_is_not_an_error() {
    let list = parse_document("the width is a number (in pixels).\nadd 1 (one) to a width.");
    assert!(list.invalid_statements().is_empty());
    assert_eq!(list.paragraphs[0].statements.len(), 2);
}
