use serde::Serialize;

use crate::lexer::Token;

/// Byte range of a node in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Range { start, end }
    }

    pub fn of(token: &Token) -> Self {
        Range::new(token.start, token.end)
    }

    pub fn cover(self, other: Range) -> Self {
        Range::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MathOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOperator {
    Equals,
    NotEquals,
    Less,
    LessOrEquals,
    Greater,
    GreaterOrEquals,
    Invalid,
}

/// A use of a name. `owner` is the possessor in `a rectangle's width` or
/// `a width of a rectangle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierReference {
    pub name: String,
    pub owner: Option<Box<IdentifierReference>>,
    pub range: Range,
}

impl IdentifierReference {
    pub fn new(name: impl Into<String>, range: Range) -> Self {
        IdentifierReference { name: name.into(), owner: None, range }
    }

    /// Attach `owner` at the far end of the existing possessor chain.
    pub fn with_root_owner(mut self, owner: IdentifierReference) -> Self {
        self.range = self.range.cover(owner.range);
        self.owner = Some(Box::new(match self.owner.take() {
            None => owner,
            Some(existing) => existing.with_root_owner(owner),
        }));
        self
    }

    /// Names from the outermost owner down to this one.
    pub fn path(&self) -> Vec<&str> {
        let mut path = match &self.owner {
            Some(owner) => owner.path(),
            None => Vec::new(),
        };
        path.push(&self.name);
        path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeIdentifierReference {
    pub name: String,
    pub is_collection: bool,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub type_reference: TypeIdentifierReference,
    pub initializer: Option<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotDeclaration {
    pub name: String,
    pub alias_for: Option<String>,
    pub is_collection: bool,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeDeclaration {
    pub name: String,
    pub base_shape: Option<TypeIdentifierReference>,
    pub slots: Option<Vec<SlotDeclaration>>,
    pub range: Range,
}

/// Procedure header. Alias headers in one paragraph add extra markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvokableLabel {
    pub markers: Vec<String>,
    pub parameters: Vec<IdentifierReference>,
    pub result: Option<IdentifierReference>,
    pub range: Range,
}

impl InvokableLabel {
    pub fn marker(&self) -> &str {
        self.markers.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paragraph {
    pub statements: Vec<Statement>,
    pub label: Option<InvokableLabel>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphList {
    pub paragraphs: Vec<Paragraph>,
    pub range: Range,
}

impl ParagraphList {
    /// Every `Invalid` statement in document order, however deeply nested.
    pub fn invalid_statements(&self) -> Vec<&Statement> {
        let mut found = Vec::new();
        let mut pending: Vec<NodeRef<'_>> = vec![NodeRef::ParagraphList(self)];
        while let Some(node) = pending.pop() {
            if let NodeRef::Statement(statement @ Statement::Invalid { .. }) = node {
                found.push(statement);
            }
            let mut children = node.children();
            children.reverse();
            pending.extend(children);
        }
        found
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    Block {
        statements: Vec<Statement>,
        range: Range,
    },
    Paragraph(Paragraph),
    VariableDeclaration {
        declaration: VariableDeclaration,
        range: Range,
    },
    ShapeDeclaration {
        declaration: ShapeDeclaration,
        range: Range,
    },
    ConstantDeclaration {
        identifier: IdentifierReference,
        value: Expression,
        range: Range,
    },
    UnitAliasDeclaration {
        identifier: IdentifierReference,
        value: Expression,
        base_unit: IdentifierReference,
        range: Range,
    },
    PointerDeclaration {
        pointer_type: IdentifierReference,
        base_type: TypeIdentifierReference,
        range: Range,
    },
    Expression {
        expression: Expression,
        range: Range,
    },
    If {
        condition: Expression,
        then: Box<Statement>,
        range: Range,
    },
    Result {
        value: Expression,
        range: Range,
    },
    Invocation {
        marker: String,
        parameters: Vec<IdentifierReference>,
        result: Option<IdentifierReference>,
        range: Range,
    },
    Labeled {
        label: InvokableLabel,
        statement: Box<Statement>,
        range: Range,
    },
    Invalid {
        tokens: Vec<Token>,
        range: Range,
    },
}

impl Statement {
    pub fn range(&self) -> Range {
        match self {
            Statement::Paragraph(paragraph) => paragraph.range,
            Statement::Block { range, .. }
            | Statement::VariableDeclaration { range, .. }
            | Statement::ShapeDeclaration { range, .. }
            | Statement::ConstantDeclaration { range, .. }
            | Statement::UnitAliasDeclaration { range, .. }
            | Statement::PointerDeclaration { range, .. }
            | Statement::Expression { range, .. }
            | Statement::If { range, .. }
            | Statement::Result { range, .. }
            | Statement::Invocation { range, .. }
            | Statement::Labeled { range, .. }
            | Statement::Invalid { range, .. } => *range,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Block { .. } => "block statement",
            Statement::Paragraph(_) => "paragraph",
            Statement::VariableDeclaration { .. } => "variable declaration statement",
            Statement::ShapeDeclaration { .. } => "shape declaration statement",
            Statement::ConstantDeclaration { .. } => "constant declaration statement",
            Statement::UnitAliasDeclaration { .. } => "unit alias declaration statement",
            Statement::PointerDeclaration { .. } => "pointer declaration statement",
            Statement::Expression { .. } => "expression statement",
            Statement::If { .. } => "if statement",
            Statement::Result { .. } => "result statement",
            Statement::Invocation { .. } => "invocation statement",
            Statement::Labeled { .. } => "labeled statement",
            Statement::Invalid { .. } => "invalid statement",
        }
    }

    /// Source words of an invalid statement, space separated.
    pub fn invalid_text(&self) -> Option<String> {
        match self {
            Statement::Invalid { tokens, .. } => Some(
                tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" "),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    IntLiteral {
        value: i64,
        range: Range,
    },
    StringLiteral {
        value: String,
        range: Range,
    },
    ByteArrayLiteral {
        value: Vec<u8>,
        range: Range,
    },
    InchLiteral {
        value: Box<Expression>,
        range: Range,
    },
    RatioLiteral {
        numerator: i64,
        denominator: i64,
        range: Range,
    },
    NullLiteral {
        range: Range,
    },
    Variable {
        identifier: IdentifierReference,
        range: Range,
    },
    Posessive {
        identifier: IdentifierReference,
        owner: Box<Expression>,
        range: Range,
    },
    Assignment {
        variable: IdentifierReference,
        expression: Box<Expression>,
        range: Range,
    },
    Addition {
        addend: Box<Expression>,
        target: IdentifierReference,
        range: Range,
    },
    Subtract {
        subtrahend: Box<Expression>,
        target: IdentifierReference,
        range: Range,
    },
    Multiply {
        factor: Box<Expression>,
        target: IdentifierReference,
        range: Range,
    },
    Division {
        denominator: Box<Expression>,
        target: IdentifierReference,
        range: Range,
    },
    InPlaceAddition {
        addend: Box<Expression>,
        target: IdentifierReference,
        range: Range,
    },
    InPlaceSubtract {
        subtrahend: Box<Expression>,
        target: IdentifierReference,
        range: Range,
    },
    InPlaceMultiply {
        factor: Box<Expression>,
        target: IdentifierReference,
        range: Range,
    },
    InPlaceDivision {
        denominator: Box<Expression>,
        target: IdentifierReference,
        range: Range,
    },
    Math {
        operator: MathOperator,
        first: Box<Expression>,
        second: Box<Expression>,
        range: Range,
    },
    Logical {
        operator: LogicalOperator,
        first: Box<Expression>,
        second: Box<Expression>,
        range: Range,
    },
    Invocation {
        marker: String,
        parameters: Vec<Expression>,
        range: Range,
    },
    Invalid {
        code: String,
        range: Range,
    },
}

impl Expression {
    pub fn range(&self) -> Range {
        match self {
            Expression::IntLiteral { range, .. }
            | Expression::StringLiteral { range, .. }
            | Expression::ByteArrayLiteral { range, .. }
            | Expression::InchLiteral { range, .. }
            | Expression::RatioLiteral { range, .. }
            | Expression::NullLiteral { range }
            | Expression::Variable { range, .. }
            | Expression::Posessive { range, .. }
            | Expression::Assignment { range, .. }
            | Expression::Addition { range, .. }
            | Expression::Subtract { range, .. }
            | Expression::Multiply { range, .. }
            | Expression::Division { range, .. }
            | Expression::InPlaceAddition { range, .. }
            | Expression::InPlaceSubtract { range, .. }
            | Expression::InPlaceMultiply { range, .. }
            | Expression::InPlaceDivision { range, .. }
            | Expression::Math { range, .. }
            | Expression::Logical { range, .. }
            | Expression::Invocation { range, .. }
            | Expression::Invalid { range, .. } => *range,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::IntLiteral { .. } => "int literal",
            Expression::StringLiteral { .. } => "string literal",
            Expression::ByteArrayLiteral { .. } => "byte array literal",
            Expression::InchLiteral { .. } => "inch literal",
            Expression::RatioLiteral { .. } => "ratio literal",
            Expression::NullLiteral { .. } => "null literal",
            Expression::Variable { .. } => "variable expression",
            Expression::Posessive { .. } => "posessive expression",
            Expression::Assignment { .. } => "assignment expression",
            Expression::Addition { .. } => "addition expression",
            Expression::Subtract { .. } => "subtract expression",
            Expression::Multiply { .. } => "multiply expression",
            Expression::Division { .. } => "division expression",
            Expression::InPlaceAddition { .. } => "in-place addition expression",
            Expression::InPlaceSubtract { .. } => "in-place subtract expression",
            Expression::InPlaceMultiply { .. } => "in-place multiply expression",
            Expression::InPlaceDivision { .. } => "in-place division expression",
            Expression::Math { .. } => "math expression",
            Expression::Logical { .. } => "logical expression",
            Expression::Invocation { .. } => "invocation expression",
            Expression::Invalid { .. } => "invalid expression",
        }
    }

    /// Invalid expressions count as logical ones with an `Invalid` operator.
    pub fn logical_operator(&self) -> Option<LogicalOperator> {
        match self {
            Expression::Logical { operator, .. } => Some(*operator),
            Expression::Invalid { .. } => Some(LogicalOperator::Invalid),
            _ => None,
        }
    }
}

/// Owned root of the closed node set returned by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyntaxNode {
    ParagraphList(ParagraphList),
    Paragraph(Paragraph),
    Statement(Statement),
    Expression(Expression),
    VariableDeclaration(VariableDeclaration),
    ShapeDeclaration(ShapeDeclaration),
    SlotDeclaration(SlotDeclaration),
    IdentifierReference(IdentifierReference),
    TypeIdentifierReference(TypeIdentifierReference),
    InvokableLabel(InvokableLabel),
}

impl SyntaxNode {
    pub fn as_node(&self) -> NodeRef<'_> {
        match self {
            SyntaxNode::ParagraphList(n) => NodeRef::ParagraphList(n),
            SyntaxNode::Paragraph(n) => NodeRef::Paragraph(n),
            SyntaxNode::Statement(n) => NodeRef::Statement(n),
            SyntaxNode::Expression(n) => NodeRef::Expression(n),
            SyntaxNode::VariableDeclaration(n) => NodeRef::VariableDeclaration(n),
            SyntaxNode::ShapeDeclaration(n) => NodeRef::ShapeDeclaration(n),
            SyntaxNode::SlotDeclaration(n) => NodeRef::SlotDeclaration(n),
            SyntaxNode::IdentifierReference(n) => NodeRef::IdentifierReference(n),
            SyntaxNode::TypeIdentifierReference(n) => NodeRef::TypeIdentifierReference(n),
            SyntaxNode::InvokableLabel(n) => NodeRef::InvokableLabel(n),
        }
    }

    pub fn range(&self) -> Range {
        self.as_node().range()
    }

    pub fn children(&self) -> Vec<NodeRef<'_>> {
        self.as_node().children()
    }
}

/// Borrowed view of any node, used for traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    ParagraphList(&'a ParagraphList),
    Paragraph(&'a Paragraph),
    Statement(&'a Statement),
    Expression(&'a Expression),
    VariableDeclaration(&'a VariableDeclaration),
    ShapeDeclaration(&'a ShapeDeclaration),
    SlotDeclaration(&'a SlotDeclaration),
    IdentifierReference(&'a IdentifierReference),
    TypeIdentifierReference(&'a TypeIdentifierReference),
    InvokableLabel(&'a InvokableLabel),
}

impl<'a> NodeRef<'a> {
    pub fn range(&self) -> Range {
        match self {
            NodeRef::ParagraphList(n) => n.range,
            NodeRef::Paragraph(n) => n.range,
            NodeRef::Statement(n) => n.range(),
            NodeRef::Expression(n) => n.range(),
            NodeRef::VariableDeclaration(n) => n.range,
            NodeRef::ShapeDeclaration(n) => n.range,
            NodeRef::SlotDeclaration(n) => n.range,
            NodeRef::IdentifierReference(n) => n.range,
            NodeRef::TypeIdentifierReference(n) => n.range,
            NodeRef::InvokableLabel(n) => n.range,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::ParagraphList(_) => "paragraph list",
            NodeRef::Paragraph(_) => "paragraph",
            NodeRef::Statement(n) => n.kind_name(),
            NodeRef::Expression(n) => n.kind_name(),
            NodeRef::VariableDeclaration(_) => "variable declaration",
            NodeRef::ShapeDeclaration(_) => "shape declaration",
            NodeRef::SlotDeclaration(_) => "slot declaration",
            NodeRef::IdentifierReference(_) => "identifier reference",
            NodeRef::TypeIdentifierReference(_) => "type identifier reference",
            NodeRef::InvokableLabel(_) => "invokable label",
        }
    }

    /// Immediate children in source order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match *self {
            NodeRef::ParagraphList(list) => list.paragraphs.iter().map(NodeRef::Paragraph).collect(),
            NodeRef::Paragraph(paragraph) => paragraph_children(paragraph),
            NodeRef::Statement(statement) => statement_children(statement),
            NodeRef::Expression(expression) => expression_children(expression),
            NodeRef::VariableDeclaration(declaration) => {
                let mut children = vec![NodeRef::TypeIdentifierReference(&declaration.type_reference)];
                children.extend(declaration.initializer.iter().map(NodeRef::Expression));
                children
            }
            NodeRef::ShapeDeclaration(shape) => {
                let mut children: Vec<NodeRef<'a>> =
                    shape.base_shape.iter().map(NodeRef::TypeIdentifierReference).collect();
                if let Some(slots) = &shape.slots {
                    children.extend(slots.iter().map(NodeRef::SlotDeclaration));
                }
                children
            }
            NodeRef::IdentifierReference(reference) => reference
                .owner
                .iter()
                .map(|owner| NodeRef::IdentifierReference(owner.as_ref()))
                .collect(),
            NodeRef::InvokableLabel(label) => {
                let mut children: Vec<NodeRef<'a>> =
                    label.parameters.iter().map(NodeRef::IdentifierReference).collect();
                children.extend(label.result.iter().map(NodeRef::IdentifierReference));
                children
            }
            NodeRef::SlotDeclaration(_) | NodeRef::TypeIdentifierReference(_) => Vec::new(),
        }
    }
}

fn paragraph_children(paragraph: &Paragraph) -> Vec<NodeRef<'_>> {
    let mut children: Vec<NodeRef<'_>> = paragraph.label.iter().map(NodeRef::InvokableLabel).collect();
    children.extend(paragraph.statements.iter().map(NodeRef::Statement));
    children
}

fn statement_children(statement: &Statement) -> Vec<NodeRef<'_>> {
    match statement {
        Statement::Block { statements, .. } => statements.iter().map(NodeRef::Statement).collect(),
        Statement::Paragraph(paragraph) => paragraph_children(paragraph),
        Statement::VariableDeclaration { declaration, .. } => vec![NodeRef::VariableDeclaration(declaration)],
        Statement::ShapeDeclaration { declaration, .. } => vec![NodeRef::ShapeDeclaration(declaration)],
        Statement::ConstantDeclaration { identifier, value, .. } => {
            vec![NodeRef::IdentifierReference(identifier), NodeRef::Expression(value)]
        }
        Statement::UnitAliasDeclaration { identifier, value, base_unit, .. } => vec![
            NodeRef::IdentifierReference(identifier),
            NodeRef::Expression(value),
            NodeRef::IdentifierReference(base_unit),
        ],
        Statement::PointerDeclaration { pointer_type, base_type, .. } => vec![
            NodeRef::IdentifierReference(pointer_type),
            NodeRef::TypeIdentifierReference(base_type),
        ],
        Statement::Expression { expression, .. } => vec![NodeRef::Expression(expression)],
        Statement::If { condition, then, .. } => {
            vec![NodeRef::Expression(condition), NodeRef::Statement(then)]
        }
        Statement::Result { value, .. } => vec![NodeRef::Expression(value)],
        Statement::Invocation { parameters, result, .. } => {
            let mut children: Vec<NodeRef<'_>> =
                parameters.iter().map(NodeRef::IdentifierReference).collect();
            children.extend(result.iter().map(NodeRef::IdentifierReference));
            children
        }
        Statement::Labeled { label, statement, .. } => {
            vec![NodeRef::InvokableLabel(label), NodeRef::Statement(statement)]
        }
        Statement::Invalid { .. } => Vec::new(),
    }
}

fn expression_children(expression: &Expression) -> Vec<NodeRef<'_>> {
    match expression {
        Expression::InchLiteral { value, .. } => vec![NodeRef::Expression(value)],
        Expression::Variable { identifier, .. } => vec![NodeRef::IdentifierReference(identifier)],
        Expression::Posessive { identifier, owner, .. } => {
            vec![NodeRef::Expression(owner), NodeRef::IdentifierReference(identifier)]
        }
        Expression::Assignment { variable, expression, .. } => {
            vec![NodeRef::IdentifierReference(variable), NodeRef::Expression(expression)]
        }
        Expression::Addition { addend: operand, target, .. }
        | Expression::Subtract { subtrahend: operand, target, .. }
        | Expression::Multiply { factor: operand, target, .. }
        | Expression::Division { denominator: operand, target, .. }
        | Expression::InPlaceAddition { addend: operand, target, .. }
        | Expression::InPlaceSubtract { subtrahend: operand, target, .. }
        | Expression::InPlaceMultiply { factor: operand, target, .. }
        | Expression::InPlaceDivision { denominator: operand, target, .. } => {
            vec![NodeRef::IdentifierReference(target), NodeRef::Expression(operand)]
        }
        Expression::Math { first, second, .. } | Expression::Logical { first, second, .. } => {
            vec![NodeRef::Expression(first), NodeRef::Expression(second)]
        }
        Expression::Invocation { parameters, .. } => parameters.iter().map(NodeRef::Expression).collect(),
        Expression::IntLiteral { .. }
        | Expression::StringLiteral { .. }
        | Expression::ByteArrayLiteral { .. }
        | Expression::RatioLiteral { .. }
        | Expression::NullLiteral { .. }
        | Expression::Invalid { .. } => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str, start: usize, end: usize) -> IdentifierReference {
        IdentifierReference::new(name, Range::new(start, end))
    }

    #[test]
    fn test_root_owner_extends_possessor_chain() {
        let hinge = reference("hinge", 0, 5).with_root_owner(reference("lid", 10, 13));
        let hinge = hinge.with_root_owner(reference("box", 20, 23));
        assert_eq!(hinge.path(), vec!["box", "lid", "hinge"]);
        assert_eq!(hinge.range, Range::new(0, 23));
    }

    #[test]
    fn test_invalid_statements_are_found_in_nested_blocks() {
        let invalid = Statement::Invalid { tokens: Vec::new(), range: Range::new(3, 4) };
        let list = ParagraphList {
            paragraphs: vec![Paragraph {
                statements: vec![Statement::If {
                    condition: Expression::NullLiteral { range: Range::default() },
                    then: Box::new(Statement::Block {
                        statements: vec![invalid.clone()],
                        range: Range::new(3, 4),
                    }),
                    range: Range::new(0, 4),
                }],
                label: None,
                range: Range::new(0, 4),
            }],
            range: Range::new(0, 4),
        };
        assert_eq!(list.invalid_statements(), vec![&invalid]);
    }

    #[test]
    fn test_invalid_expression_reports_invalid_operator() {
        let expression = Expression::Invalid { code: "3".into(), range: Range::default() };
        assert_eq!(expression.logical_operator(), Some(LogicalOperator::Invalid));
        assert_eq!(
            Expression::IntLiteral { value: 1, range: Range::default() }.logical_operator(),
            None
        );
    }
}
