//! Tree-walking interpreter for the declarative and arithmetic subset.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::parser::ast::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Variable '{0}' is already declared.")]
    AlreadyDeclared(String),
    #[error("Variable '{0}' is not defined.")]
    Undefined(String),
    #[error("{0} are not yet supported.")]
    Unsupported(&'static str),
    #[error("Invalid {kind} `{code}`")]
    Invalid { kind: &'static str, code: String },
    #[error("Cannot apply {operation} to {left} and {right}.")]
    TypeMismatch { operation: &'static str, left: &'static str, right: &'static str },
    #[error("Condition must be a boolean, got {0}.")]
    NotACondition(&'static str),
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Integer overflow in {0}.")]
    Overflow(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "number",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(value) => write!(f, "{}", value),
            Value::Str(value) => write!(f, "\"{}\"", value),
            Value::Bytes(bytes) => {
                write!(f, "$")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// A declared name: its declared shape and current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSlot {
    pub name: String,
    pub shape: String,
    pub value: Value,
}

#[derive(Debug, Default)]
pub struct Vm {
    variables: HashMap<String, VariableSlot>,
    order: Vec<String>,
}

impl Vm {
    pub fn new() -> Self {
        Vm::default()
    }

    /// Parse `text` as a document and run it.
    pub fn execute_code(&mut self, text: &str) -> Result<(), RuntimeError> {
        let document = crate::parse_document(text);
        self.execute(&document)
    }

    pub fn execute(&mut self, document: &ParagraphList) -> Result<(), RuntimeError> {
        for paragraph in &document.paragraphs {
            self.paragraph(paragraph)?;
        }
        Ok(())
    }

    pub fn declaration(&self, name: &str) -> Option<&VariableSlot> {
        self.variables.get(name)
    }

    pub fn value(&self, name: &str) -> Result<&Value, RuntimeError> {
        self.variables
            .get(name)
            .map(|slot| &slot.value)
            .ok_or_else(|| RuntimeError::Undefined(name.to_string()))
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &VariableSlot> {
        self.order.iter().filter_map(|name| self.variables.get(name))
    }

    fn declare(&mut self, name: &str, shape: &str, value: Value) -> Result<(), RuntimeError> {
        if self.variables.contains_key(name) {
            return Err(RuntimeError::AlreadyDeclared(name.to_string()));
        }
        log::trace!("declare {} as {} = {}", name, shape, value);
        self.order.push(name.to_string());
        self.variables.insert(
            name.to_string(),
            VariableSlot { name: name.to_string(), shape: shape.to_string(), value },
        );
        Ok(())
    }

    fn paragraph(&mut self, paragraph: &Paragraph) -> Result<(), RuntimeError> {
        if paragraph.label.is_some() {
            return Err(RuntimeError::Unsupported("Paragraph labels"));
        }
        for statement in &paragraph.statements {
            self.statement(statement)?;
        }
        Ok(())
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), RuntimeError> {
        match statement {
            Statement::Block { statements, .. } => {
                for statement in statements {
                    self.statement(statement)?;
                }
                Ok(())
            }
            Statement::Paragraph(paragraph) => self.paragraph(paragraph),
            Statement::VariableDeclaration { declaration, .. } => {
                let value = match &declaration.initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Null,
                };
                self.declare(&declaration.name, &declaration.type_reference.name, value)
            }
            Statement::ConstantDeclaration { identifier, value, .. } => {
                let name = local_name(identifier)?;
                let value = self.evaluate(value)?;
                let shape = value.type_name();
                self.declare(name, shape, value)
            }
            Statement::Expression { expression, .. } => self.evaluate(expression).map(|_| ()),
            Statement::If { condition, then, .. } => match self.evaluate(condition)? {
                Value::Bool(true) => self.statement(then),
                Value::Bool(false) => Ok(()),
                other => Err(RuntimeError::NotACondition(other.type_name())),
            },
            Statement::ShapeDeclaration { .. } => Err(RuntimeError::Unsupported("Shape declaration statements")),
            Statement::UnitAliasDeclaration { .. } => {
                Err(RuntimeError::Unsupported("Unit alias declaration statements"))
            }
            Statement::PointerDeclaration { .. } => Err(RuntimeError::Unsupported("Pointer declaration statements")),
            Statement::Result { .. } => Err(RuntimeError::Unsupported("Result statements")),
            Statement::Invocation { .. } => Err(RuntimeError::Unsupported("Invocation statements")),
            Statement::Labeled { .. } => Err(RuntimeError::Unsupported("Labeled statements")),
            Statement::Invalid { .. } => Err(RuntimeError::Invalid {
                kind: "statement",
                code: statement.invalid_text().unwrap_or_default(),
            }),
        }
    }

    fn read(&self, reference: &IdentifierReference) -> Result<Value, RuntimeError> {
        let name = local_name(reference)?;
        self.value(name).cloned()
    }

    /// Store into an existing variable, declaring it on first assignment.
    fn write(&mut self, reference: &IdentifierReference, value: Value) -> Result<Value, RuntimeError> {
        let name = local_name(reference)?;
        match self.variables.get_mut(name) {
            Some(slot) => slot.value = value.clone(),
            None => {
                log::debug!("implicit declaration of '{}'", name);
                let shape = value.type_name();
                self.declare(name, shape, value.clone())?;
            }
        }
        Ok(value)
    }

    fn update(
        &mut self,
        target: &IdentifierReference,
        operator: MathOperator,
        operand: &Expression,
    ) -> Result<Value, RuntimeError> {
        let current = self.read(target)?;
        let operand = self.evaluate(operand)?;
        let value = math(operator, current, operand)?;
        self.write(target, value)
    }

    fn evaluate(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        match expression {
            Expression::NullLiteral { .. } => Ok(Value::Null),
            Expression::IntLiteral { value, .. } => Ok(Value::Int(*value)),
            Expression::StringLiteral { value, .. } => Ok(Value::Str(value.clone())),
            Expression::ByteArrayLiteral { value, .. } => Ok(Value::Bytes(value.clone())),
            Expression::InchLiteral { value, .. } => self.evaluate(value),
            Expression::RatioLiteral { .. } => Err(RuntimeError::Unsupported("Ratio literals")),
            Expression::Variable { identifier, .. } => self.read(identifier),
            Expression::Posessive { .. } => Err(RuntimeError::Unsupported("Slot accesses")),
            Expression::Assignment { variable, expression, .. } => {
                let value = self.evaluate(expression)?;
                self.write(variable, value)
            }
            Expression::Addition { addend, target, .. } | Expression::InPlaceAddition { addend, target, .. } => {
                self.update(target, MathOperator::Plus, addend)
            }
            Expression::Subtract { subtrahend, target, .. }
            | Expression::InPlaceSubtract { subtrahend, target, .. } => {
                self.update(target, MathOperator::Minus, subtrahend)
            }
            Expression::Multiply { factor, target, .. } | Expression::InPlaceMultiply { factor, target, .. } => {
                self.update(target, MathOperator::Multiply, factor)
            }
            Expression::Division { denominator, target, .. }
            | Expression::InPlaceDivision { denominator, target, .. } => {
                self.update(target, MathOperator::Divide, denominator)
            }
            Expression::Math { operator, first, second, .. } => {
                let first = self.evaluate(first)?;
                let second = self.evaluate(second)?;
                math(*operator, first, second)
            }
            Expression::Logical { operator, first, second, .. } => {
                let first = self.evaluate(first)?;
                let second = self.evaluate(second)?;
                compare(*operator, &first, &second)
            }
            Expression::Invocation { .. } => Err(RuntimeError::Unsupported("Invocation expressions")),
            Expression::Invalid { code, .. } => Err(RuntimeError::Invalid { kind: "expression", code: code.clone() }),
        }
    }
}

/// Owned references are slot accesses.
fn local_name(reference: &IdentifierReference) -> Result<&str, RuntimeError> {
    match reference.owner {
        Some(_) => Err(RuntimeError::Unsupported("Slot accesses")),
        None => Ok(&reference.name),
    }
}

fn math(operator: MathOperator, first: Value, second: Value) -> Result<Value, RuntimeError> {
    let operation = match operator {
        MathOperator::Plus => "addition",
        MathOperator::Minus => "subtraction",
        MathOperator::Multiply => "multiplication",
        MathOperator::Divide => "division",
    };
    match (first, second) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match operator {
                MathOperator::Plus => a.checked_add(b),
                MathOperator::Minus => a.checked_sub(b),
                MathOperator::Multiply => a.checked_mul(b),
                MathOperator::Divide if b == 0 => return Err(RuntimeError::DivisionByZero),
                MathOperator::Divide => a.checked_div(b),
            };
            result.map(Value::Int).ok_or(RuntimeError::Overflow(operation))
        }
        (Value::Str(a), Value::Str(b)) if operator == MathOperator::Plus => Ok(Value::Str(a + &b)),
        (first, second) => Err(RuntimeError::TypeMismatch {
            operation,
            left: first.type_name(),
            right: second.type_name(),
        }),
    }
}

fn compare(operator: LogicalOperator, first: &Value, second: &Value) -> Result<Value, RuntimeError> {
    let ordering = match (first, second) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let result = match (operator, ordering) {
        (LogicalOperator::Equals, _) => first == second,
        (LogicalOperator::NotEquals, _) => first != second,
        (LogicalOperator::Less, Some(ordering)) => ordering.is_lt(),
        (LogicalOperator::LessOrEquals, Some(ordering)) => ordering.is_le(),
        (LogicalOperator::Greater, Some(ordering)) => ordering.is_gt(),
        (LogicalOperator::GreaterOrEquals, Some(ordering)) => ordering.is_ge(),
        (LogicalOperator::Invalid, _) => {
            return Err(RuntimeError::Invalid { kind: "comparison", code: format!("{} ? {}", first, second) })
        }
        (_, None) => {
            return Err(RuntimeError::TypeMismatch {
                operation: "comparison",
                left: first.type_name(),
                right: second.type_name(),
            })
        }
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vm {
        let mut vm = Vm::new();
        vm.execute_code(text).unwrap();
        vm
    }

    #[test]
    fn test_new_variable_declaration() {
        let vm = run("the width is a number.");
        let slot = vm.declaration("width").unwrap();
        assert_eq!(slot.name, "width");
        assert_eq!(slot.shape, "number");
        assert_eq!(slot.value, Value::Null);
    }

    #[test]
    fn test_redeclaration_fails() {
        let mut vm = run("the width is a number.");
        let err = vm.execute_code("the width is a number.").unwrap_err();
        assert_eq!(err.to_string(), "Variable 'width' is already declared.");
    }

    #[test]
    fn test_initializers() {
        let vm = run("the width is a number equals to 5.");
        assert_eq!(vm.value("width"), Ok(&Value::Int(5)));
        let vm = run("the greeting is a string equals to \"Hello\".");
        assert_eq!(vm.value("greeting"), Ok(&Value::Str("Hello".into())));
    }

    #[test]
    fn test_implicit_declaration_and_addition() {
        let vm = run("let a value equals 10.");
        assert_eq!(vm.value("value"), Ok(&Value::Int(10)));
        assert_eq!(vm.declaration("value").map(|slot| slot.shape.as_str()), Some("number"));

        let vm = run("let a value equals 10. add 20 to a value.");
        assert_eq!(vm.value("value"), Ok(&Value::Int(30)));
    }

    #[test]
    fn test_arithmetic_sequence() {
        let vm = run("put 40 into a value. add 2 to a value; subtract 4 from a value; multiply a value by 3; divide a value by 2.");
        assert_eq!(vm.value("value"), Ok(&Value::Int(57)));
    }

    #[test]
    fn test_undefined_read() {
        let vm = Vm::new();
        assert_eq!(vm.value("height").unwrap_err().to_string(), "Variable 'height' is not defined.");

        let mut vm = Vm::new();
        let err = vm.execute_code("add 1 to a height.").unwrap_err();
        assert_eq!(err, RuntimeError::Undefined("height".into()));
    }

    #[test]
    fn test_checked_math() {
        let mut vm = Vm::new();
        let err = vm.execute_code("let a value equals 1. divide a value by 0.").unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero);

        let mut vm = Vm::new();
        let err = vm
            .execute_code("let a value equals 9223372036854775807. add 1 to a value.")
            .unwrap_err();
        assert_eq!(err, RuntimeError::Overflow("addition"));
    }

    #[test]
    fn test_string_concatenation() {
        let vm = run("let a greeting equals \"Hello\". add \", world\" to a greeting.");
        assert_eq!(vm.value("greeting"), Ok(&Value::Str("Hello, world".into())));
    }

    #[test]
    fn test_if_statement() {
        let vm = run("let a value equals 0. if a value is 0 then add 42 to a value.");
        assert_eq!(vm.value("value"), Ok(&Value::Int(42)));
        let vm = run("let a value equals 1. if a value is 0 then add 42 to a value.");
        assert_eq!(vm.value("value"), Ok(&Value::Int(1)));
        let vm = run("let a value equals 5. if a value is greater than 3 then subtract 1 from a value; add 10 to a value.");
        assert_eq!(vm.value("value"), Ok(&Value::Int(14)));
    }

    #[test]
    fn test_unsupported_and_invalid() {
        let mut vm = Vm::new();
        let err = vm.execute_code("a rectangle has a width and a height.").unwrap_err();
        assert_eq!(err.to_string(), "Shape declaration statements are not yet supported.");

        let mut vm = Vm::new();
        let err = vm.execute_code("to do something: result is 1.").unwrap_err();
        assert_eq!(err, RuntimeError::Unsupported("Paragraph labels"));

        let mut vm = Vm::new();
        let err = vm.execute_code("42 is nonsense.").unwrap_err();
        assert_eq!(err.to_string(), "Invalid statement `42 is nonsense`");
    }

    #[test]
    fn test_constants_and_declaration_order() {
        let vm = run("The hundred is 100. the width is a number equals to 5.");
        let names: Vec<&str> = vm.variables().map(|slot| slot.name.as_str()).collect();
        assert_eq!(names, vec!["hundred", "width"]);
        assert_eq!(vm.value("hundred"), Ok(&Value::Int(100)));
    }
}
