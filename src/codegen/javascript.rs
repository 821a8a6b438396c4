use super::{logical_operator, mangle, math_operator, CodeWriter, ConvertError, Converter, Target};
use crate::parser::ast::*;

pub struct JavaScriptConverter;

impl Converter for JavaScriptConverter {
    fn target(&self) -> Target {
        Target::JavaScript
    }

    fn convert_node(&self, node: NodeRef<'_>) -> Result<String, ConvertError> {
        let mut writer = CodeWriter::new();
        match node {
            NodeRef::ParagraphList(list) => {
                for paragraph in &list.paragraphs {
                    self.paragraph(&mut writer, paragraph)?;
                }
            }
            NodeRef::Paragraph(paragraph) => self.paragraph(&mut writer, paragraph)?,
            NodeRef::Statement(statement) => self.statement(&mut writer, statement)?,
            NodeRef::Expression(expression) => return self.expression(expression),
            NodeRef::VariableDeclaration(declaration) => return self.variable_declaration(declaration),
            NodeRef::ShapeDeclaration(shape) => {
                self.shape(&mut writer, shape);
                return Ok(writer.finish().trim_end().to_string());
            }
            NodeRef::IdentifierReference(reference) => return Ok(reference_path(reference)),
            NodeRef::TypeIdentifierReference(_) | NodeRef::SlotDeclaration(_) | NodeRef::InvokableLabel(_) => {
                return Err(self.unsupported(node.kind_name()))
            }
        }
        Ok(writer.finish())
    }
}

fn reference_path(reference: &IdentifierReference) -> String {
    reference.path().into_iter().map(mangle).collect::<Vec<_>>().join(".")
}

impl JavaScriptConverter {
    fn variable_declaration(&self, declaration: &VariableDeclaration) -> Result<String, ConvertError> {
        match &declaration.initializer {
            Some(initializer) => Ok(format!("let {} = {}", mangle(&declaration.name), self.expression(initializer)?)),
            None => Ok(format!("let {}", mangle(&declaration.name))),
        }
    }

    fn shape(&self, writer: &mut CodeWriter, shape: &ShapeDeclaration) {
        match &shape.base_shape {
            Some(base) => writer.emit(&format!("class {} extends {} {{", mangle(&shape.name), mangle(&base.name))),
            None => writer.emit(&format!("class {} {{", mangle(&shape.name))),
        }
        writer.push_indent();
        for slot in shape.slots.iter().flatten() {
            writer.emit(&format!("{};", mangle(&slot.name)));
        }
        writer.pop_indent();
        writer.emit("}");
    }

    fn function(
        &self,
        writer: &mut CodeWriter,
        label: &InvokableLabel,
        body: impl FnOnce(&mut CodeWriter) -> Result<(), ConvertError>,
    ) -> Result<(), ConvertError> {
        let parameters: Vec<String> = label.parameters.iter().map(|p| mangle(&p.name)).collect();
        writer.emit(&format!("function {}({}) {{", mangle(label.marker()), parameters.join(", ")));
        writer.push_indent();
        body(writer)?;
        writer.pop_indent();
        writer.emit("}");
        Ok(())
    }

    fn paragraph(&self, writer: &mut CodeWriter, paragraph: &Paragraph) -> Result<(), ConvertError> {
        let statements = |writer: &mut CodeWriter| -> Result<(), ConvertError> {
            for statement in &paragraph.statements {
                self.statement(writer, statement)?;
            }
            Ok(())
        };
        match &paragraph.label {
            Some(label) => self.function(writer, label, statements),
            None => statements(writer),
        }
    }

    fn statement(&self, writer: &mut CodeWriter, statement: &Statement) -> Result<(), ConvertError> {
        match statement {
            Statement::Block { statements, .. } => {
                for statement in statements {
                    self.statement(writer, statement)?;
                }
            }
            Statement::Paragraph(paragraph) => self.paragraph(writer, paragraph)?,
            Statement::VariableDeclaration { declaration, .. } => {
                writer.emit(&format!("{};", self.variable_declaration(declaration)?));
            }
            Statement::ShapeDeclaration { declaration, .. } => self.shape(writer, declaration),
            Statement::ConstantDeclaration { identifier, value, .. } => {
                writer.emit(&format!("const {} = {};", reference_path(identifier), self.expression(value)?));
            }
            Statement::UnitAliasDeclaration { identifier, value, base_unit, .. } => {
                writer.emit(&format!(
                    "const {} = {} * {};",
                    reference_path(identifier),
                    self.expression(value)?,
                    reference_path(base_unit)
                ));
            }
            Statement::PointerDeclaration { pointer_type, base_type, .. } => {
                let field = mangle(&base_type.name);
                writer.emit(&format!("public class {} // pointer", reference_path(pointer_type)));
                writer.open_braces();
                writer.emit(&format!("constructor({})", field));
                writer.open_braces();
                writer.emit(&format!("this.{} = {};", field, field));
                writer.close_braces();
                writer.close_braces();
            }
            Statement::Expression { expression, .. } => {
                writer.emit(&format!("{};", self.expression(expression)?));
            }
            Statement::If { condition, then, .. } => {
                writer.emit(&format!("if ({}) {{", self.expression(condition)?));
                writer.push_indent();
                self.statement(writer, then)?;
                writer.pop_indent();
                writer.emit("}");
            }
            Statement::Result { value, .. } => {
                writer.emit(&format!("return {};", self.expression(value)?));
            }
            Statement::Invocation { marker, parameters, result, .. } => {
                let parameters: Vec<String> = parameters.iter().map(reference_path).collect();
                let call = format!("{}({});", mangle(marker), parameters.join(", "));
                match result {
                    Some(result) => writer.emit(&format!("{} = {}", reference_path(result), call)),
                    None => writer.emit(&call),
                }
            }
            Statement::Labeled { label, statement, .. } => {
                self.function(writer, label, |writer| self.statement(writer, statement))?;
            }
            Statement::Invalid { .. } => return Err(self.unsupported(statement.kind_name())),
        }
        Ok(())
    }

    fn arithmetic(&self, target: &IdentifierReference, operator: &str, value: &Expression) -> Result<String, ConvertError> {
        Ok(format!("{} {} {}", reference_path(target), operator, self.expression(value)?))
    }

    fn expression(&self, expression: &Expression) -> Result<String, ConvertError> {
        let code = match expression {
            Expression::IntLiteral { value, .. } => value.to_string(),
            Expression::StringLiteral { value, .. } => format!("\"{}\"", value),
            Expression::ByteArrayLiteral { value, .. } => {
                let bytes: Vec<String> = value.iter().map(u8::to_string).collect();
                format!("new Uint8Array([{}])", bytes.join(", "))
            }
            Expression::InchLiteral { value, .. } => self.expression(value)?,
            Expression::RatioLiteral { numerator, denominator, .. } => format!("{} / {}", numerator, denominator),
            Expression::NullLiteral { .. } => "null".to_string(),
            Expression::Variable { identifier, .. } => reference_path(identifier),
            Expression::Posessive { identifier, owner, .. } => {
                format!("{}.{}", self.expression(owner)?, reference_path(identifier))
            }
            Expression::Assignment { variable, expression, .. } => self.arithmetic(variable, "=", expression)?,
            Expression::Addition { addend, target, .. } | Expression::InPlaceAddition { addend, target, .. } => {
                self.arithmetic(target, "+=", addend)?
            }
            Expression::Subtract { subtrahend, target, .. }
            | Expression::InPlaceSubtract { subtrahend, target, .. } => self.arithmetic(target, "-=", subtrahend)?,
            Expression::Multiply { factor, target, .. } | Expression::InPlaceMultiply { factor, target, .. } => {
                self.arithmetic(target, "*=", factor)?
            }
            Expression::Division { denominator, target, .. }
            | Expression::InPlaceDivision { denominator, target, .. } => self.arithmetic(target, "/=", denominator)?,
            Expression::Math { operator, first, second, .. } => format!(
                "{} {} {}",
                self.expression(first)?,
                math_operator(*operator),
                self.expression(second)?
            ),
            Expression::Logical { operator, first, second, .. } => {
                let Some(operator) = logical_operator(*operator) else {
                    return Err(self.unsupported(expression.kind_name()));
                };
                format!("{} {} {}", self.expression(first)?, operator, self.expression(second)?)
            }
            Expression::Invocation { marker, parameters, .. } => {
                let parameters = parameters
                    .iter()
                    .map(|p| self.expression(p))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("{}({})", mangle(marker), parameters.join(", "))
            }
            Expression::Invalid { .. } => return Err(self.unsupported(expression.kind_name())),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::segmenter::Segmenter;

    fn convert(input: &str) -> Result<String, ConvertError> {
        let config = ParserConfig::default();
        let node = Segmenter::new(&config).parse(input).unwrap();
        JavaScriptConverter.convert(&node)
    }

    #[test]
    fn test_declarations() {
        assert_eq!(convert("the name is an apple.").unwrap(), "let name;\n");
        assert_eq!(convert("the value is a number equal to 42.").unwrap(), "let value = 42;\n");
        assert_eq!(convert("The hundred is 100.").unwrap(), "const hundred = 100;\n");
        assert_eq!(convert("The million is 1000 thousands.").unwrap(), "const million = 1000 * thousand;\n");
    }

    #[test]
    fn test_pointer_declaration() {
        assert_eq!(
            convert("A data pointer is a pointer to a data.").unwrap(),
            "public class data_pointer // pointer\n{\n    constructor(data)\n    {\n        this.data = data;\n    }\n}\n"
        );
    }

    #[test]
    fn test_shapes() {
        assert_eq!(convert("an apple is an fruit.").unwrap(), "class apple extends fruit {\n}\n");
        assert_eq!(
            convert("a rectangle has a width and a height.").unwrap(),
            "class rectangle {\n    width;\n    height;\n}\n"
        );
    }

    #[test]
    fn test_arithmetic_and_conditions() {
        assert_eq!(convert("add 42 to a value").unwrap(), "value += 42");
        assert_eq!(
            convert("if a number is 0 then add 42 to a value; exit.").unwrap(),
            "if (number == 0) {\n    value += 42;\n    exit();\n}\n"
        );
        assert_eq!(
            convert("multiply a width of a rectangle by a height of a rectangle.").unwrap(),
            "rectangle.width *= rectangle.height;\n"
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            convert("To calculate area from a width and a height: result is 1.").unwrap(),
            "function calculate_area_from(width, height) {\n    return 1;\n}\n"
        );
        assert_eq!(
            convert("calculate factorial of a previous number into a previous factorial.").unwrap(),
            "previous_factorial = calculate_factorial_of(previous_number);\n"
        );
    }

    #[test]
    fn test_byte_array_literal() {
        assert_eq!(convert("The header is $0102.").unwrap(), "const header = new Uint8Array([1, 2]);\n");
    }

    #[test]
    fn test_invalid_nodes_are_unsupported() {
        let err = convert("42 is nonsense.").unwrap_err();
        assert_eq!(err, ConvertError::Unsupported { kind: "invalid statement", target: Target::JavaScript });
        let err = convert("if 3 then exit.").unwrap_err();
        assert_eq!(err.to_string(), "invalid expression is not supported by the JavaScript converter");
    }
}
