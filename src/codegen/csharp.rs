use super::{logical_operator, mangle, math_operator, CodeWriter, ConvertError, Converter, Target};
use crate::parser::ast::*;

const RESERVED_WORDS: &[&str] = &["byte", "string"];

pub struct CSharpConverter;

fn identifier(name: &str) -> String {
    if RESERVED_WORDS.contains(&name) {
        format!("@{}", name)
    } else {
        mangle(name)
    }
}

impl Converter for CSharpConverter {
    fn target(&self) -> Target {
        Target::CSharp
    }

    fn convert_node(&self, node: NodeRef<'_>) -> Result<String, ConvertError> {
        match node {
            NodeRef::ParagraphList(list) => {
                let mut writer = CodeWriter::new();
                for paragraph in &list.paragraphs {
                    self.paragraph(&mut writer, paragraph)?;
                }
                Ok(writer.finish())
            }
            NodeRef::Paragraph(paragraph) => {
                let mut writer = CodeWriter::new();
                self.paragraph(&mut writer, paragraph)?;
                Ok(writer.finish())
            }
            NodeRef::Statement(statement) => {
                let mut writer = CodeWriter::new();
                self.statement(&mut writer, statement)?;
                Ok(writer.finish())
            }
            NodeRef::Expression(expression) => self.expression(expression),
            NodeRef::VariableDeclaration(declaration) => self.variable_declaration(declaration),
            NodeRef::ShapeDeclaration(shape) => {
                let mut writer = CodeWriter::new();
                self.shape(&mut writer, shape);
                Ok(writer.finish().trim_end().to_string())
            }
            NodeRef::IdentifierReference(reference) => Ok(self.reference(reference)),
            NodeRef::TypeIdentifierReference(type_reference) => Ok(self.type_name(type_reference)),
            NodeRef::SlotDeclaration(_) | NodeRef::InvokableLabel(_) => Err(self.unsupported(node.kind_name())),
        }
    }
}

impl CSharpConverter {
    fn reference(&self, reference: &IdentifierReference) -> String {
        match &reference.owner {
            Some(owner) => format!("{}.{}", self.reference(owner), identifier(&reference.name)),
            None => identifier(&reference.name),
        }
    }

    fn type_name(&self, type_reference: &TypeIdentifierReference) -> String {
        let name = mangle(&type_reference.name);
        if type_reference.is_collection {
            format!("{}[]", name)
        } else {
            name
        }
    }

    fn variable_declaration(&self, declaration: &VariableDeclaration) -> Result<String, ConvertError> {
        let mut code = format!("{} {}", self.type_name(&declaration.type_reference), identifier(&declaration.name));
        if let Some(initializer) = &declaration.initializer {
            code.push_str(" = ");
            code.push_str(&self.expression(initializer)?);
        }
        Ok(code)
    }

    fn shape(&self, writer: &mut CodeWriter, shape: &ShapeDeclaration) {
        match &shape.base_shape {
            Some(base) => writer.emit(&format!("public class {} : {}", mangle(&shape.name), mangle(&base.name))),
            None => writer.emit(&format!("public class {}", mangle(&shape.name))),
        }
        writer.open_braces();
        for slot in shape.slots.iter().flatten() {
            writer.emit(&format!("public object {};", identifier(&slot.name)));
        }
        writer.close_braces();
    }

    fn constant_type(&self, value: &Expression) -> Result<&'static str, ConvertError> {
        match value {
            Expression::IntLiteral { .. } | Expression::InchLiteral { .. } => Ok("long"),
            Expression::StringLiteral { .. } => Ok("string"),
            Expression::RatioLiteral { .. } => Ok("double"),
            Expression::NullLiteral { .. } => Ok("object"),
            Expression::ByteArrayLiteral { .. } => Ok("byte[]"),
            other => Err(self.unsupported(other.kind_name())),
        }
    }

    fn signature(&self, label: &InvokableLabel) -> String {
        let parameters: Vec<String> = label.parameters.iter().map(|p| identifier(&p.name)).collect();
        format!("void {}({})", mangle(label.marker()), parameters.join(", "))
    }

    fn paragraph(&self, writer: &mut CodeWriter, paragraph: &Paragraph) -> Result<(), ConvertError> {
        if let Some(label) = &paragraph.label {
            writer.emit(&self.signature(label));
            writer.open_braces();
        }
        for statement in &paragraph.statements {
            self.statement(writer, statement)?;
        }
        if paragraph.label.is_some() {
            writer.close_braces();
        }
        Ok(())
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
            Statement::ConstantDeclaration { identifier: name, value, .. } => {
                writer.emit("public partial class constants");
                writer.open_braces();
                writer.emit(&format!(
                    "public const {} {} = {};",
                    self.constant_type(value)?,
                    self.reference(name),
                    self.expression(value)?
                ));
                writer.close_braces();
            }
            Statement::UnitAliasDeclaration { identifier: name, value, base_unit, .. } => {
                writer.emit("public partial class constants");
                writer.open_braces();
                writer.emit(&format!(
                    "public const {} {} = {} * {};",
                    self.constant_type(value)?,
                    self.reference(name),
                    self.expression(value)?,
                    self.reference(base_unit)
                ));
                writer.close_braces();
            }
            Statement::PointerDeclaration { pointer_type, base_type, .. } => {
                writer.emit(&format!(
                    "public class {}({} {}); // pointer",
                    self.reference(pointer_type),
                    self.type_name(base_type),
                    identifier(&base_type.name)
                ));
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
                let parameters: Vec<String> = parameters.iter().map(|p| self.reference(p)).collect();
                let call = format!("{}({});", mangle(marker), parameters.join(", "));
                match result {
                    Some(result) => writer.emit(&format!("{} = {}", self.reference(result), call)),
                    None => writer.emit(&call),
                }
            }
            Statement::Labeled { label, statement, .. } => {
                writer.emit(&self.signature(label));
                writer.open_braces();
                self.statement(writer, statement)?;
                writer.close_braces();
            }
            Statement::Invalid { .. } => {
                writer.emit(&format!("#error {}", statement.invalid_text().unwrap_or_default()));
            }
        }
        Ok(())
    }

    fn arithmetic(&self, target: &IdentifierReference, operator: &str, value: &Expression) -> Result<String, ConvertError> {
        Ok(format!("{} {} {}", self.reference(target), operator, self.expression(value)?))
    }

    fn expression(&self, expression: &Expression) -> Result<String, ConvertError> {
        let code = match expression {
            Expression::IntLiteral { value, .. } => value.to_string(),
            Expression::StringLiteral { value, .. } => format!("\"{}\"", value),
            Expression::ByteArrayLiteral { value, .. } => {
                let bytes: Vec<String> = value.iter().map(u8::to_string).collect();
                format!("new byte[] {{ {} }}", bytes.join(", "))
            }
            Expression::InchLiteral { value, .. } => self.expression(value)?,
            Expression::RatioLiteral { numerator, denominator, .. } => format!("{} / {}", numerator, denominator),
            Expression::NullLiteral { .. } => "null".to_string(),
            Expression::Variable { identifier, .. } => self.reference(identifier),
            Expression::Posessive { identifier, owner, .. } => {
                format!("{}.{}", self.expression(owner)?, self.reference(identifier))
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
            Expression::Invalid { code, .. } => format!("/* {} */", code),
        };
        Ok(code)
    }
}
