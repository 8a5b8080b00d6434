//! Script Source Renderer
//!
//! This module renders an AST back into source text, so the loop guard pass
//! can be used as a genuine source-to-source tool. Operator precedence is
//! honored when deciding where parentheses are required; function and arrow
//! expression bodies are rendered on a single line.

use super::ast::*;

// Precedence levels, lowest binds loosest
const PREC_LOWEST: u8 = 0;
const PREC_UNARY: u8 = 7;
const PREC_POSTFIX: u8 = 8;

/// Render a chunk as source text
pub fn render(chunk: &Chunk) -> String {
    let mut renderer = Renderer::new();
    for statement in &chunk.statements {
        renderer.statement(statement, 0);
    }
    renderer.output
}

/// Render a single statement as source text (no trailing newline)
pub fn render_statement(statement: &Statement) -> String {
    let mut renderer = Renderer::new();
    renderer.statement(statement, 0);
    renderer.output.trim_end().to_string()
}

struct Renderer {
    output: String,
}

impl Renderer {
    fn new() -> Self {
        Renderer {
            output: String::new(),
        }
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.output.push_str("    ");
        }
    }

    /// Write a statement, including leading indentation and a trailing
    /// newline
    fn statement(&mut self, statement: &Statement, indent: usize) {
        match statement {
            Statement::VarDeclaration { .. }
            | Statement::Assignment { .. }
            | Statement::Expression(_) => {
                self.indent(indent);
                self.simple_statement(statement);
                self.output.push_str(";\n");
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.indent(indent);
                self.output.push_str("if (");
                self.expression(condition, PREC_LOWEST);
                self.output.push(')');
                self.branch(then_branch, indent);
                if let Some(else_branch) = else_branch {
                    self.indent(indent);
                    self.output.push_str("else");
                    self.branch(else_branch, indent);
                }
            }
            Statement::While {
                condition, body, ..
            } => {
                self.indent(indent);
                self.output.push_str("while (");
                self.expression(condition, PREC_LOWEST);
                self.output.push(')');
                self.branch(body, indent);
            }
            Statement::DoWhile {
                body, condition, ..
            } => {
                self.indent(indent);
                self.output.push_str("do");
                match body.as_ref() {
                    Statement::Block(block) => {
                        self.output.push_str(" {\n");
                        for inner in &block.statements {
                            self.statement(inner, indent + 1);
                        }
                        self.indent(indent);
                        self.output.push_str("} while (");
                        self.expression(condition, PREC_LOWEST);
                        self.output.push_str(");\n");
                    }
                    other => {
                        self.output.push('\n');
                        self.statement(other, indent + 1);
                        self.indent(indent);
                        self.output.push_str("while (");
                        self.expression(condition, PREC_LOWEST);
                        self.output.push_str(");\n");
                    }
                }
            }
            Statement::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                self.indent(indent);
                self.output.push_str("for (");
                if let Some(init) = init {
                    self.simple_statement(init);
                }
                self.output.push(';');
                if let Some(condition) = condition {
                    self.output.push(' ');
                    self.expression(condition, PREC_LOWEST);
                }
                self.output.push(';');
                if let Some(update) = update {
                    self.output.push(' ');
                    self.simple_statement(update);
                }
                self.output.push(')');
                self.branch(body, indent);
            }
            Statement::Block(block) => {
                self.indent(indent);
                self.output.push_str("{\n");
                for inner in &block.statements {
                    self.statement(inner, indent + 1);
                }
                self.indent(indent);
                self.output.push_str("}\n");
            }
            Statement::Break => {
                self.indent(indent);
                self.output.push_str("break;\n");
            }
            Statement::Continue => {
                self.indent(indent);
                self.output.push_str("continue;\n");
            }
            Statement::Return(value) => {
                self.indent(indent);
                self.output.push_str("return");
                if let Some(value) = value {
                    self.output.push(' ');
                    self.expression(value, PREC_LOWEST);
                }
                self.output.push_str(";\n");
            }
            Statement::FunctionDeclaration(def) => {
                self.indent(indent);
                self.output.push_str("function ");
                self.output.push_str(&def.name);
                self.parameter_list(&def.parameters);
                self.output.push_str(" {\n");
                for inner in &def.body.statements {
                    self.statement(inner, indent + 1);
                }
                self.indent(indent);
                self.output.push_str("}\n");
            }
            Statement::Empty => {
                self.indent(indent);
                self.output.push_str(";\n");
            }
        }
    }

    /// Write a declaration, assignment or expression statement without
    /// indentation, semicolon or newline; used inline in for-loop clauses
    fn simple_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VarDeclaration { name, initializer } => {
                self.output.push_str("var ");
                self.output.push_str(name);
                if let Some(initializer) = initializer {
                    self.output.push_str(" = ");
                    self.expression(initializer, PREC_LOWEST);
                }
            }
            Statement::Assignment { target, value } => {
                match target {
                    AssignTarget::Name(name) => self.output.push_str(name),
                    AssignTarget::Index { object, index } => {
                        self.postfix_operand(object);
                        self.output.push('[');
                        self.expression(index, PREC_LOWEST);
                        self.output.push(']');
                    }
                }
                self.output.push_str(" = ");
                self.expression(value, PREC_LOWEST);
            }
            Statement::Expression(expr) => {
                // A leading function keyword or parenthesis would be parsed
                // as a declaration or arrow head, so wrap the expression
                match expr {
                    Expression::Function(_) | Expression::Arrow { .. } => {
                        self.output.push('(');
                        self.expression(expr, PREC_LOWEST);
                        self.output.push(')');
                    }
                    _ => self.expression(expr, PREC_LOWEST),
                }
            }
            _ => {}
        }
    }

    /// Write a loop or if body after its header; block bodies stay on the
    /// header line, bare bodies go on the next line one level deeper
    fn branch(&mut self, body: &Statement, indent: usize) {
        match body {
            Statement::Block(block) => {
                self.output.push_str(" {\n");
                for inner in &block.statements {
                    self.statement(inner, indent + 1);
                }
                self.indent(indent);
                self.output.push_str("}\n");
            }
            other => {
                self.output.push('\n');
                self.statement(other, indent + 1);
            }
        }
    }

    fn parameter_list(&mut self, parameters: &[String]) {
        self.output.push('(');
        for (i, parameter) in parameters.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.output.push_str(parameter);
        }
        self.output.push(')');
    }

    /// Write an expression, parenthesizing when its precedence is below
    /// what the context requires
    fn expression(&mut self, expr: &Expression, min_prec: u8) {
        match expr {
            Expression::Null => self.output.push_str("null"),
            Expression::Boolean(true) => self.output.push_str("true"),
            Expression::Boolean(false) => self.output.push_str("false"),
            Expression::Number(n) => {
                let text = format!("{}", n);
                self.output.push_str(&text);
            }
            Expression::String(s) => self.string_literal(s),
            Expression::Identifier(name) => self.output.push_str(name),
            Expression::Array(elements) => {
                self.output.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.expression(element, PREC_LOWEST);
                }
                self.output.push(']');
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let prec = binary_precedence(*operator);
                let parens = prec < min_prec;
                if parens {
                    self.output.push('(');
                }
                self.expression(left, prec);
                self.output.push(' ');
                self.output.push_str(binary_symbol(*operator));
                self.output.push(' ');
                self.expression(right, prec + 1);
                if parens {
                    self.output.push(')');
                }
            }
            Expression::Unary { operator, operand } => {
                let parens = PREC_UNARY < min_prec;
                if parens {
                    self.output.push('(');
                }
                self.output.push_str(match operator {
                    UnaryOperator::Not => "!",
                    UnaryOperator::Minus => "-",
                });
                self.expression(operand, PREC_UNARY);
                if parens {
                    self.output.push(')');
                }
            }
            Expression::Call { callee, arguments } => {
                self.postfix_operand(callee);
                self.output.push('(');
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.expression(argument, PREC_LOWEST);
                }
                self.output.push(')');
            }
            Expression::Member { object, field } => {
                self.postfix_operand(object);
                self.output.push('.');
                self.output.push_str(field);
            }
            Expression::Index { object, index } => {
                self.postfix_operand(object);
                self.output.push('[');
                self.expression(index, PREC_LOWEST);
                self.output.push(']');
            }
            Expression::Function(def) => {
                self.output.push_str("function ");
                if let Some(name) = &def.name {
                    self.output.push_str(name);
                }
                self.parameter_list(&def.parameters);
                self.output.push(' ');
                self.inline_block(&def.body);
            }
            Expression::Arrow { parameters, body } => {
                let parens = min_prec > PREC_LOWEST;
                if parens {
                    self.output.push('(');
                }
                self.parameter_list(parameters);
                self.output.push_str(" => ");
                match body {
                    ArrowBody::Expression(expr) => self.expression(expr, PREC_LOWEST),
                    ArrowBody::Block(block) => self.inline_block(block),
                }
                if parens {
                    self.output.push(')');
                }
            }
        }
    }

    /// Write the operand of a call, member or index suffix, wrapping forms
    /// that would not re-parse as a callee
    fn postfix_operand(&mut self, expr: &Expression) {
        match expr {
            Expression::Binary { .. }
            | Expression::Unary { .. }
            | Expression::Function(_)
            | Expression::Arrow { .. } => {
                self.output.push('(');
                self.expression(expr, PREC_LOWEST);
                self.output.push(')');
            }
            _ => self.expression(expr, PREC_POSTFIX),
        }
    }

    /// Write a block on a single line, for function and arrow bodies in
    /// expression position
    fn inline_block(&mut self, block: &Block) {
        if block.statements.is_empty() {
            self.output.push_str("{}");
            return;
        }
        self.output.push_str("{ ");
        let mut inner = Renderer::new();
        for statement in &block.statements {
            inner.statement(statement, 0);
        }
        let flattened = inner.output.trim_end().replace('\n', " ");
        self.output.push_str(&flattened);
        self.output.push_str(" }");
    }

    fn string_literal(&mut self, value: &str) {
        self.output.push('"');
        for c in value.chars() {
            match c {
                '"' => self.output.push_str("\\\""),
                '\\' => self.output.push_str("\\\\"),
                '\n' => self.output.push_str("\\n"),
                '\r' => self.output.push_str("\\r"),
                '\t' => self.output.push_str("\\t"),
                '\0' => self.output.push_str("\\0"),
                other => self.output.push(other),
            }
        }
        self.output.push('"');
    }
}

fn binary_precedence(operator: BinaryOperator) -> u8 {
    match operator {
        BinaryOperator::Or => 1,
        BinaryOperator::And => 2,
        BinaryOperator::Eq | BinaryOperator::Ne => 3,
        BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge => 4,
        BinaryOperator::Add | BinaryOperator::Sub => 5,
        BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 6,
    }
}

fn binary_symbol(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "+",
        BinaryOperator::Sub => "-",
        BinaryOperator::Mul => "*",
        BinaryOperator::Div => "/",
        BinaryOperator::Mod => "%",
        BinaryOperator::Eq => "==",
        BinaryOperator::Ne => "!=",
        BinaryOperator::Lt => "<",
        BinaryOperator::Le => "<=",
        BinaryOperator::Gt => ">",
        BinaryOperator::Ge => ">=",
        BinaryOperator::And => "&&",
        BinaryOperator::Or => "||",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::parse;

    fn reparses_identically(source: &str) {
        let chunk = parse(source).unwrap();
        let rendered = render(&chunk);
        let reparsed = parse(&rendered).unwrap_or_else(|e| {
            panic!("rendered source failed to parse: {}\n{}", e, rendered)
        });
        assert_eq!(chunk, reparsed, "render changed meaning:\n{}", rendered);
    }

    #[test]
    fn test_render_loop_shapes() {
        reparses_identically("while (x > 0) { x = x - 1; }");
        reparses_identically("do { tick(); } while (busy());");
        reparses_identically("for (var i = 0; i < 10; i = i + 1) work(i);");
    }

    #[test]
    fn test_render_precedence() {
        reparses_identically("var x = (a + b) * c - d / (e - f);");
        reparses_identically("var y = !(a && b) || c == d;");
    }

    #[test]
    fn test_render_call_with_expression_callee() {
        let chunk = parse("var f = () => report(\"x\");").unwrap();
        // Build a call whose callee is the arrow itself
        let arrow = match &chunk.statements[0] {
            Statement::VarDeclaration {
                initializer: Some(expr),
                ..
            } => expr.clone(),
            other => panic!("unexpected {:?}", other),
        };
        let call = Statement::Expression(Expression::Call {
            callee: Box::new(arrow),
            arguments: vec![Expression::Number(5.0), Expression::Number(2.0)],
        });
        let rendered = render_statement(&call);
        assert_eq!(rendered, "(() => report(\"x\"))(5, 2);");
        // The wrapped callee must re-parse
        parse(&rendered).unwrap();
    }

    #[test]
    fn test_render_string_escapes() {
        let rendered = render_statement(&Statement::Expression(Expression::String(
            "say \"hi\"\\now".to_string(),
        )));
        assert_eq!(rendered, "\"say \\\"hi\\\"\\\\now\";");
    }

    #[test]
    fn test_render_bare_body_on_next_line() {
        let chunk = parse("while (x) x = x - 1;").unwrap();
        let rendered = render(&chunk);
        assert_eq!(rendered, "while (x)\n    x = x - 1;\n");
    }

    #[test]
    fn test_render_whole_numbers_without_fraction() {
        let rendered = render_statement(&Statement::Expression(Expression::Number(2000.0)));
        assert_eq!(rendered, "2000;");
    }
}
