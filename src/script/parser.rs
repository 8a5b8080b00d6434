//! Script Parser Module
//!
//! This module implements the parser for the sandbox script language,
//! converting tokens from the lexer into an Abstract Syntax Tree (AST).
//!
//! Loop statements record the line and column of their introducing keyword;
//! the loop guard pass embeds those coordinates into the injected watchdog.

use super::ast::*;
use super::error::{ScriptError, ScriptResult};
use super::lexer::{tokenize, Token, TokenWithLocation};

/// Parser for script source code
pub struct Parser {
    /// Tokens to parse
    tokens: Vec<TokenWithLocation>,
    /// Current token position
    current: usize,
}

impl Parser {
    /// Create a new parser for the given tokens
    pub fn new(tokens: Vec<TokenWithLocation>) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parse the tokens into a chunk
    pub fn parse(&mut self) -> ScriptResult<Chunk> {
        let mut chunk = Chunk::new();

        while !self.check(&Token::Eof) {
            chunk.statements.push(self.statement()?);
        }

        self.consume(Token::Eof, "expected end of file")?;

        Ok(chunk)
    }

    /// Parse a statement
    fn statement(&mut self) -> ScriptResult<Statement> {
        let position = self.position_here();

        if self.match_token(Token::Semicolon) {
            Ok(Statement::Empty)
        } else if self.match_token(Token::Var) {
            let statement = self.var_declaration()?;
            self.expect_statement_end("expected ';' after declaration")?;
            Ok(statement)
        } else if self.match_token(Token::If) {
            self.if_statement()
        } else if self.match_token(Token::While) {
            self.while_statement(position)
        } else if self.match_token(Token::Do) {
            self.do_while_statement(position)
        } else if self.match_token(Token::For) {
            self.for_statement(position)
        } else if self.match_token(Token::LeftBrace) {
            Ok(Statement::Block(self.block_body()?))
        } else if self.match_token(Token::Break) {
            self.expect_statement_end("expected ';' after 'break'")?;
            Ok(Statement::Break)
        } else if self.match_token(Token::Continue) {
            self.expect_statement_end("expected ';' after 'continue'")?;
            Ok(Statement::Continue)
        } else if self.match_token(Token::Return) {
            let value = if self.check(&Token::Semicolon)
                || self.check(&Token::RightBrace)
                || self.check(&Token::Eof)
            {
                None
            } else {
                Some(self.expression()?)
            };
            self.expect_statement_end("expected ';' after return value")?;
            Ok(Statement::Return(value))
        } else if self.match_token(Token::Function) {
            self.function_declaration()
        } else {
            let statement = self.expression_or_assignment()?;
            self.expect_statement_end("expected ';' after statement")?;
            Ok(statement)
        }
    }

    /// Parse the remainder of a `var` declaration (the `var` keyword is
    /// already consumed; the trailing semicolon is left to the caller so
    /// for-loop initializers can reuse this)
    fn var_declaration(&mut self) -> ScriptResult<Statement> {
        let name = self.consume_identifier("expected variable name after 'var'")?;
        let initializer = if self.match_token(Token::Assign) {
            Some(self.expression()?)
        } else {
            None
        };

        Ok(Statement::VarDeclaration { name, initializer })
    }

    /// Parse an expression statement or an assignment (no trailing semicolon)
    fn expression_or_assignment(&mut self) -> ScriptResult<Statement> {
        let expr = self.expression()?;

        if self.match_token(Token::Assign) {
            let target = self.assignment_target(expr)?;
            let value = self.expression()?;
            Ok(Statement::Assignment { target, value })
        } else {
            Ok(Statement::Expression(expr))
        }
    }

    /// Convert an already-parsed expression into an assignment target
    fn assignment_target(&self, expr: Expression) -> ScriptResult<AssignTarget> {
        match expr {
            Expression::Identifier(name) => Ok(AssignTarget::Name(name)),
            Expression::Index { object, index } => Ok(AssignTarget::Index {
                object: *object,
                index: *index,
            }),
            _ => Err(self.error("invalid assignment target")),
        }
    }

    /// Parse an if statement
    fn if_statement(&mut self) -> ScriptResult<Statement> {
        self.consume(Token::LeftParen, "expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(Token::RightParen, "expected ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(Token::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// Parse a while loop
    fn while_statement(&mut self, position: Position) -> ScriptResult<Statement> {
        self.consume(Token::LeftParen, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(Token::RightParen, "expected ')' after while condition")?;

        let body = Box::new(self.statement()?);

        Ok(Statement::While {
            condition,
            body,
            position: Some(position),
        })
    }

    /// Parse a do-while loop
    fn do_while_statement(&mut self, position: Position) -> ScriptResult<Statement> {
        let body = Box::new(self.statement()?);

        self.consume(Token::While, "expected 'while' after do body")?;
        self.consume(Token::LeftParen, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(Token::RightParen, "expected ')' after do-while condition")?;
        self.expect_statement_end("expected ';' after do-while")?;

        Ok(Statement::DoWhile {
            body,
            condition,
            position: Some(position),
        })
    }

    /// Parse a for loop
    fn for_statement(&mut self, position: Position) -> ScriptResult<Statement> {
        self.consume(Token::LeftParen, "expected '(' after 'for'")?;

        let init = if self.check(&Token::Semicolon) {
            None
        } else if self.match_token(Token::Var) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_or_assignment()?))
        };
        self.consume(Token::Semicolon, "expected ';' after for initializer")?;

        let condition = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(Token::Semicolon, "expected ';' after for condition")?;

        let update = if self.check(&Token::RightParen) {
            None
        } else {
            Some(Box::new(self.expression_or_assignment()?))
        };
        self.consume(Token::RightParen, "expected ')' after for clauses")?;

        let body = Box::new(self.statement()?);

        Ok(Statement::For {
            init,
            condition,
            update,
            body,
            position: Some(position),
        })
    }

    /// Parse a function declaration (the `function` keyword is consumed)
    fn function_declaration(&mut self) -> ScriptResult<Statement> {
        let name = self.consume_identifier("expected function name")?;
        let parameters = self.parameter_list()?;
        self.consume(Token::LeftBrace, "expected '{' before function body")?;
        let body = self.block_body()?;

        Ok(Statement::FunctionDeclaration(FunctionDef {
            name,
            parameters,
            body,
        }))
    }

    /// Parse a parenthesized parameter list
    fn parameter_list(&mut self) -> ScriptResult<Vec<String>> {
        self.consume(Token::LeftParen, "expected '(' before parameters")?;

        let mut parameters = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                parameters.push(self.consume_identifier("expected parameter name")?);
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
        }
        self.consume(Token::RightParen, "expected ')' after parameters")?;

        Ok(parameters)
    }

    /// Parse the statements of a brace-delimited block (the opening brace is
    /// already consumed)
    fn block_body(&mut self) -> ScriptResult<Block> {
        let mut block = Block::new();

        while !self.check(&Token::RightBrace) && !self.check(&Token::Eof) {
            block.statements.push(self.statement()?);
        }
        self.consume(Token::RightBrace, "expected '}' after block")?;

        Ok(block)
    }

    /// Parse an expression
    fn expression(&mut self) -> ScriptResult<Expression> {
        if self.check(&Token::LeftParen) {
            if let Some(parameters) = self.try_arrow_parameters() {
                return self.finish_arrow(parameters);
            }
        }

        self.logical_or()
    }

    /// Attempt to parse `(name, ...) =>`; on any mismatch the token cursor
    /// is restored and `None` is returned so the caller can re-parse the
    /// parenthesis as a grouped expression
    fn try_arrow_parameters(&mut self) -> Option<Vec<String>> {
        let checkpoint = self.current;
        self.advance(); // consume '('

        let mut parameters = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                match &self.peek_token().token {
                    Token::Identifier(name) => {
                        parameters.push(name.clone());
                        self.advance();
                    }
                    _ => {
                        self.current = checkpoint;
                        return None;
                    }
                }
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
        }

        if !self.match_token(Token::RightParen) || !self.match_token(Token::Arrow) {
            self.current = checkpoint;
            return None;
        }

        Some(parameters)
    }

    /// Parse an arrow function body
    fn finish_arrow(&mut self, parameters: Vec<String>) -> ScriptResult<Expression> {
        let body = if self.match_token(Token::LeftBrace) {
            ArrowBody::Block(self.block_body()?)
        } else {
            ArrowBody::Expression(Box::new(self.expression()?))
        };

        Ok(Expression::Arrow { parameters, body })
    }

    /// Parse a logical-or expression
    fn logical_or(&mut self) -> ScriptResult<Expression> {
        let mut expr = self.logical_and()?;

        while self.match_token(Token::OrOr) {
            let right = self.logical_and()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse a logical-and expression
    fn logical_and(&mut self) -> ScriptResult<Expression> {
        let mut expr = self.equality()?;

        while self.match_token(Token::AndAnd) {
            let right = self.equality()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse an equality expression
    fn equality(&mut self) -> ScriptResult<Expression> {
        let mut expr = self.comparison()?;

        loop {
            let operator = if self.match_token(Token::Eq) {
                BinaryOperator::Eq
            } else if self.match_token(Token::Ne) {
                BinaryOperator::Ne
            } else {
                break;
            };
            let right = self.comparison()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse a comparison expression
    fn comparison(&mut self) -> ScriptResult<Expression> {
        let mut expr = self.additive()?;

        loop {
            let operator = if self.match_token(Token::Lt) {
                BinaryOperator::Lt
            } else if self.match_token(Token::Le) {
                BinaryOperator::Le
            } else if self.match_token(Token::Gt) {
                BinaryOperator::Gt
            } else if self.match_token(Token::Ge) {
                BinaryOperator::Ge
            } else {
                break;
            };
            let right = self.additive()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse an additive expression
    fn additive(&mut self) -> ScriptResult<Expression> {
        let mut expr = self.multiplicative()?;

        loop {
            let operator = if self.match_token(Token::Plus) {
                BinaryOperator::Add
            } else if self.match_token(Token::Minus) {
                BinaryOperator::Sub
            } else {
                break;
            };
            let right = self.multiplicative()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse a multiplicative expression
    fn multiplicative(&mut self) -> ScriptResult<Expression> {
        let mut expr = self.unary()?;

        loop {
            let operator = if self.match_token(Token::Star) {
                BinaryOperator::Mul
            } else if self.match_token(Token::Slash) {
                BinaryOperator::Div
            } else if self.match_token(Token::Percent) {
                BinaryOperator::Mod
            } else {
                break;
            };
            let right = self.unary()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Parse a unary expression
    fn unary(&mut self) -> ScriptResult<Expression> {
        let operator = if self.match_token(Token::Not) {
            Some(UnaryOperator::Not)
        } else if self.match_token(Token::Minus) {
            Some(UnaryOperator::Minus)
        } else {
            None
        };

        match operator {
            Some(operator) => Ok(Expression::Unary {
                operator,
                operand: Box::new(self.unary()?),
            }),
            None => self.postfix(),
        }
    }

    /// Parse call, member and index suffixes
    fn postfix(&mut self) -> ScriptResult<Expression> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(Token::LeftParen) {
                let mut arguments = Vec::new();
                if !self.check(&Token::RightParen) {
                    loop {
                        arguments.push(self.expression()?);
                        if !self.match_token(Token::Comma) {
                            break;
                        }
                    }
                }
                self.consume(Token::RightParen, "expected ')' after arguments")?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else if self.match_token(Token::Dot) {
                let field = self.consume_identifier("expected field name after '.'")?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    field,
                };
            } else if self.match_token(Token::LeftBracket) {
                let index = self.expression()?;
                self.consume(Token::RightBracket, "expected ']' after index")?;
                expr = Expression::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse a primary expression
    fn primary(&mut self) -> ScriptResult<Expression> {
        let token = self.peek_token().clone();

        match token.token {
            Token::Number(n) => {
                self.advance();
                Ok(Expression::Number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expression::String(s))
            }
            Token::True => {
                self.advance();
                Ok(Expression::Boolean(true))
            }
            Token::False => {
                self.advance();
                Ok(Expression::Boolean(false))
            }
            Token::Null => {
                self.advance();
                Ok(Expression::Null)
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expression::Identifier(name))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(Token::RightParen, "expected ')' after expression")?;
                Ok(expr)
            }
            Token::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&Token::RightBracket) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.match_token(Token::Comma) {
                            break;
                        }
                    }
                }
                self.consume(Token::RightBracket, "expected ']' after array elements")?;
                Ok(Expression::Array(elements))
            }
            Token::Function => {
                self.advance();
                let name = match &self.peek_token().token {
                    Token::Identifier(name) => {
                        let name = name.clone();
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                let parameters = self.parameter_list()?;
                self.consume(Token::LeftBrace, "expected '{' before function body")?;
                let body = self.block_body()?;
                Ok(Expression::Function(FunctionExpr {
                    name,
                    parameters,
                    body,
                }))
            }
            other => Err(ScriptError::SyntaxError {
                message: format!("unexpected token '{}'", other),
                line: token.line,
                column: token.column,
            }),
        }
    }

    /// Check whether the current token matches without consuming it
    fn check(&self, token: &Token) -> bool {
        &self.peek_token().token == token
    }

    /// Consume the current token if it matches
    fn match_token(&mut self, token: Token) -> bool {
        if self.check(&token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a statement terminator. A semicolon is consumed when
    /// present; the end of the source or a closing brace also terminates a
    /// statement.
    fn expect_statement_end(&mut self, message: &str) -> ScriptResult<()> {
        if self.match_token(Token::Semicolon)
            || self.check(&Token::RightBrace)
            || self.check(&Token::Eof)
        {
            Ok(())
        } else {
            let found = self.peek_token().clone();
            Err(ScriptError::SyntaxError {
                message: format!("{}, got '{}'", message, found.token),
                line: found.line,
                column: found.column,
            })
        }
    }

    /// Consume an expected token or report a syntax error
    fn consume(&mut self, token: Token, message: &str) -> ScriptResult<()> {
        if self.check(&token) {
            self.advance();
            Ok(())
        } else {
            let found = self.peek_token().clone();
            Err(ScriptError::SyntaxError {
                message: format!("{}, got '{}'", message, found.token),
                line: found.line,
                column: found.column,
            })
        }
    }

    /// Consume an identifier token
    fn consume_identifier(&mut self, message: &str) -> ScriptResult<String> {
        let token = self.peek_token().clone();
        if let Token::Identifier(name) = token.token {
            self.advance();
            Ok(name)
        } else {
            Err(ScriptError::SyntaxError {
                message: format!("{}, got '{}'", message, token.token),
                line: token.line,
                column: token.column,
            })
        }
    }

    /// Advance to the next token
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    /// Get the current token
    fn peek_token(&self) -> &TokenWithLocation {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    /// Check if we've reached the end of the tokens
    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.tokens[self.current].token == Token::Eof
    }

    /// Position of the current token
    fn position_here(&self) -> Position {
        let token = self.peek_token();
        Position::new(token.line, token.column)
    }

    /// Build a syntax error at the current token
    fn error(&self, message: &str) -> ScriptError {
        let token = self.peek_token();
        ScriptError::SyntaxError {
            message: message.to_string(),
            line: token.line,
            column: token.column,
        }
    }
}

/// Parse script source code into an AST
pub fn parse(source: &str) -> ScriptResult<Chunk> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}
