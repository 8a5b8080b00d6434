//! Script Lexer Module
//!
//! This module implements a lexer for the sandbox script language,
//! converting source text into tokens that can be processed by the parser.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

use super::error::{ScriptError, ScriptResult};

/// Token type representing all lexical tokens of the script language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Var, Function, If, Else,
    While, Do, For, Break,
    Continue, Return,
    True, False, Null,

    // Operators
    Plus, Minus, Star, Slash, Percent,
    Assign, Eq, Ne, Lt, Le, Gt, Ge,
    AndAnd, OrOr, Not, Arrow,

    // Punctuation
    Semicolon, Comma, Dot,
    LeftParen, RightParen,
    LeftBracket, RightBracket,
    LeftBrace, RightBrace,

    // Literals
    Number(f64),
    String(String),

    // Identifiers
    Identifier(String),

    // End of file
    Eof,
}

lazy_static! {
    /// Keyword spellings, looked up after scanning an identifier
    static ref KEYWORDS: HashMap<&'static str, Token> = {
        let mut map = HashMap::new();
        map.insert("var", Token::Var);
        map.insert("function", Token::Function);
        map.insert("if", Token::If);
        map.insert("else", Token::Else);
        map.insert("while", Token::While);
        map.insert("do", Token::Do);
        map.insert("for", Token::For);
        map.insert("break", Token::Break);
        map.insert("continue", Token::Continue);
        map.insert("return", Token::Return);
        map.insert("true", Token::True);
        map.insert("false", Token::False);
        map.insert("null", Token::Null);
        map
    };
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Var => write!(f, "var"),
            Token::Function => write!(f, "function"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Do => write!(f, "do"),
            Token::For => write!(f, "for"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Return => write!(f, "return"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),

            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Assign => write!(f, "="),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Arrow => write!(f, "=>"),

            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),

            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s.escape_debug()),
            Token::Identifier(s) => write!(f, "{}", s),

            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Token with location information
#[derive(Debug, Clone)]
pub struct TokenWithLocation {
    /// The token itself
    pub token: Token,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

/// Whether a character can continue an identifier
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lexer for script source code
pub struct Lexer {
    /// Characters of source code
    chars: Vec<char>,
    /// Current position in source
    position: usize,
    /// Current line number (1-based)
    line: usize,
    /// Current column number (1-based)
    column: usize,
}

impl Lexer {
    /// Create a new lexer
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Get the current character
    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    /// Peek at the next character
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> ScriptResult<()> {
        loop {
            match self.current() {
                Some(c) if c.is_whitespace() => self.advance(),
                Some('/') if self.peek() == Some('/') => {
                    while let Some(c) = self.current() {
                        self.advance();
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.current() {
                        if c == '*' && self.peek() == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        return Err(ScriptError::SyntaxError {
                            message: "unterminated block comment".to_string(),
                            line,
                            column,
                        });
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Scan a number literal
    fn scan_number(&mut self) -> ScriptResult<Token> {
        let start = self.position;
        let (line, column) = (self.line, self.column);
        let mut has_decimal = false;
        let mut has_exponent = false;

        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !has_decimal && !has_exponent {
                // A dot must start a fractional part, not a member access
                match self.peek() {
                    Some(d) if d.is_ascii_digit() => {
                        has_decimal = true;
                        self.advance();
                    }
                    _ => break,
                }
            } else if (c == 'e' || c == 'E') && !has_exponent {
                has_exponent = true;
                self.advance();
                if let Some(sign) = self.current() {
                    if sign == '+' || sign == '-' {
                        self.advance();
                    }
                }
            } else {
                break;
            }
        }

        let text: String = self.chars[start..self.position].iter().collect();
        match text.parse::<f64>() {
            Ok(n) => Ok(Token::Number(n)),
            Err(_) => Err(ScriptError::SyntaxError {
                message: format!("invalid number: {}", text),
                line,
                column,
            }),
        }
    }

    /// Scan a string literal
    fn scan_string(&mut self) -> ScriptResult<Token> {
        let delimiter = match self.current() {
            Some(c) => c,
            None => {
                return Err(ScriptError::SyntaxError {
                    message: "expected string".to_string(),
                    line: self.line,
                    column: self.column,
                })
            }
        };
        let (line, column) = (self.line, self.column);
        self.advance(); // Skip the opening quote

        let mut result = String::new();
        while let Some(c) = self.current() {
            if c == delimiter {
                self.advance(); // Skip the closing quote
                return Ok(Token::String(result));
            } else if c == '\n' {
                break;
            } else if c == '\\' {
                self.advance();
                match self.current() {
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('0') => result.push('\0'),
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some('\'') => result.push('\''),
                    Some(other) => {
                        return Err(ScriptError::SyntaxError {
                            message: format!("invalid escape sequence '\\{}'", other),
                            line: self.line,
                            column: self.column,
                        })
                    }
                    None => break,
                }
                self.advance();
            } else {
                result.push(c);
                self.advance();
            }
        }

        Err(ScriptError::SyntaxError {
            message: "unterminated string".to_string(),
            line,
            column,
        })
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> Token {
        let start = self.position;
        while let Some(c) = self.current() {
            if is_identifier_char(c) {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.chars[start..self.position].iter().collect();
        match KEYWORDS.get(text.as_str()) {
            Some(token) => token.clone(),
            None => Token::Identifier(text),
        }
    }

    /// Scan the next token
    fn next_token(&mut self) -> ScriptResult<TokenWithLocation> {
        self.skip_trivia()?;

        let (line, column) = (self.line, self.column);
        let token = match self.current() {
            None => Token::Eof,
            Some(c) if c.is_ascii_digit() => self.scan_number()?,
            Some('"') | Some('\'') => self.scan_string()?,
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),
            Some(c) => {
                self.advance();
                match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    ';' => Token::Semicolon,
                    ',' => Token::Comma,
                    '.' => Token::Dot,
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    '[' => Token::LeftBracket,
                    ']' => Token::RightBracket,
                    '{' => Token::LeftBrace,
                    '}' => Token::RightBrace,
                    '=' => match self.current() {
                        Some('=') => {
                            self.advance();
                            Token::Eq
                        }
                        Some('>') => {
                            self.advance();
                            Token::Arrow
                        }
                        _ => Token::Assign,
                    },
                    '!' => {
                        if self.current() == Some('=') {
                            self.advance();
                            Token::Ne
                        } else {
                            Token::Not
                        }
                    }
                    '<' => {
                        if self.current() == Some('=') {
                            self.advance();
                            Token::Le
                        } else {
                            Token::Lt
                        }
                    }
                    '>' => {
                        if self.current() == Some('=') {
                            self.advance();
                            Token::Ge
                        } else {
                            Token::Gt
                        }
                    }
                    '&' => {
                        if self.current() == Some('&') {
                            self.advance();
                            Token::AndAnd
                        } else {
                            return Err(ScriptError::SyntaxError {
                                message: "unexpected character '&'".to_string(),
                                line,
                                column,
                            });
                        }
                    }
                    '|' => {
                        if self.current() == Some('|') {
                            self.advance();
                            Token::OrOr
                        } else {
                            return Err(ScriptError::SyntaxError {
                                message: "unexpected character '|'".to_string(),
                                line,
                                column,
                            });
                        }
                    }
                    other => {
                        return Err(ScriptError::SyntaxError {
                            message: format!("unexpected character '{}'", other),
                            line,
                            column,
                        })
                    }
                }
            }
        };

        Ok(TokenWithLocation {
            token,
            line,
            column,
        })
    }
}

/// Tokenize script source code
pub fn tokenize(source: &str) -> ScriptResult<Vec<TokenWithLocation>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token()?;
        let at_end = token.token == Token::Eof;
        tokens.push(token);
        if at_end {
            return Ok(tokens);
        }
    }
}
