//! Script Language Frontend
//!
//! This module provides the frontend for the sandbox script language that
//! the loop guard pass instruments: lexer, parser, AST, source renderer,
//! statement traversal, and collision-free name minting.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod visit;

pub use self::error::{ScriptError, ScriptResult};

/// Parse script source code into an AST
pub fn parse(source: &str) -> ScriptResult<ast::Chunk> {
    parser::parse(source)
}

/// Render an AST back to source text
pub fn render(chunk: &ast::Chunk) -> String {
    codegen::render(chunk)
}
