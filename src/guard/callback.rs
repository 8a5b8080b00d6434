//! Callback Synthesizer
//!
//! Turns the configured break-notification into a single invocable AST
//! expression, built once per pass and embedded into every guard. The
//! notification arrives either as a display message or as the source text
//! of a callable; both are resolved through a textual round-trip via the
//! script parser.

use crate::config::OnBreak;
use crate::script;
use crate::script::ast::{Expression, FunctionExpr, Statement};
use crate::script::error::{ScriptError, ScriptResult};
use crate::script::lexer::is_identifier_char;

/// Name attached to an anonymous `function` fragment so that it parses as
/// a declaration; it survives into the embedded function expression
const SYNTHETIC_NAME: &str = "_callback";

/// Synthesize the invocable callback expression for a notification
pub fn synthesize(on_break: &OnBreak) -> ScriptResult<Expression> {
    let source = match on_break {
        OnBreak::Noop => "() => {}".to_string(),
        OnBreak::Message(message) => {
            format!("() => report(\"{}\")", escape_message(message))
        }
        OnBreak::Callable(text) => normalize_callable(text),
    };

    let mut chunk = script::parse(&source)?;
    if chunk.statements.len() != 1 {
        return Err(shape_error());
    }

    match chunk.statements.pop() {
        Some(Statement::Expression(expr @ Expression::Arrow { .. })) => Ok(expr),
        Some(Statement::FunctionDeclaration(def)) => {
            // A declaration cannot stand alone as an expression, so the
            // re-parsed form is normalized into a named function expression
            // with the same name, parameters and body
            Ok(Expression::Function(FunctionExpr {
                name: Some(def.name),
                parameters: def.parameters,
                body: def.body,
            }))
        }
        _ => Err(shape_error()),
    }
}

/// The re-parse produced neither of the two expected callable shapes
fn shape_error() -> ScriptError {
    ScriptError::Internal(
        "callback fragment did not reduce to a callable expression".to_string(),
    )
}

/// Escape a message for embedding inside a double-quoted string literal
fn escape_message(message: &str) -> String {
    let mut escaped = String::with_capacity(message.len());
    for c in message.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Splice a synthetic name after a leading anonymous `function` keyword;
/// without a name the fragment would not parse as a top-level statement
fn normalize_callable(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("function") {
        let keyword_ends = rest.chars().next().map_or(true, |c| !is_identifier_char(c));
        let anonymous = rest.trim_start().starts_with('(');
        if keyword_ends && anonymous {
            return trimmed.replacen("function", &format!("function {}", SYNTHETIC_NAME), 1);
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ast::ArrowBody;

    #[test]
    fn test_noop_synthesizes_empty_arrow() {
        let expr = synthesize(&OnBreak::Noop).unwrap();
        match expr {
            Expression::Arrow { parameters, body } => {
                assert!(parameters.is_empty());
                match body {
                    ArrowBody::Block(block) => assert!(block.statements.is_empty()),
                    other => panic!("expected block body, got {:?}", other),
                }
            }
            other => panic!("expected arrow, got {:?}", other),
        }
    }

    #[test]
    fn test_message_becomes_report_call() {
        let expr = synthesize(&OnBreak::Message("stuck".to_string())).unwrap();
        match expr {
            Expression::Arrow { body, .. } => match body {
                ArrowBody::Expression(call) => match *call {
                    Expression::Call { callee, arguments } => {
                        assert_eq!(*callee, Expression::Identifier("report".to_string()));
                        assert_eq!(arguments, vec![Expression::String("stuck".to_string())]);
                    }
                    other => panic!("expected call, got {:?}", other),
                },
                other => panic!("expected expression body, got {:?}", other),
            },
            other => panic!("expected arrow, got {:?}", other),
        }
    }

    #[test]
    fn test_message_with_embedded_quote_survives_round_trip() {
        let message = "say \"stop\" now";
        let expr = synthesize(&OnBreak::Message(message.to_string())).unwrap();
        match expr {
            Expression::Arrow {
                body: ArrowBody::Expression(call),
                ..
            } => match *call {
                Expression::Call { arguments, .. } => {
                    assert_eq!(arguments, vec![Expression::String(message.to_string())]);
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected arrow, got {:?}", other),
        }
    }

    #[test]
    fn test_message_with_backslash_survives_round_trip() {
        let message = "path\\to\\nowhere";
        let expr = synthesize(&OnBreak::Message(message.to_string())).unwrap();
        match expr {
            Expression::Arrow {
                body: ArrowBody::Expression(call),
                ..
            } => match *call {
                Expression::Call { arguments, .. } => {
                    assert_eq!(arguments, vec![Expression::String(message.to_string())]);
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected arrow, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_callable_passes_through() {
        let source = "(line, col) => recorded.push([line, col])";
        let expr = synthesize(&OnBreak::Callable(source.to_string())).unwrap();
        match expr {
            Expression::Arrow { parameters, .. } => {
                assert_eq!(parameters, vec!["line".to_string(), "col".to_string()]);
            }
            other => panic!("expected arrow, got {:?}", other),
        }
    }

    #[test]
    fn test_named_function_callable_keeps_its_name() {
        let source = "function notify(line, col) { report(line); }";
        let expr = synthesize(&OnBreak::Callable(source.to_string())).unwrap();
        match expr {
            Expression::Function(def) => {
                assert_eq!(def.name.as_deref(), Some("notify"));
                assert_eq!(def.parameters, vec!["line".to_string(), "col".to_string()]);
            }
            other => panic!("expected function expression, got {:?}", other),
        }
    }

    #[test]
    fn test_anonymous_function_callable_gets_synthetic_name() {
        let source = "function (line, col) { report(line); }";
        let expr = synthesize(&OnBreak::Callable(source.to_string())).unwrap();
        match expr {
            Expression::Function(def) => {
                assert_eq!(def.name.as_deref(), Some(SYNTHETIC_NAME));
                assert_eq!(def.parameters.len(), 2);
            }
            other => panic!("expected function expression, got {:?}", other),
        }
    }

    #[test]
    fn test_identifier_starting_with_function_is_not_rewritten() {
        // `functional` must not be mistaken for the keyword; the fragment
        // then fails shape inspection rather than being mangled
        let err = synthesize(&OnBreak::Callable("functional;".to_string())).unwrap_err();
        assert!(matches!(err, ScriptError::Internal(_)));
    }

    #[test]
    fn test_unrecognized_shape_is_fatal() {
        let err = synthesize(&OnBreak::Callable("var x = 1;".to_string())).unwrap_err();
        assert!(matches!(err, ScriptError::Internal(_)));

        let err = synthesize(&OnBreak::Callable("1 + 2;".to_string())).unwrap_err();
        assert!(matches!(err, ScriptError::Internal(_)));
    }

    #[test]
    fn test_malformed_callable_is_a_syntax_error() {
        let err = synthesize(&OnBreak::Callable("(a, => b".to_string())).unwrap_err();
        assert!(matches!(err, ScriptError::SyntaxError { .. }));
    }
}
