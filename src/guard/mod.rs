//! Loop Guard Pass
//!
//! Rewrites every bounded-iteration construct of a chunk so that, at
//! runtime, the loop self-monitors elapsed wall-clock time and breaks with
//! the configured notification once the timeout is exceeded.
//!
//! For each loop the pass mints a fresh timer binding, inserts
//! `var <timer> = now();` immediately before the loop, and splices a guard
//! conditional in as the first statement of the loop body. The notification
//! callback is synthesized once per pass and shared by every guard.

mod cache;
mod callback;
mod fragment;

pub use self::cache::{script_hash, Instrumenter};

use crate::config::InstrumentConfig;
use crate::error::Result;
use crate::script::ast::*;
use crate::script::scope::NameRegistry;
use crate::script::visit::{self, StatementRewriter, Visit};

/// The instrumentation pass. Construction synthesizes the notification
/// callback; the same pass can then instrument any number of chunks.
#[derive(Debug)]
pub struct LoopGuard {
    timeout_millis: u64,
    callback: Expression,
}

impl LoopGuard {
    /// Create a pass from a validated configuration.
    ///
    /// Fails fast if the configured callback does not reduce to a callable
    /// expression; that condition is never retried or defaulted.
    pub fn new(config: &InstrumentConfig) -> Result<Self> {
        config.validate()?;
        let callback = callback::synthesize(&config.on_break)?;
        Ok(LoopGuard {
            timeout_millis: config.timeout_millis,
            callback,
        })
    }

    /// Rewrite every loop in the chunk, in place
    pub fn instrument(&self, chunk: &mut Chunk) {
        let mut names = NameRegistry::collect(chunk);
        // Identifiers inside the callback fragment are off-limits too; it
        // is spliced into scopes where the timers are in scope
        names.reserve_expression(&self.callback);
        let mut rewriter = LoopRewriter {
            timeout_millis: self.timeout_millis,
            callback: &self.callback,
            names,
        };
        visit::walk_chunk(chunk, &mut rewriter);
    }
}

struct LoopRewriter<'a> {
    timeout_millis: u64,
    callback: &'a Expression,
    names: NameRegistry,
}

impl LoopRewriter<'_> {
    /// Recognize a guard conditional this pass injected, by the minted
    /// timer name inside its `now() - <timer>` comparison
    fn is_guard(&self, statement: &Statement) -> bool {
        if let Statement::If {
            condition:
                Expression::Binary {
                    left,
                    operator: BinaryOperator::Gt,
                    ..
                },
            ..
        } = statement
        {
            if let Expression::Binary {
                operator: BinaryOperator::Sub,
                right,
                ..
            } = left.as_ref()
            {
                if let Expression::Identifier(name) = right.as_ref() {
                    return self.names.was_minted(name);
                }
            }
        }
        false
    }
}

impl StatementRewriter for LoopRewriter<'_> {
    fn rewrite(&mut self, statements: &mut Vec<Statement>, index: usize) -> Visit {
        // Never descend into an injected guard: a callable notification
        // that itself contains a loop is embedded verbatim, not
        // re-instrumented
        if self.is_guard(&statements[index]) {
            return Visit::Skip;
        }

        let (position, body) = match &mut statements[index] {
            Statement::While { position, body, .. } => (*position, body),
            Statement::DoWhile { position, body, .. } => (*position, body),
            Statement::For { position, body, .. } => (*position, body),
            _ => return Visit::Descend,
        };

        let Position { line, column } = position.unwrap_or_default();
        let timer = self.names.generate_unique("timer");
        let guard = fragment::guard_statement(
            &timer,
            line,
            column,
            self.timeout_millis,
            self.callback.clone(),
        );

        prepend_to_body(body, guard);
        statements.insert(index, fragment::timer_init(&timer));
        Visit::InsertedBefore(1)
    }
}

/// Splice a guard in as the first statement of a loop body, wrapping a
/// bare-statement body into a block
fn prepend_to_body(body: &mut Box<Statement>, guard: Statement) {
    match body.as_mut() {
        Statement::Block(block) => block.statements.insert(0, guard),
        _ => {
            let original = std::mem::replace(body.as_mut(), Statement::Empty);
            **body = Statement::Block(Block {
                statements: vec![guard, original],
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OnBreak;
    use crate::script::parse;

    fn instrument(source: &str) -> Chunk {
        let config = InstrumentConfig::default();
        let pass = LoopGuard::new(&config).unwrap();
        let mut chunk = parse(source).unwrap();
        pass.instrument(&mut chunk);
        chunk
    }

    fn assert_guarded(body: &Statement) -> &Block {
        let block = match body {
            Statement::Block(block) => block,
            other => panic!("expected block body, got {:?}", other),
        };
        match &block.statements[0] {
            Statement::If { .. } => block,
            other => panic!("expected guard as first statement, got {:?}", other),
        }
    }

    #[test]
    fn test_while_loop_is_guarded() {
        let chunk = instrument("var n = 0;\nwhile (n < 5) {\n    n = n + 1;\n}");

        assert_eq!(chunk.statements.len(), 3);
        // Timer init inserted immediately before the loop
        match &chunk.statements[1] {
            Statement::VarDeclaration { name, .. } => assert_eq!(name, "_timer"),
            other => panic!("expected timer init, got {:?}", other),
        }
        match &chunk.statements[2] {
            Statement::While {
                condition, body, ..
            } => {
                // Loop head untouched
                assert!(matches!(condition, Expression::Binary { .. }));
                let block = assert_guarded(body);
                assert_eq!(block.statements.len(), 2);
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_do_while_and_for_are_guarded() {
        let chunk = instrument("do { a(); } while (b());\nfor (var i = 0; i < 3; i = i + 1) { c(); }");

        assert_eq!(chunk.statements.len(), 4);
        match &chunk.statements[1] {
            Statement::DoWhile { body, .. } => {
                assert_guarded(body);
            }
            other => panic!("expected do-while, got {:?}", other),
        }
        match &chunk.statements[3] {
            Statement::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                // Loop clauses untouched
                assert!(init.is_some());
                assert!(condition.is_some());
                assert!(update.is_some());
                assert_guarded(body);
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_body_is_wrapped() {
        let chunk = instrument("while (busy()) spin();");

        match &chunk.statements[1] {
            Statement::While { body, .. } => {
                let block = assert_guarded(body);
                assert_eq!(block.statements.len(), 2);
                match &block.statements[1] {
                    Statement::Expression(Expression::Call { callee, .. }) => {
                        assert_eq!(**callee, Expression::Identifier("spin".to_string()));
                    }
                    other => panic!("expected original call second, got {:?}", other),
                }
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_loops_get_distinct_timers() {
        let chunk = instrument("while (a) {\n    while (b) {\n        c();\n    }\n}");

        let outer_timer = match &chunk.statements[0] {
            Statement::VarDeclaration { name, .. } => name.clone(),
            other => panic!("expected timer init, got {:?}", other),
        };

        let inner_timer = match &chunk.statements[1] {
            Statement::While { body, .. } => {
                let block = assert_guarded(body);
                // guard, then inner timer init, then inner while
                assert_eq!(block.statements.len(), 3);
                match &block.statements[1] {
                    Statement::VarDeclaration { name, .. } => name.clone(),
                    other => panic!("expected inner timer init, got {:?}", other),
                }
            }
            other => panic!("expected while, got {:?}", other),
        };

        assert_ne!(outer_timer, inner_timer);
    }

    #[test]
    fn test_timer_avoids_user_bindings() {
        let chunk = instrument("var _timer = 9;\nwhile (a) b();");

        match &chunk.statements[1] {
            Statement::VarDeclaration { name, .. } => assert_eq!(name, "_timer2"),
            other => panic!("expected timer init, got {:?}", other),
        }
    }

    #[test]
    fn test_guard_carries_loop_position() {
        let chunk = instrument("var x = 0;\n\n  while (x < 1) { x = x + 1; }");

        match &chunk.statements[2] {
            Statement::While { body, .. } => {
                let block = assert_guarded(body);
                match &block.statements[0] {
                    Statement::If { then_branch, .. } => match then_branch.as_ref() {
                        Statement::Block(block) => match &block.statements[0] {
                            Statement::Expression(Expression::Call { arguments, .. }) => {
                                // The loop keyword sits at line 3, column 3
                                assert_eq!(
                                    arguments,
                                    &vec![Expression::Number(3.0), Expression::Number(3.0)]
                                );
                            }
                            other => panic!("expected callback call, got {:?}", other),
                        },
                        other => panic!("expected block, got {:?}", other),
                    },
                    other => panic!("expected guard if, got {:?}", other),
                }
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_position_defaults_to_zero() {
        let config = InstrumentConfig::default();
        let pass = LoopGuard::new(&config).unwrap();

        // A hand-built loop without a source position
        let mut chunk = Chunk {
            statements: vec![Statement::While {
                condition: Expression::Boolean(true),
                body: Box::new(Statement::Block(Block::new())),
                position: None,
            }],
        };
        pass.instrument(&mut chunk);

        match &chunk.statements[1] {
            Statement::While { body, .. } => match body.as_ref() {
                Statement::Block(block) => match &block.statements[0] {
                    Statement::If { then_branch, .. } => match then_branch.as_ref() {
                        Statement::Block(block) => match &block.statements[0] {
                            Statement::Expression(Expression::Call { arguments, .. }) => {
                                assert_eq!(
                                    arguments,
                                    &vec![Expression::Number(0.0), Expression::Number(0.0)]
                                );
                            }
                            other => panic!("expected callback call, got {:?}", other),
                        },
                        other => panic!("expected block, got {:?}", other),
                    },
                    other => panic!("expected guard if, got {:?}", other),
                },
                other => panic!("expected block body, got {:?}", other),
            },
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_loop_inside_function_declaration_is_guarded() {
        let chunk = instrument("function f() {\n    while (a) b();\n}");

        match &chunk.statements[0] {
            Statement::FunctionDeclaration(def) => {
                assert_eq!(def.body.statements.len(), 2);
                assert!(matches!(
                    def.body.statements[0],
                    Statement::VarDeclaration { .. }
                ));
                assert!(matches!(def.body.statements[1], Statement::While { .. }));
            }
            other => panic!("expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_callback_across_loops() {
        let config = InstrumentConfig::new(2000, OnBreak::Message("stuck".to_string())).unwrap();
        let pass = LoopGuard::new(&config).unwrap();
        let mut chunk = parse("while (a) b();\nwhile (c) d();").unwrap();
        pass.instrument(&mut chunk);

        let callee_of = |statement: &Statement| -> Expression {
            match statement {
                Statement::While { body, .. } => match body.as_ref() {
                    Statement::Block(block) => match &block.statements[0] {
                        Statement::If { then_branch, .. } => match then_branch.as_ref() {
                            Statement::Block(block) => match &block.statements[0] {
                                Statement::Expression(Expression::Call { callee, .. }) => {
                                    (**callee).clone()
                                }
                                other => panic!("expected call, got {:?}", other),
                            },
                            other => panic!("expected block, got {:?}", other),
                        },
                        other => panic!("expected guard, got {:?}", other),
                    },
                    other => panic!("expected block, got {:?}", other),
                },
                other => panic!("expected while, got {:?}", other),
            }
        };

        // The single synthesized callback is embedded in both guards
        assert_eq!(callee_of(&chunk.statements[1]), callee_of(&chunk.statements[3]));
    }

    #[test]
    fn test_callable_with_loop_is_not_reinstrumented() {
        let config = InstrumentConfig::new(
            100,
            OnBreak::Callable("(l, c) => { while (l > 0) l = l - 1; }".to_string()),
        )
        .unwrap();
        let pass = LoopGuard::new(&config).unwrap();
        let mut chunk = parse("while (a) b();").unwrap();
        pass.instrument(&mut chunk);

        // Exactly one timer init: the loop inside the embedded callback is
        // left verbatim
        let inits = chunk
            .statements
            .iter()
            .filter(|s| matches!(s, Statement::VarDeclaration { .. }))
            .count();
        assert_eq!(inits, 1);
    }
}
