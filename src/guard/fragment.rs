//! Guard Fragment Builder
//!
//! Builds the two AST fragments injected around every loop: the timer
//! initialization that runs immediately before the loop, and the guard
//! conditional spliced in as the loop body's first statement.

use crate::script::ast::*;

/// Build `var <timer> = now();`
pub fn timer_init(timer: &str) -> Statement {
    Statement::VarDeclaration {
        name: timer.to_string(),
        initializer: Some(now_call()),
    }
}

/// Build `if ((now() - <timer>) > <timeout>) { <callback>(<line>, <column>); break; }`
///
/// Line, column and timeout are embedded as literals specific to this call
/// site. The comparison is strictly greater-than: a loop whose elapsed time
/// exactly equals the timeout is not broken.
pub fn guard_statement(
    timer: &str,
    line: usize,
    column: usize,
    timeout_millis: u64,
    callback: Expression,
) -> Statement {
    let elapsed = Expression::Binary {
        left: Box::new(now_call()),
        operator: BinaryOperator::Sub,
        right: Box::new(Expression::Identifier(timer.to_string())),
    };

    let condition = Expression::Binary {
        left: Box::new(elapsed),
        operator: BinaryOperator::Gt,
        right: Box::new(Expression::Number(timeout_millis as f64)),
    };

    let notify = Statement::Expression(Expression::Call {
        callee: Box::new(callback),
        arguments: vec![
            Expression::Number(line as f64),
            Expression::Number(column as f64),
        ],
    });

    Statement::If {
        condition,
        then_branch: Box::new(Statement::Block(Block {
            statements: vec![notify, Statement::Break],
        })),
        else_branch: None,
    }
}

/// Build a call to the host `now` primitive
fn now_call() -> Expression {
    Expression::Call {
        callee: Box::new(Expression::Identifier("now".to_string())),
        arguments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_init_shape() {
        let init = timer_init("_timer");
        match init {
            Statement::VarDeclaration { name, initializer } => {
                assert_eq!(name, "_timer");
                match initializer {
                    Some(Expression::Call { callee, arguments }) => {
                        assert_eq!(*callee, Expression::Identifier("now".to_string()));
                        assert!(arguments.is_empty());
                    }
                    other => panic!("expected now() initializer, got {:?}", other),
                }
            }
            other => panic!("expected VarDeclaration, got {:?}", other),
        }
    }

    #[test]
    fn test_guard_statement_shape() {
        let callback = Expression::Identifier("notify".to_string());
        let guard = guard_statement("_timer", 5, 2, 2000, callback);

        let (condition, then_branch) = match guard {
            Statement::If {
                condition,
                then_branch,
                else_branch: None,
            } => (condition, then_branch),
            other => panic!("expected If without else, got {:?}", other),
        };

        // Strictly greater-than against the literal timeout
        match condition {
            Expression::Binary {
                operator: BinaryOperator::Gt,
                left,
                right,
            } => {
                assert_eq!(*right, Expression::Number(2000.0));
                match *left {
                    Expression::Binary {
                        operator: BinaryOperator::Sub,
                        right: timer,
                        ..
                    } => {
                        assert_eq!(*timer, Expression::Identifier("_timer".to_string()));
                    }
                    other => panic!("expected now() - timer, got {:?}", other),
                }
            }
            other => panic!("expected > comparison, got {:?}", other),
        }

        // Callback invocation with the loop position, then break
        match then_branch.as_ref() {
            Statement::Block(block) => {
                assert_eq!(block.statements.len(), 2);
                match &block.statements[0] {
                    Statement::Expression(Expression::Call { arguments, .. }) => {
                        assert_eq!(
                            arguments,
                            &vec![Expression::Number(5.0), Expression::Number(2.0)]
                        );
                    }
                    other => panic!("expected callback call, got {:?}", other),
                }
                assert_eq!(block.statements[1], Statement::Break);
            }
            other => panic!("expected block, got {:?}", other),
        }
    }
}
