//! Script Interpreter
//!
//! A tree-walking evaluator for the sandbox script language, used to
//! execute instrumented scripts. The host supplies the `now` and `report`
//! primitives the injected guards rely on. A step limit bounds execution
//! so that even a script whose guard was defeated cannot hang the caller.

use std::rc::Rc;

use super::env::{EnvRef, Environment};
use super::value::{FunctionBody, FunctionValue, NativeValue, Value};
use super::Host;
use crate::script;
use crate::script::ast::*;
use crate::script::error::{ScriptError, ScriptResult};

/// Default bound on executed statements and calls per run
pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;

/// Control-flow signal produced by statement execution
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Tree-walking interpreter with a pluggable host
pub struct Interpreter {
    host: Rc<dyn Host>,
    globals: EnvRef,
    step_limit: u64,
    steps: u64,
}

impl Interpreter {
    /// Create an interpreter with the host's `now` and `report` primitives
    /// bound in the global scope
    pub fn new(host: Rc<dyn Host>) -> Self {
        let globals = Environment::root();
        {
            let mut env = globals.borrow_mut();
            env.declare(
                "now",
                Value::Native(NativeValue {
                    name: "now",
                    call: native_now,
                }),
            );
            env.declare(
                "report",
                Value::Native(NativeValue {
                    name: "report",
                    call: native_report,
                }),
            );
        }
        Interpreter {
            host,
            globals,
            step_limit: DEFAULT_STEP_LIMIT,
            steps: 0,
        }
    }

    /// Replace the default step limit
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    /// Parse and execute a script
    pub fn run(&mut self, source: &str) -> ScriptResult<()> {
        let chunk = script::parse(source)?;
        self.execute(&chunk)
    }

    /// Execute an already-parsed chunk
    pub fn execute(&mut self, chunk: &Chunk) -> ScriptResult<()> {
        self.steps = 0;
        let globals = self.globals.clone();
        for statement in &chunk.statements {
            match self.execute_statement(statement, &globals)? {
                Flow::Normal => {}
                Flow::Return(_) => break,
                Flow::Break | Flow::Continue => {
                    return Err(ScriptError::RuntimeError(
                        "'break' or 'continue' outside of a loop".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Read a global binding, for inspecting script results
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    fn tick(&mut self) -> ScriptResult<()> {
        self.steps += 1;
        if self.steps > self.step_limit {
            Err(ScriptError::StepLimitExceeded {
                limit: self.step_limit,
            })
        } else {
            Ok(())
        }
    }

    fn execute_statement(&mut self, statement: &Statement, env: &EnvRef) -> ScriptResult<Flow> {
        self.tick()?;

        match statement {
            Statement::VarDeclaration { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer, env)?,
                    None => Value::Null,
                };
                env.borrow_mut().declare(name, value);
                Ok(Flow::Normal)
            }
            Statement::Assignment { target, value } => {
                let value = self.evaluate(value, env)?;
                match target {
                    AssignTarget::Name(name) => {
                        if !env.borrow_mut().assign(name, value) {
                            return Err(ScriptError::UndefinedVariable(name.clone()));
                        }
                    }
                    AssignTarget::Index { object, index } => {
                        let object = self.evaluate(object, env)?;
                        let index = self.evaluate(index, env)?;
                        let elements = match object {
                            Value::Array(elements) => elements,
                            other => {
                                return Err(ScriptError::TypeError {
                                    expected: "array".to_string(),
                                    got: other.type_name().to_string(),
                                })
                            }
                        };
                        let index = array_index(&index)?;
                        let mut elements = elements.borrow_mut();
                        if index >= elements.len() {
                            elements.resize(index + 1, Value::Null);
                        }
                        elements[index] = value;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Expression(expr) => {
                self.evaluate(expr, env)?;
                Ok(Flow::Normal)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute_statement(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::Block(block) => {
                let scope = Environment::child(env);
                self.execute_block(&block.statements, &scope)
            }
            Statement::While {
                condition, body, ..
            } => {
                loop {
                    if !self.evaluate(condition, env)?.is_truthy() {
                        break;
                    }
                    match self.execute_statement(body, env)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::DoWhile {
                body, condition, ..
            } => {
                loop {
                    match self.execute_statement(body, env)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if !self.evaluate(condition, env)?.is_truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                let scope = Environment::child(env);
                if let Some(init) = init {
                    self.execute_statement(init, &scope)?;
                }
                loop {
                    if let Some(condition) = condition {
                        if !self.evaluate(condition, &scope)?.is_truthy() {
                            break;
                        }
                    }
                    match self.execute_statement(body, &scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if let Some(update) = update {
                        self.execute_statement(update, &scope)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Break => Ok(Flow::Break),
            Statement::Continue => Ok(Flow::Continue),
            Statement::Return(value) => {
                let value = match value {
                    Some(value) => self.evaluate(value, env)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::FunctionDeclaration(def) => {
                let closure = Value::Function(Rc::new(FunctionValue {
                    name: Some(def.name.clone()),
                    parameters: def.parameters.clone(),
                    body: FunctionBody::Block(def.body.clone()),
                    env: env.clone(),
                }));
                env.borrow_mut().declare(&def.name, closure);
                Ok(Flow::Normal)
            }
            Statement::Empty => Ok(Flow::Normal),
        }
    }

    fn execute_block(&mut self, statements: &[Statement], env: &EnvRef) -> ScriptResult<Flow> {
        for statement in statements {
            match self.execute_statement(statement, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn evaluate(&mut self, expr: &Expression, env: &EnvRef) -> ScriptResult<Value> {
        match expr {
            Expression::Null => Ok(Value::Null),
            Expression::Boolean(b) => Ok(Value::Boolean(*b)),
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Identifier(name) => env
                .borrow()
                .get(name)
                .ok_or_else(|| ScriptError::UndefinedVariable(name.clone())),
            Expression::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element, env)?);
                }
                Ok(Value::Array(Rc::new(std::cell::RefCell::new(values))))
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => self.binary(left, *operator, right, env),
            Expression::Unary { operator, operand } => {
                let operand = self.evaluate(operand, env)?;
                match operator {
                    UnaryOperator::Not => Ok(Value::Boolean(!operand.is_truthy())),
                    UnaryOperator::Minus => match operand {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(ScriptError::TypeError {
                            expected: "number".to_string(),
                            got: other.type_name().to_string(),
                        }),
                    },
                }
            }
            Expression::Call { callee, arguments } => {
                // Method-style calls on arrays are dispatched by name
                if let Expression::Member { object, field } = callee.as_ref() {
                    let object = self.evaluate(object, env)?;
                    if let Value::Array(elements) = &object {
                        let elements = elements.clone();
                        let mut values = Vec::with_capacity(arguments.len());
                        for argument in arguments {
                            values.push(self.evaluate(argument, env)?);
                        }
                        return array_method(&elements, field, values);
                    }
                    return Err(ScriptError::RuntimeError(format!(
                        "unknown method '{}' on {}",
                        field,
                        object.type_name()
                    )));
                }

                let callee = self.evaluate(callee, env)?;
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument, env)?);
                }
                self.call_value(callee, values)
            }
            Expression::Member { object, field } => {
                let object = self.evaluate(object, env)?;
                match (&object, field.as_str()) {
                    (Value::Array(elements), "length") => {
                        Ok(Value::Number(elements.borrow().len() as f64))
                    }
                    (Value::String(s), "length") => {
                        Ok(Value::Number(s.chars().count() as f64))
                    }
                    _ => Err(ScriptError::RuntimeError(format!(
                        "unknown property '{}' on {}",
                        field,
                        object.type_name()
                    ))),
                }
            }
            Expression::Index { object, index } => {
                let object = self.evaluate(object, env)?;
                let index = self.evaluate(index, env)?;
                match object {
                    Value::Array(elements) => {
                        let index = array_index(&index)?;
                        Ok(elements
                            .borrow()
                            .get(index)
                            .cloned()
                            .unwrap_or(Value::Null))
                    }
                    other => Err(ScriptError::TypeError {
                        expected: "array".to_string(),
                        got: other.type_name().to_string(),
                    }),
                }
            }
            Expression::Function(def) => Ok(Value::Function(Rc::new(FunctionValue {
                name: def.name.clone(),
                parameters: def.parameters.clone(),
                body: FunctionBody::Block(def.body.clone()),
                env: env.clone(),
            }))),
            Expression::Arrow { parameters, body } => {
                let body = match body {
                    ArrowBody::Expression(expr) => FunctionBody::Expression((**expr).clone()),
                    ArrowBody::Block(block) => FunctionBody::Block(block.clone()),
                };
                Ok(Value::Function(Rc::new(FunctionValue {
                    name: None,
                    parameters: parameters.clone(),
                    body,
                    env: env.clone(),
                })))
            }
        }
    }

    fn binary(
        &mut self,
        left: &Expression,
        operator: BinaryOperator,
        right: &Expression,
        env: &EnvRef,
    ) -> ScriptResult<Value> {
        // Short-circuit forms first
        match operator {
            BinaryOperator::And => {
                let left = self.evaluate(left, env)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                return self.evaluate(right, env);
            }
            BinaryOperator::Or => {
                let left = self.evaluate(left, env)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                return self.evaluate(right, env);
            }
            _ => {}
        }

        let left = self.evaluate(left, env)?;
        let right = self.evaluate(right, env)?;

        match operator {
            BinaryOperator::Add => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", left, right)))
                }
                _ => Err(type_error_number(&left, &right)),
            },
            BinaryOperator::Sub => numeric(&left, &right).map(|(a, b)| Value::Number(a - b)),
            BinaryOperator::Mul => numeric(&left, &right).map(|(a, b)| Value::Number(a * b)),
            BinaryOperator::Div => numeric(&left, &right).map(|(a, b)| Value::Number(a / b)),
            BinaryOperator::Mod => numeric(&left, &right).map(|(a, b)| Value::Number(a % b)),
            BinaryOperator::Eq => Ok(Value::Boolean(left == right)),
            BinaryOperator::Ne => Ok(Value::Boolean(left != right)),
            BinaryOperator::Lt => compare(&left, &right, |o| o == std::cmp::Ordering::Less),
            BinaryOperator::Le => compare(&left, &right, |o| o != std::cmp::Ordering::Greater),
            BinaryOperator::Gt => compare(&left, &right, |o| o == std::cmp::Ordering::Greater),
            BinaryOperator::Ge => compare(&left, &right, |o| o != std::cmp::Ordering::Less),
            // Already handled by the short-circuit forms above; kept
            // non-short-circuiting here for match exhaustiveness
            BinaryOperator::And => Ok(if left.is_truthy() { right } else { left }),
            BinaryOperator::Or => Ok(if left.is_truthy() { left } else { right }),
        }
    }

    /// Invoke a callable value with already-evaluated arguments. Missing
    /// arguments become null; extra arguments are dropped.
    pub fn call_value(&mut self, callee: Value, arguments: Vec<Value>) -> ScriptResult<Value> {
        match callee {
            Value::Native(native) => (native.call)(self.host.as_ref(), &arguments),
            Value::Function(func) => {
                self.tick()?;
                let call_env = Environment::child(&func.env);
                {
                    let mut env = call_env.borrow_mut();
                    if let Some(name) = &func.name {
                        env.declare(name, Value::Function(func.clone()));
                    }
                    for (i, parameter) in func.parameters.iter().enumerate() {
                        let value = arguments.get(i).cloned().unwrap_or(Value::Null);
                        env.declare(parameter, value);
                    }
                }
                match &func.body {
                    FunctionBody::Expression(expr) => self.evaluate(expr, &call_env),
                    FunctionBody::Block(block) => {
                        match self.execute_block(&block.statements, &call_env)? {
                            Flow::Return(value) => Ok(value),
                            Flow::Normal => Ok(Value::Null),
                            Flow::Break | Flow::Continue => Err(ScriptError::RuntimeError(
                                "'break' or 'continue' outside of a loop".to_string(),
                            )),
                        }
                    }
                }
            }
            other => Err(ScriptError::TypeError {
                expected: "function".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }
}

fn numeric(left: &Value, right: &Value) -> ScriptResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(type_error_number(left, right)),
    }
}

fn type_error_number(left: &Value, right: &Value) -> ScriptError {
    let got = if matches!(left, Value::Number(_)) {
        right
    } else {
        left
    };
    ScriptError::TypeError {
        expected: "number".to_string(),
        got: got.type_name().to_string(),
    }
}

fn compare(
    left: &Value,
    right: &Value,
    accept: fn(std::cmp::Ordering) -> bool,
) -> ScriptResult<Value> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(ScriptError::TypeError {
                expected: "comparable values".to_string(),
                got: format!("{} and {}", left.type_name(), right.type_name()),
            })
        }
    };
    // NaN comparisons are simply false
    Ok(Value::Boolean(ordering.map(accept).unwrap_or(false)))
}

fn array_index(value: &Value) -> ScriptResult<usize> {
    match value {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        other => Err(ScriptError::TypeError {
            expected: "non-negative integer index".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn array_method(
    elements: &Rc<std::cell::RefCell<Vec<Value>>>,
    method: &str,
    arguments: Vec<Value>,
) -> ScriptResult<Value> {
    match method {
        "push" => {
            let mut elements = elements.borrow_mut();
            for argument in arguments {
                elements.push(argument);
            }
            Ok(Value::Number(elements.len() as f64))
        }
        "pop" => Ok(elements.borrow_mut().pop().unwrap_or(Value::Null)),
        other => Err(ScriptError::RuntimeError(format!(
            "unknown method '{}' on array",
            other
        ))),
    }
}

fn native_now(host: &dyn Host, _arguments: &[Value]) -> ScriptResult<Value> {
    Ok(Value::Number(host.now()))
}

fn native_report(host: &dyn Host, arguments: &[Value]) -> ScriptResult<Value> {
    let message = arguments
        .first()
        .map(|value| value.to_string())
        .unwrap_or_default();
    host.report(&message);
    Ok(Value::Null)
}
