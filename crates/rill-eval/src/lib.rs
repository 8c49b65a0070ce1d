//! Tree-walking evaluator.
//!
//! Consumes a finished tree and an output sink, producing a final value or a
//! runtime error. This sits strictly downstream of parsing: it never feeds
//! back into the tree, and a tree with diagnostics is simply refused at the
//! offending statement.

use std::collections::HashMap;
use std::fmt;

use line_index::LineIndex;
use rill_syntax::ast::{
    BinaryExpr, CallExpr, DefineStmt, Expr, FnBody, IfStmt, LetStmt, Literal, NameExpr, Node as _,
    PrefixExpr, PrintStmt, Program, ReturnStmt, Statement, StatementList, WhileStmt,
};
use rill_syntax::{SyntaxKind, SyntaxNode, SyntaxTree};

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
    Unit,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Unit => f.write_str("()"),
        }
    }
}

/// A failure during evaluation, with the 1-based source position of the
/// node that caused it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Runs a program, writing `print` output to `output`.
///
/// The final value is the value of the first top-level `return`, or unit if
/// the program runs off the end.
pub fn evaluate(tree: &SyntaxTree, output: &mut dyn fmt::Write) -> Result<Value, RuntimeError> {
    let program = Program::cast(tree.root().clone()).expect("the tree root is a program");
    let text = tree.text().to_string();
    let mut interpreter = Interpreter {
        line_index: LineIndex::new(&text),
        output,
        scopes: vec![HashMap::new()],
        functions: HashMap::new(),
    };
    for statement in program.statements() {
        if let Flow::Return(value) = interpreter.statement(&statement)? {
            return Ok(value);
        }
    }
    Ok(Value::Unit)
}

enum Flow {
    Normal,
    Return(Value),
}

struct Function {
    params: Vec<String>,
    body: FnBody,
}

struct Interpreter<'a> {
    line_index: LineIndex,
    output: &'a mut dyn fmt::Write,
    /// Innermost scope last; index 0 is the global scope.
    scopes: Vec<HashMap<String, Value>>,
    functions: HashMap<String, Function>,
}

impl Interpreter<'_> {
    fn error(&self, message: impl Into<String>, node: &SyntaxNode) -> RuntimeError {
        let position = self.line_index.line_col(node.trimmed_range().start());
        RuntimeError { message: message.into(), line: position.line + 1, column: position.col + 1 }
    }

    fn statement(&mut self, statement: &Statement) -> Result<Flow, RuntimeError> {
        if statement.syntax().green().contains_diagnostics() {
            return Err(self.error("Cannot execute erroneous code", statement.syntax()));
        }
        match statement {
            Statement::Print(print) => self.print(print),
            Statement::Return(ret) => self.ret(ret),
            Statement::Let(binding) => self.binding(binding),
            Statement::Define(define) => self.define(define),
            Statement::If(conditional) => self.conditional(conditional),
            Statement::While(loop_stmt) => self.loop_stmt(loop_stmt),
            Statement::Error(error) => {
                Err(self.error("Cannot execute erroneous code", error.syntax()))
            }
        }
    }

    fn statement_list(&mut self, list: &StatementList) -> Result<Flow, RuntimeError> {
        for statement in list.statements() {
            if let Flow::Return(value) = self.statement(&statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn print(&mut self, print: &PrintStmt) -> Result<Flow, RuntimeError> {
        let syntax = print.syntax().clone();
        let value = self.required_expr(print.value(), &syntax)?;
        writeln!(self.output, "{value}")
            .map_err(|_| self.error("Output sink failed", &syntax))?;
        Ok(Flow::Normal)
    }

    fn ret(&mut self, ret: &ReturnStmt) -> Result<Flow, RuntimeError> {
        let syntax = ret.syntax().clone();
        let value = self.required_expr(ret.value(), &syntax)?;
        Ok(Flow::Return(value))
    }

    fn binding(&mut self, binding: &LetStmt) -> Result<Flow, RuntimeError> {
        let syntax = binding.syntax().clone();
        let name = binding
            .name()
            .ok_or_else(|| self.error("Cannot execute erroneous code", &syntax))?;
        let value = self.required_expr(binding.value(), &syntax)?;
        let name = name.text().to_string();
        let target = self
            .scopes
            .iter()
            .rposition(|scope| scope.contains_key(&name))
            .unwrap_or(self.scopes.len() - 1);
        self.scopes[target].insert(name, value);
        Ok(Flow::Normal)
    }

    fn define(&mut self, define: &DefineStmt) -> Result<Flow, RuntimeError> {
        let syntax = define.syntax().clone();
        let name = define
            .name()
            .ok_or_else(|| self.error("Cannot execute erroneous code", &syntax))?;
        let body = define
            .body()
            .ok_or_else(|| self.error("Cannot execute erroneous code", &syntax))?;
        let params = define.params().iter().map(|token| token.text().to_string()).collect();
        self.functions.insert(name.text().to_string(), Function { params, body });
        Ok(Flow::Normal)
    }

    fn conditional(&mut self, conditional: &IfStmt) -> Result<Flow, RuntimeError> {
        let syntax = conditional.syntax().clone();
        let condition = self.required_expr(conditional.condition(), &syntax)?;
        if self.truthy(condition, &syntax)? {
            if let Some(branch) = conditional.then_branch() {
                return self.statement_list(&branch);
            }
        } else if let Some(branch) = conditional.else_branch() {
            return self.statement_list(&branch);
        }
        Ok(Flow::Normal)
    }

    fn loop_stmt(&mut self, loop_stmt: &WhileStmt) -> Result<Flow, RuntimeError> {
        let syntax = loop_stmt.syntax().clone();
        loop {
            let condition = self.required_expr(loop_stmt.condition(), &syntax)?;
            if !self.truthy(condition, &syntax)? {
                return Ok(Flow::Normal);
            }
            if let Some(body) = loop_stmt.body() {
                if let Flow::Return(value) = self.statement_list(&body)? {
                    return Ok(Flow::Return(value));
                }
            }
        }
    }

    fn truthy(&self, value: Value, node: &SyntaxNode) -> Result<bool, RuntimeError> {
        match value {
            Value::Number(n) => Ok(n != 0.0),
            _ => Err(self.error("Condition must be a number", node)),
        }
    }

    fn required_expr(
        &mut self,
        expr: Option<Expr>,
        parent: &SyntaxNode,
    ) -> Result<Value, RuntimeError> {
        match expr {
            Some(expr) => self.expr(&expr),
            None => Err(self.error("Cannot execute erroneous code", parent)),
        }
    }

    fn expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Name(name) => self.name(name),
            Expr::Call(call) => self.call(call),
            Expr::Literal(literal) => self.literal(literal),
            Expr::Paren(paren) => {
                let syntax = paren.syntax().clone();
                self.required_expr(paren.inner(), &syntax)
            }
            Expr::Binary(binary) => self.binary(binary),
            Expr::Prefix(prefix) => self.prefix(prefix),
        }
    }

    fn name(&mut self, name: &NameExpr) -> Result<Value, RuntimeError> {
        let syntax = name.syntax().clone();
        let token =
            name.token().ok_or_else(|| self.error("Cannot execute erroneous code", &syntax))?;
        let text = token.text();
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(text) {
                return Ok(value.clone());
            }
        }
        Err(self.error(format!("Undefined variable '{text}'"), &syntax))
    }

    fn literal(&mut self, literal: &Literal) -> Result<Value, RuntimeError> {
        if let Some(number) = literal.number_value() {
            return Ok(Value::Number(number));
        }
        if let Some(string) = literal.string_value() {
            return Ok(Value::Str(string));
        }
        Err(self.error("Cannot execute erroneous code", literal.syntax()))
    }

    fn prefix(&mut self, prefix: &PrefixExpr) -> Result<Value, RuntimeError> {
        let syntax = prefix.syntax().clone();
        let operand = self.required_expr(prefix.operand(), &syntax)?;
        match operand {
            Value::Number(n) => Ok(Value::Number(-n)),
            _ => Err(self.error("Unary '-' needs a number", &syntax)),
        }
    }

    fn binary(&mut self, binary: &BinaryExpr) -> Result<Value, RuntimeError> {
        let syntax = binary.syntax().clone();
        let lhs = self.required_expr(binary.lhs(), &syntax)?;
        let rhs = self.required_expr(binary.rhs(), &syntax)?;
        let op = binary
            .op()
            .ok_or_else(|| self.error("Cannot execute erroneous code", &syntax))?;
        match (op.kind(), lhs, rhs) {
            (SyntaxKind::PLUS, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (SyntaxKind::PLUS, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (SyntaxKind::MINUS, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (SyntaxKind::STAR, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (SyntaxKind::SLASH, Value::Number(_), Value::Number(b)) if b == 0.0 => {
                Err(self.error("Division by zero", &syntax))
            }
            (SyntaxKind::SLASH, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (kind, _, _) => {
                Err(self.error(format!("Cannot apply {} here", kind.describe()), &syntax))
            }
        }
    }

    fn call(&mut self, call: &CallExpr) -> Result<Value, RuntimeError> {
        let syntax = call.syntax().clone();
        let callee =
            call.callee().ok_or_else(|| self.error("Cannot execute erroneous code", &syntax))?;
        let name = callee.text().to_string();

        let mut arguments = Vec::new();
        for argument in call.args() {
            arguments.push(self.expr(&argument)?);
        }

        let function = self
            .functions
            .get(&name)
            .ok_or_else(|| self.error(format!("Undefined function '{name}'"), &syntax))?;
        if function.params.len() != arguments.len() {
            let message = format!(
                "Wrong number of arguments to '{name}': expected {}, got {}",
                function.params.len(),
                arguments.len(),
            );
            return Err(self.error(message, &syntax));
        }

        let params = function.params.clone();
        let body = match &function.body {
            FnBody::Expr(expr) => FnBody::Expr(expr.clone()),
            FnBody::Block(block) => FnBody::Block(block.clone()),
        };

        // The body sees the global scope plus its parameters, not the
        // caller's locals.
        let saved = self.scopes.split_off(1);
        self.scopes.push(params.into_iter().zip(arguments).collect());
        let result = match &body {
            FnBody::Expr(expr) => self.expr(expr).map(Flow::Return),
            FnBody::Block(block) => self.statement_list(block),
        };
        self.scopes.truncate(1);
        self.scopes.extend(saved);

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Unit),
        }
    }
}
