use crate::ebv::effective_boolean_value;
use crate::order::{equals, partial_compare};
use crate::registry::CustomFunctionRef;
use crate::scalar::{
    add, divide, evaluate_builtin, multiply, now, subtract, unary_minus, unary_plus,
};
use crate::{BuiltinName, EvaluatedValue, FunctionRegistry};
use rdf_pipeline_common::QueryEvaluationError;
use rdf_pipeline_model::{
    Bindings, Expression, Function, GraphPattern, Literal, Term, ThinError, ThinResult, Variable,
};
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};

/// The binding property that holds the results of the `EXISTS` sub-patterns of an expression.
///
/// The value is a `Vec<bool>` with one entry per pattern of
/// [CompiledExpression::exists_patterns], in the same order.
pub const EXISTS_PROPERTY: &str = "rdf-pipeline:exists";

type UnaryOp = fn(&Term) -> ThinResult<Term>;
type BinaryOp = fn(&Term, &Term) -> ThinResult<Term>;

enum Node {
    Constant(Term),
    Variable(Variable),
    Or(Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Not(Box<Node>),
    Equal(Box<Node>, Box<Node>),
    SameTerm(Box<Node>, Box<Node>),
    Compare(Box<Node>, Box<Node>, fn(Ordering) -> bool),
    In(Box<Node>, Vec<Node>),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Exists(usize),
    Bound(Variable),
    If(Box<Node>, Box<Node>, Box<Node>),
    Coalesce(Vec<Node>),
    Builtin(BuiltinName, Vec<Node>),
    Custom(CustomFunctionRef, Vec<Node>),
}

/// An expression that has been checked against the available functions and can be evaluated
/// against binding sets.
///
/// `EXISTS` sub-patterns cannot be evaluated by the expression itself as they require the query
/// engine. They are collected in [Self::exists_patterns] and their results must be attached to
/// the evaluated binding set under [EXISTS_PROPERTY].
pub struct CompiledExpression {
    root: Node,
    exists_patterns: Vec<GraphPattern>,
}

impl CompiledExpression {
    /// Compiles `expression`.
    ///
    /// Fails if the expression calls an unknown function or a function with the wrong number of
    /// arguments. `NOW()` is evaluated once, at compile time.
    pub fn compile(
        expression: &Expression,
        registry: &FunctionRegistry,
    ) -> Result<Self, QueryEvaluationError> {
        let mut compiler = Compiler {
            registry,
            now: None,
            exists_patterns: Vec::new(),
        };
        let root = compiler.compile(expression)?;
        Ok(Self {
            root,
            exists_patterns: compiler.exists_patterns,
        })
    }

    /// The `EXISTS` sub-patterns of this expression.
    pub fn exists_patterns(&self) -> &[GraphPattern] {
        &self.exists_patterns
    }

    /// Evaluates the expression. Only a custom function at the root may produce a sequence.
    pub fn evaluate(&self, bindings: &Bindings) -> ThinResult<EvaluatedValue> {
        match &self.root {
            Node::Custom(function, args) => {
                let args = evaluate_args(args, bindings)?;
                function.evaluate(&args)
            }
            node => evaluate(node, bindings).map(EvaluatedValue::Term),
        }
    }

    /// The variable if the expression is just a variable.
    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.root {
            Node::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    /// Evaluates the expression to a single term.
    pub fn evaluate_term(&self, bindings: &Bindings) -> ThinResult<Term> {
        evaluate(&self.root, bindings)
    }

    /// Evaluates the effective boolean value of the expression.
    pub fn effective_boolean_value(&self, bindings: &Bindings) -> ThinResult<bool> {
        effective_boolean_value(&evaluate(&self.root, bindings)?)
    }
}

impl Debug for CompiledExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("exists_patterns", &self.exists_patterns.len())
            .finish_non_exhaustive()
    }
}

struct Compiler<'registry> {
    registry: &'registry FunctionRegistry,
    /// The value of every `NOW()` in the expression.
    now: Option<Term>,
    exists_patterns: Vec<GraphPattern>,
}

impl Compiler<'_> {
    fn compile(&mut self, expression: &Expression) -> Result<Node, QueryEvaluationError> {
        Ok(match expression {
            Expression::NamedNode(node) => Node::Constant(node.clone().into()),
            Expression::Literal(literal) => Node::Constant(literal.clone().into()),
            Expression::Variable(variable) => Node::Variable(variable.clone()),
            Expression::Or(lhs, rhs) => Node::Or(self.boxed(lhs)?, self.boxed(rhs)?),
            Expression::And(lhs, rhs) => Node::And(self.boxed(lhs)?, self.boxed(rhs)?),
            Expression::Not(inner) => Node::Not(self.boxed(inner)?),
            Expression::Equal(lhs, rhs) => Node::Equal(self.boxed(lhs)?, self.boxed(rhs)?),
            Expression::SameTerm(lhs, rhs) => {
                Node::SameTerm(self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Greater(lhs, rhs) => {
                Node::Compare(self.boxed(lhs)?, self.boxed(rhs)?, Ordering::is_gt)
            }
            Expression::GreaterOrEqual(lhs, rhs) => {
                Node::Compare(self.boxed(lhs)?, self.boxed(rhs)?, Ordering::is_ge)
            }
            Expression::Less(lhs, rhs) => {
                Node::Compare(self.boxed(lhs)?, self.boxed(rhs)?, Ordering::is_lt)
            }
            Expression::LessOrEqual(lhs, rhs) => {
                Node::Compare(self.boxed(lhs)?, self.boxed(rhs)?, Ordering::is_le)
            }
            Expression::In(needle, haystack) => {
                Node::In(self.boxed(needle)?, self.compile_all(haystack)?)
            }
            Expression::Add(lhs, rhs) => Node::Binary(add, self.boxed(lhs)?, self.boxed(rhs)?),
            Expression::Subtract(lhs, rhs) => {
                Node::Binary(subtract, self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Multiply(lhs, rhs) => {
                Node::Binary(multiply, self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::Divide(lhs, rhs) => {
                Node::Binary(divide, self.boxed(lhs)?, self.boxed(rhs)?)
            }
            Expression::UnaryPlus(inner) => Node::Unary(unary_plus, self.boxed(inner)?),
            Expression::UnaryMinus(inner) => Node::Unary(unary_minus, self.boxed(inner)?),
            Expression::Exists(pattern) => {
                self.exists_patterns.push(pattern.as_ref().clone());
                Node::Exists(self.exists_patterns.len() - 1)
            }
            Expression::Bound(variable) => Node::Bound(variable.clone()),
            Expression::If(condition, then, otherwise) => Node::If(
                self.boxed(condition)?,
                self.boxed(then)?,
                self.boxed(otherwise)?,
            ),
            Expression::Coalesce(args) => Node::Coalesce(self.compile_all(args)?),
            Expression::FunctionCall(function, args) => self.compile_call(function, args)?,
        })
    }

    fn compile_call(
        &mut self,
        function: &Function,
        args: &[Expression],
    ) -> Result<Node, QueryEvaluationError> {
        if let Some(builtin) = BuiltinName::from_function(function) {
            if !builtin.accepts_arity(args.len()) {
                return QueryEvaluationError::internal(format!(
                    "{builtin} called with {} arguments",
                    args.len()
                ));
            }
            if builtin == BuiltinName::Now {
                let now = self.now.get_or_insert_with(now);
                return Ok(Node::Constant(now.clone()));
            }
            return Ok(Node::Builtin(builtin, self.compile_all(args)?));
        }

        let Function::Custom(name) = function else {
            return Err(QueryEvaluationError::UnknownFunction(function.to_string()));
        };
        let Some(custom) = self.registry.get(name) else {
            return Err(QueryEvaluationError::UnknownFunction(name.to_string()));
        };
        if !custom.accepts_arity(args.len()) {
            return QueryEvaluationError::internal(format!(
                "{name} called with {} arguments",
                args.len()
            ));
        }
        Ok(Node::Custom(custom.clone(), self.compile_all(args)?))
    }

    fn boxed(&mut self, expression: &Expression) -> Result<Box<Node>, QueryEvaluationError> {
        self.compile(expression).map(Box::new)
    }

    fn compile_all(&mut self, expressions: &[Expression]) -> Result<Vec<Node>, QueryEvaluationError> {
        expressions
            .iter()
            .map(|expression| self.compile(expression))
            .collect()
    }
}

fn evaluate(node: &Node, bindings: &Bindings) -> ThinResult<Term> {
    match node {
        Node::Constant(term) => Ok(term.clone()),
        Node::Variable(variable) => bindings.get(variable).cloned().ok_or(ThinError::default()),
        Node::Or(lhs, rhs) => {
            let lhs = evaluate_ebv(lhs, bindings);
            if lhs == Ok(true) {
                return Ok(boolean(true));
            }
            match (lhs, evaluate_ebv(rhs, bindings)) {
                (_, Ok(true)) => Ok(boolean(true)),
                (Ok(false), Ok(false)) => Ok(boolean(false)),
                _ => ThinError::expected(),
            }
        }
        Node::And(lhs, rhs) => {
            let lhs = evaluate_ebv(lhs, bindings);
            if lhs == Ok(false) {
                return Ok(boolean(false));
            }
            match (lhs, evaluate_ebv(rhs, bindings)) {
                (_, Ok(false)) => Ok(boolean(false)),
                (Ok(true), Ok(true)) => Ok(boolean(true)),
                _ => ThinError::expected(),
            }
        }
        Node::Not(inner) => Ok(boolean(!evaluate_ebv(inner, bindings)?)),
        Node::Equal(lhs, rhs) => {
            let lhs = evaluate(lhs, bindings)?;
            let rhs = evaluate(rhs, bindings)?;
            Ok(boolean(equals(&lhs, &rhs)?))
        }
        Node::SameTerm(lhs, rhs) => {
            Ok(boolean(evaluate(lhs, bindings)? == evaluate(rhs, bindings)?))
        }
        Node::Compare(lhs, rhs, accepts) => {
            let lhs = evaluate(lhs, bindings)?;
            let rhs = evaluate(rhs, bindings)?;
            Ok(boolean(accepts(partial_compare(&lhs, &rhs)?)))
        }
        Node::In(needle, haystack) => {
            let needle = evaluate(needle, bindings)?;
            let mut failed = false;
            for candidate in haystack {
                match evaluate(candidate, bindings).and_then(|term| equals(&needle, &term)) {
                    Ok(true) => return Ok(boolean(true)),
                    Ok(false) => {}
                    Err(_) => failed = true,
                }
            }
            if failed {
                ThinError::expected()
            } else {
                Ok(boolean(false))
            }
        }
        Node::Unary(op, inner) => op(&evaluate(inner, bindings)?),
        Node::Binary(op, lhs, rhs) => op(&evaluate(lhs, bindings)?, &evaluate(rhs, bindings)?),
        Node::Exists(index) => bindings
            .property::<Vec<bool>>(EXISTS_PROPERTY)
            .and_then(|results| results.get(*index))
            .map(|exists| boolean(*exists))
            .ok_or(ThinError::default()),
        Node::Bound(variable) => Ok(boolean(bindings.has(variable))),
        Node::If(condition, then, otherwise) => {
            if evaluate_ebv(condition, bindings)? {
                evaluate(then, bindings)
            } else {
                evaluate(otherwise, bindings)
            }
        }
        Node::Coalesce(args) => args
            .iter()
            .find_map(|arg| evaluate(arg, bindings).ok())
            .ok_or(ThinError::default()),
        Node::Builtin(name, args) => evaluate_builtin(*name, &evaluate_args(args, bindings)?),
        Node::Custom(function, args) => function
            .evaluate(&evaluate_args(args, bindings)?)?
            .into_term(),
    }
}

fn evaluate_ebv(node: &Node, bindings: &Bindings) -> ThinResult<bool> {
    effective_boolean_value(&evaluate(node, bindings)?)
}

fn evaluate_args(args: &[Node], bindings: &Bindings) -> ThinResult<Vec<Term>> {
    args.iter().map(|arg| evaluate(arg, bindings)).collect()
}

fn boolean(value: bool) -> Term {
    Literal::from(value).into()
}
