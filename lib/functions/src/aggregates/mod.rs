//! The SPARQL set functions.
//!
//! Every aggregate is evaluated over the [GroupColumns] of one group. Rows for which the
//! aggregated expression fails are passed to the accumulator as [None].

mod avg;
mod columns;
mod count;
mod group_concat;
mod max;
mod min;
mod sample;
mod sum;

use crate::{CompiledExpression, FunctionRegistry};
use rdf_pipeline_common::QueryEvaluationError;
use rdf_pipeline_model::{AggregateExpression, AggregateFunction, Term, ThinResult};
use rustc_hash::FxHashSet;
use std::fmt::Debug;

pub use avg::Avg;
pub use columns::GroupColumns;
pub use count::Count;
pub use group_concat::GroupConcat;
pub use max::Max;
pub use min::Min;
pub use sample::Sample;
pub use sum::Sum;

/// Accumulates the values of one group.
pub trait Accumulator: Debug + Send {
    /// Adds the value of the next row. [None] if the aggregated expression failed for the row.
    fn accumulate(&mut self, value: Option<Term>);

    /// Computes the aggregate.
    ///
    /// Returns `Ok(None)` if the aggregate has no value for the group (e.g., `MIN` of no values)
    /// and an error if the aggregate cannot be computed.
    fn finish(self: Box<Self>) -> ThinResult<Option<Term>>;
}

/// Passes on every distinct value only once. Failures are always passed on.
#[derive(Debug)]
struct Distinct {
    inner: Box<dyn Accumulator>,
    seen: FxHashSet<Term>,
}

impl Accumulator for Distinct {
    fn accumulate(&mut self, value: Option<Term>) {
        match value {
            Some(term) => {
                if self.seen.insert(term.clone()) {
                    self.inner.accumulate(Some(term));
                }
            }
            None => self.inner.accumulate(None),
        }
    }

    fn finish(self: Box<Self>) -> ThinResult<Option<Term>> {
        self.inner.finish()
    }
}

/// The built-in set functions.
#[derive(Clone, Debug, PartialEq, Eq)]
enum SetFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat(Option<String>),
}

impl SetFunction {
    fn try_from_function(function: &AggregateFunction) -> Result<Self, QueryEvaluationError> {
        Ok(match function {
            AggregateFunction::Count => Self::Count,
            AggregateFunction::Sum => Self::Sum,
            AggregateFunction::Avg => Self::Avg,
            AggregateFunction::Min => Self::Min,
            AggregateFunction::Max => Self::Max,
            AggregateFunction::Sample => Self::Sample,
            AggregateFunction::GroupConcat { separator } => Self::GroupConcat(separator.clone()),
            AggregateFunction::Custom(name) => {
                return Err(QueryEvaluationError::UnknownAggregate(name.to_string()))
            }
        })
    }

    fn create_accumulator(&self, distinct: bool) -> Box<dyn Accumulator> {
        let accumulator: Box<dyn Accumulator> = match self {
            Self::Count => Box::new(Count::default()),
            Self::Sum => Box::new(Sum::default()),
            Self::Avg => Box::new(Avg::default()),
            Self::Min => Box::new(Min::default()),
            Self::Max => Box::new(Max::default()),
            Self::Sample => Box::new(Sample::default()),
            Self::GroupConcat(separator) => Box::new(GroupConcat::new(separator.clone())),
        };
        if distinct {
            Box::new(Distinct {
                inner: accumulator,
                seen: FxHashSet::default(),
            })
        } else {
            accumulator
        }
    }
}

#[derive(Debug)]
enum AggregateKind {
    CountSolutions { distinct: bool },
    Function {
        function: SetFunction,
        expression: CompiledExpression,
        distinct: bool,
    },
}

/// An aggregate expression that can be evaluated over the rows of a group.
#[derive(Debug)]
pub struct CompiledAggregate {
    kind: AggregateKind,
}

impl CompiledAggregate {
    /// Compiles `aggregate`. Custom aggregates are not supported.
    pub fn compile(
        aggregate: &AggregateExpression,
        registry: &FunctionRegistry,
    ) -> Result<Self, QueryEvaluationError> {
        let kind = match aggregate {
            AggregateExpression::CountSolutions { distinct } => AggregateKind::CountSolutions {
                distinct: *distinct,
            },
            AggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            } => AggregateKind::Function {
                function: SetFunction::try_from_function(name)?,
                expression: CompiledExpression::compile(expr, registry)?,
                distinct: *distinct,
            },
        };
        Ok(Self { kind })
    }

    /// Evaluates the aggregate over one group.
    ///
    /// An aggregate over a plain variable reads the variable's column. Other expressions are
    /// evaluated row by row.
    pub fn evaluate(&self, group: &GroupColumns) -> ThinResult<Option<Term>> {
        match &self.kind {
            AggregateKind::CountSolutions { distinct: false } => count_result(group.len()),
            AggregateKind::CountSolutions { distinct: true } => {
                let distinct_rows = (0..group.len())
                    .map(|index| group.values(index).collect::<Vec<_>>())
                    .collect::<FxHashSet<_>>();
                count_result(distinct_rows.len())
            }
            AggregateKind::Function {
                function,
                expression,
                distinct,
            } => {
                let mut accumulator = function.create_accumulator(*distinct);
                if let Some(variable) = expression.as_variable() {
                    let column = group.column(variable).unwrap_or_default();
                    for value in column {
                        accumulator.accumulate(value.clone());
                    }
                    // An unknown variable is unbound in every row.
                    for _ in column.len()..group.len() {
                        accumulator.accumulate(None);
                    }
                } else {
                    for index in 0..group.len() {
                        let row = group.row(index);
                        accumulator.accumulate(expression.evaluate_term(&row).ok());
                    }
                }
                accumulator.finish()
            }
        }
    }
}

fn count_result(count: usize) -> ThinResult<Option<Term>> {
    Ok(Some(count::count_literal(count)?))
}
