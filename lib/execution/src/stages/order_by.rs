use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_functions::{order_terms, CompiledExpression};
use rdf_pipeline_model::{Bindings, OrderExpression, Term};
use std::cmp::Ordering;

/// Builds the stage for `ORDER BY`.
///
/// The input is materialized and sorted with a stable sort. Each comparator only decides if all
/// previous comparators consider two bindings equal. Expressions that fail to evaluate compare
/// like unbound values.
pub fn build_order_by(
    source: PipelineStage<Bindings>,
    expressions: &[OrderExpression],
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let comparators = expressions
        .iter()
        .map(|expression| {
            let (expression, descending) = match expression {
                OrderExpression::Asc(expression) => (expression, false),
                OrderExpression::Desc(expression) => (expression, true),
            };
            Ok((
                CompiledExpression::compile(expression, context.functions())?,
                descending,
            ))
        })
        .collect::<Result<Vec<_>, QueryEvaluationError>>()?;

    let engine = context.engine();
    let sorted = engine.map(engine.collect(source), move |rows| {
        let mut keyed = rows
            .into_iter()
            .map(|row| {
                let keys = comparators
                    .iter()
                    .map(|(expression, _)| expression.evaluate_term(&row).ok())
                    .collect::<Vec<_>>();
                (keys, row)
            })
            .collect::<Vec<_>>();
        keyed.sort_by(|(lhs, _), (rhs, _)| compare_keys(lhs, rhs, &comparators));
        keyed.into_iter().map(|(_, row)| row).collect::<Vec<_>>()
    });
    Ok(engine.merge_map(sorted, move |rows| engine.of(rows)))
}

fn compare_keys(
    lhs: &[Option<Term>],
    rhs: &[Option<Term>],
    comparators: &[(CompiledExpression, bool)],
) -> Ordering {
    lhs.iter()
        .zip(rhs)
        .zip(comparators)
        .map(|((lhs, rhs), (_, descending))| {
            let ordering = order_terms(lhs.as_ref(), rhs.as_ref());
            if *descending {
                ordering.reverse()
            } else {
                ordering
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{engine_context, var};
    use rdf_pipeline_model::rdf_vocab::xsd;
    use rdf_pipeline_model::{Expression, Literal};

    fn row(a: i64, b: &str) -> Bindings {
        Bindings::from_iter([
            (var("a"), Term::from(Literal::from(a))),
            (var("b"), Term::from(Literal::from(b))),
        ])
    }

    async fn sort(input: Vec<Bindings>, expressions: &[OrderExpression]) -> Vec<Bindings> {
        let context = engine_context();
        let engine = context.engine();
        build_order_by(engine.of(input), expressions, &context)
            .unwrap()
            .collect_vec()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn comparators_cascade() {
        let input = vec![row(2, "x"), row(1, "y"), row(2, "a"), row(1, "z")];
        let expressions = [
            OrderExpression::Desc(Expression::Variable(var("a"))),
            OrderExpression::Asc(Expression::Variable(var("b"))),
        ];

        let sorted = sort(input, &expressions).await;

        assert_eq!(
            sorted,
            vec![row(2, "a"), row(2, "x"), row(1, "y"), row(1, "z")]
        );
    }

    #[tokio::test]
    async fn unbound_values_come_first() {
        let unbound = Bindings::from_iter([(var("b"), Term::from(Literal::from("u")))]);
        let input = vec![row(1, "x"), unbound.clone()];
        let expressions = [OrderExpression::Asc(Expression::Variable(var("a")))];

        let sorted = sort(input, &expressions).await;

        assert_eq!(sorted[0], unbound);
    }

    #[tokio::test]
    async fn sorting_twice_yields_the_same_sequence() {
        let input = vec![row(3, "c"), row(1, "b"), row(3, "a"), row(2, "d")];
        let expressions = [OrderExpression::Asc(Expression::Variable(var("a")))];

        let once = sort(input, &expressions).await;
        let twice = sort(once.clone(), &expressions).await;

        assert_eq!(once, twice);
        assert_eq!(
            once,
            vec![row(1, "b"), row(2, "d"), row(3, "c"), row(3, "a")]
        );
    }

    #[tokio::test]
    async fn mixed_datatypes_sort_independently_of_input_order() {
        let value = |literal: Literal| Bindings::from_iter([(var("a"), Term::from(literal))]);
        let expected = vec![
            value(Literal::from(1_i64)),
            value(Literal::new_typed_literal("5", xsd::DECIMAL)),
            value(Literal::from("text")),
            value(Literal::new_typed_literal("2020", xsd::G_YEAR)),
        ];
        let expressions = [OrderExpression::Asc(Expression::Variable(var("a")))];

        let mut reversed = expected.clone();
        reversed.reverse();
        let mut rotated = expected.clone();
        rotated.rotate_left(1);

        assert_eq!(sort(reversed, &expressions).await, expected);
        assert_eq!(sort(rotated, &expressions).await, expected);
    }
}
