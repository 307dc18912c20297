use super::filter::resolve_exists;
use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_functions::{CompiledExpression, EvaluatedValue, EXISTS_PROPERTY};
use rdf_pipeline_model::{Bindings, Expression, Term, Variable};

/// Builds the stage for `BIND(expression AS variable)`.
///
/// If the expression fails, the binding is passed on with `variable` unbound. If the expression
/// produces a sequence of terms (e.g., a generator function), one binding is produced per term.
///
/// An incoming binding may already bind `variable`, e.g., on the right side of a join. Such a
/// binding is only passed on if the value of the expression is the same term.
pub fn build_extend(
    source: PipelineStage<Bindings>,
    variable: &Variable,
    expression: &Expression,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let engine = context.engine();
    let expression = CompiledExpression::compile(expression, context.functions())?;
    let source = resolve_exists(source, &expression, context)?;
    let variable = variable.clone();
    Ok(engine.merge_map(source, move |mut bindings| {
        let value = expression.evaluate(&bindings);
        bindings.remove_property(EXISTS_PROPERTY);
        match value {
            Ok(EvaluatedValue::Term(term)) => {
                engine.from_iter(bind_compatible(&bindings, &variable, term))
            }
            Ok(EvaluatedValue::Sequence(terms)) => {
                let mut terms = terms.peekable();
                if terms.peek().is_none() {
                    return engine.of(vec![bindings]);
                }
                let variable = variable.clone();
                engine.from_iter(
                    terms.filter_map(move |term| bind_compatible(&bindings, &variable, term)),
                )
            }
            Err(_) => engine.of(vec![bindings]),
        }
    }))
}

fn bind_compatible(bindings: &Bindings, variable: &Variable, term: Term) -> Option<Bindings> {
    match bindings.get(variable) {
        Some(bound) if *bound != term => None,
        Some(_) => Some(bindings.clone()),
        None => Some(bindings.extended(variable.clone(), term)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{engine_context_with_functions, var};
    use rdf_pipeline_functions::FunctionRegistry;
    use rdf_pipeline_model::{Function, Literal, NamedNode};

    fn range() -> NamedNode {
        NamedNode::new_unchecked("http://example.com/range")
    }

    fn context() -> ExecutionContext {
        let mut functions = FunctionRegistry::new();
        functions.register_fn(range(), |args| {
            let Some(Term::Literal(end)) = args.first() else {
                return rdf_pipeline_model::ThinError::expected();
            };
            let end = end.value().parse::<i64>()?;
            Ok(EvaluatedValue::Sequence(Box::new(
                (0..end).map(|i| Literal::from(i).into()),
            )))
        });
        engine_context_with_functions(functions)
    }

    fn call_range(end: i64) -> Expression {
        Expression::FunctionCall(
            Function::Custom(range()),
            vec![Expression::Literal(Literal::from(end))],
        )
    }

    async fn extend(expression: &Expression) -> Vec<Bindings> {
        let context = context();
        let engine = context.engine();
        build_extend(
            engine.of(vec![Bindings::new()]),
            &var("x"),
            expression,
            &context,
        )
        .unwrap()
        .collect_vec()
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn failure_leaves_variable_unbound() {
        let expression = Expression::Variable(var("unbound"));

        assert_eq!(extend(&expression).await, vec![Bindings::new()]);
    }

    #[tokio::test]
    async fn generator_fans_out() {
        let solutions = extend(&call_range(3)).await;

        assert_eq!(solutions.len(), 3);
        assert_eq!(
            solutions[2].get(&var("x")),
            Some(&Literal::from(2_i64).into())
        );
    }

    #[tokio::test]
    async fn empty_generator_leaves_variable_unbound() {
        assert_eq!(extend(&call_range(0)).await, vec![Bindings::new()]);
    }

    async fn extend_bound(value: i64, expression: &Expression) -> Vec<Bindings> {
        let context = context();
        let engine = context.engine();
        let incoming = Bindings::from_iter([(var("x"), Term::from(Literal::from(value)))]);
        build_extend(engine.of(vec![incoming]), &var("x"), expression, &context)
            .unwrap()
            .collect_vec()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn conflicting_value_drops_binding() {
        let expression = Expression::Literal(Literal::from(2_i64));

        assert!(extend_bound(1, &expression).await.is_empty());
    }

    #[tokio::test]
    async fn agreeing_value_keeps_binding() {
        let expression = Expression::Literal(Literal::from(1_i64));
        let solutions = extend_bound(1, &expression).await;

        assert_eq!(
            solutions,
            vec![Bindings::from_iter([(var("x"), Term::from(Literal::from(1_i64)))])]
        );
    }

    #[tokio::test]
    async fn generator_keeps_only_agreeing_terms() {
        let solutions = extend_bound(1, &call_range(3)).await;

        assert_eq!(solutions.len(), 1);
        assert!(extend_bound(5, &call_range(3)).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_function_is_rejected() {
        let context = context();
        let engine = context.engine();
        let expression = Expression::FunctionCall(
            Function::Custom(NamedNode::new_unchecked("http://example.com/missing")),
            Vec::new(),
        );

        let result = build_extend(engine.empty(), &var("x"), &expression, &context);

        assert!(matches!(result, Err(QueryEvaluationError::UnknownFunction(_))));
    }
}
