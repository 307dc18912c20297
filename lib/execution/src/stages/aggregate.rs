use super::extend::build_extend;
use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_functions::aggregates::GroupColumns;
use rdf_pipeline_functions::CompiledAggregate;
use rdf_pipeline_model::{AggregateExpression, Bindings, Expression, Term, Variable};
use rustc_hash::FxHashMap;
use tracing::debug;

/// The binding property that holds the [GroupColumns] of a group.
pub const GROUP_COLUMNS_PROPERTY: &str = "rdf-pipeline:group-columns";

const GROUP_KEY_PREFIX: &str = "__group_key_";

/// A key of a `GROUP BY` clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupKey {
    Variable(Variable),
    /// An expression whose value is used as key. It is bound to a hidden variable before the
    /// grouping.
    Expression(Expression),
}

/// Builds the stages for a `GROUP BY` with its aggregates.
///
/// The input is fully materialized and grouped by the values of the keys. Each group becomes a
/// binding that holds the key bindings and the aggregated values. Without keys, there is exactly
/// one group, even if the input is empty.
pub fn build_group(
    source: PipelineStage<Bindings>,
    keys: &[GroupKey],
    aggregates: &[(Variable, AggregateExpression)],
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let engine = context.engine();
    let aggregates = aggregates
        .iter()
        .map(|(variable, aggregate)| {
            Ok((
                variable.clone(),
                CompiledAggregate::compile(aggregate, context.functions())?,
            ))
        })
        .collect::<Result<Vec<_>, QueryEvaluationError>>()?;
    debug!(
        keys = keys.len(),
        aggregates = aggregates.len(),
        "Building group stage"
    );

    let mut source = source;
    let mut key_variables = Vec::with_capacity(keys.len());
    let mut hidden = Vec::new();
    for (index, key) in keys.iter().enumerate() {
        match key {
            GroupKey::Variable(variable) => key_variables.push(variable.clone()),
            GroupKey::Expression(expression) => {
                let variable = Variable::new_unchecked(format!("{GROUP_KEY_PREFIX}{index}"));
                source = build_extend(source, &variable, expression, context)?;
                key_variables.push(variable.clone());
                hidden.push(variable);
            }
        }
    }

    let groups = engine.map(engine.collect(source), move |rows| {
        group_rows(&rows, &key_variables)
    });
    let groups = engine.merge_map(groups, move |groups| engine.of(groups));
    Ok(engine.try_map(groups, move |group| {
        evaluate_aggregates(group, &aggregates, &hidden)
    }))
}

/// Groups `rows` by their values of `keys`. Each group is appended column by column.
fn group_rows(rows: &[Bindings], keys: &[Variable]) -> Vec<Bindings> {
    let mut positions = FxHashMap::<Vec<Option<Term>>, usize>::default();
    let mut groups: Vec<(Vec<Option<Term>>, GroupColumns)> = Vec::new();
    for row in rows {
        let key = keys
            .iter()
            .map(|variable| row.get(variable).cloned())
            .collect::<Vec<_>>();
        let position = *positions.entry(key).or_insert_with_key(|key| {
            groups.push((key.clone(), GroupColumns::new()));
            groups.len() - 1
        });
        groups[position].1.push(row);
    }
    if groups.is_empty() && keys.is_empty() {
        groups.push((Vec::new(), GroupColumns::new()));
    }

    groups
        .into_iter()
        .map(|(key, columns)| {
            let mut group = keys
                .iter()
                .zip(key)
                .filter_map(|(variable, term)| Some((variable.clone(), term?)))
                .collect::<Bindings>();
            group.set_property(GROUP_COLUMNS_PROPERTY, columns);
            group
        })
        .collect()
}

fn evaluate_aggregates(
    mut group: Bindings,
    aggregates: &[(Variable, CompiledAggregate)],
    hidden: &[Variable],
) -> Result<Bindings, QueryEvaluationError> {
    let mut values = Vec::with_capacity(aggregates.len());
    {
        let empty = GroupColumns::new();
        let columns = group
            .property::<GroupColumns>(GROUP_COLUMNS_PROPERTY)
            .unwrap_or(&empty);
        for (variable, aggregate) in aggregates {
            let value = aggregate
                .evaluate(columns)
                .map_err(|_| QueryEvaluationError::Aggregate(variable.clone()))?;
            values.push((variable.clone(), value));
        }
    }
    for (variable, value) in values {
        if let Some(value) = value {
            group.set(variable, value);
        }
    }
    group.remove_property(GROUP_COLUMNS_PROPERTY);
    for variable in hidden {
        group.remove(variable);
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{engine_context, var};
    use rdf_pipeline_model::{AggregateFunction, Literal};

    fn row(values: &[(&str, i64)]) -> Bindings {
        values
            .iter()
            .map(|(name, value)| (var(name), Term::from(Literal::from(*value))))
            .collect()
    }

    fn count_star() -> (Variable, AggregateExpression) {
        (
            var("count"),
            AggregateExpression::CountSolutions { distinct: false },
        )
    }

    #[tokio::test]
    async fn count_without_keys_over_empty_input_is_zero() {
        let context = engine_context();
        let engine = context.engine();

        let result = build_group(engine.empty(), &[], &[count_star()], &context)
            .unwrap()
            .collect_vec()
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get(&var("count")), Some(&Literal::from(0_i64).into()));
    }

    #[tokio::test]
    async fn grouping_with_keys_over_empty_input_is_empty() {
        let context = engine_context();
        let engine = context.engine();

        let result = build_group(
            engine.empty(),
            &[GroupKey::Variable(var("k"))],
            &[count_star()],
            &context,
        )
        .unwrap()
        .collect_vec()
        .await
        .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn sum_per_group() {
        let context = engine_context();
        let engine = context.engine();
        let input = vec![
            row(&[("k", 1), ("v", 10)]),
            row(&[("k", 2), ("v", 5)]),
            row(&[("k", 1), ("v", 20)]),
        ];
        let sum = AggregateExpression::FunctionCall {
            name: AggregateFunction::Sum,
            expr: Expression::Variable(var("v")),
            distinct: false,
        };

        let result = build_group(
            engine.of(input),
            &[GroupKey::Variable(var("k"))],
            &[(var("sum"), sum)],
            &context,
        )
        .unwrap()
        .collect_vec()
        .await
        .unwrap();

        assert_eq!(
            result,
            vec![
                row(&[("k", 1), ("sum", 30)]),
                row(&[("k", 2), ("sum", 5)]),
            ]
        );
    }

    #[tokio::test]
    async fn expression_keys_are_hidden() {
        let context = engine_context();
        let engine = context.engine();
        let input = vec![row(&[("v", 1)]), row(&[("v", 1)]), row(&[("v", 2)])];

        let result = build_group(
            engine.of(input),
            &[GroupKey::Expression(Expression::Variable(var("v")))],
            &[count_star()],
            &context,
        )
        .unwrap()
        .collect_vec()
        .await
        .unwrap();

        assert_eq!(result, vec![row(&[("count", 2)]), row(&[("count", 1)])]);
    }

    #[tokio::test]
    async fn failing_aggregate_propagates() {
        let context = engine_context();
        let engine = context.engine();
        let input = vec![Bindings::from_iter([(
            var("v"),
            Term::from(Literal::from("not a number")),
        )])];
        let sum = AggregateExpression::FunctionCall {
            name: AggregateFunction::Sum,
            expr: Expression::Variable(var("v")),
            distinct: false,
        };

        let result = build_group(engine.of(input), &[], &[(var("sum"), sum)], &context)
            .unwrap()
            .collect_vec()
            .await;

        assert!(matches!(result, Err(QueryEvaluationError::Aggregate(_))));
    }

    #[test]
    fn groups_carry_their_columns() {
        let rows = vec![
            row(&[("k", 1), ("v", 10)]),
            row(&[("k", 2), ("v", 20)]),
            row(&[("k", 1), ("v", 30)]),
        ];

        let groups = group_rows(&rows, &[var("k")]);

        assert_eq!(groups.len(), 2);
        let columns = groups[0]
            .property::<GroupColumns>(GROUP_COLUMNS_PROPERTY)
            .unwrap();
        assert_eq!(
            columns.column(&var("v")),
            Some(
                &[
                    Some(Literal::from(10_i64).into()),
                    Some(Literal::from(30_i64).into())
                ][..]
            )
        );
        assert_eq!(groups[0].get(&var("k")), Some(&Literal::from(1_i64).into()));
    }
}
