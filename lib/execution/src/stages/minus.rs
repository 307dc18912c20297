use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{Bindings, GraphPattern};
use std::sync::Arc;

/// Builds the stage for `left MINUS { right }`.
///
/// `right` is evaluated on its own and buffered completely before the first left binding is
/// inspected. A left binding is removed if any buffered binding is compatible with it. Note that
/// bindings without common variables are compatible, so they remove each other.
pub fn build_minus(
    left: PipelineStage<Bindings>,
    right: &GraphPattern,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let engine = context.engine();
    let right = context.build_plan(right, engine.of(vec![Bindings::new()]))?;

    let mut left = Some(left);
    Ok(engine.merge_map(engine.collect(right), move |buffer| {
        let Some(left) = left.take() else {
            return engine.empty();
        };
        let buffer = Arc::new(buffer);
        engine.filter(left, move |bindings| {
            !buffer.iter().any(|other| bindings.is_compatible(other))
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{evaluate, iri, triple, var};
    use rdf_pipeline_model::TriplePattern;

    fn pattern(subject: &str, predicate: &str, object: &str) -> GraphPattern {
        GraphPattern::Bgp {
            patterns: vec![TriplePattern {
                subject: var(subject).into(),
                predicate: iri(predicate).into(),
                object: var(object).into(),
            }],
        }
    }

    fn data() -> Vec<rdf_pipeline_model::Triple> {
        vec![
            triple("alice", "knows", "bob"),
            triple("bob", "knows", "carol"),
            triple("bob", "blocked", "x"),
        ]
    }

    #[tokio::test]
    async fn removes_compatible_bindings() {
        let minus = GraphPattern::Minus {
            left: Box::new(pattern("person", "knows", "friend")),
            right: Box::new(pattern("person", "blocked", "reason")),
        };

        let solutions = evaluate(data(), &minus).await.unwrap();

        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].get(&var("person")), Some(&iri("alice").into()));
    }

    #[tokio::test]
    async fn bindings_without_common_variables_are_removed() {
        let minus = GraphPattern::Minus {
            left: Box::new(pattern("a", "knows", "b")),
            right: Box::new(pattern("c", "blocked", "d")),
        };

        let solutions = evaluate(data(), &minus).await.unwrap();

        assert!(solutions.is_empty());
    }

    #[tokio::test]
    async fn empty_right_side_keeps_everything() {
        let minus = GraphPattern::Minus {
            left: Box::new(pattern("a", "knows", "b")),
            right: Box::new(pattern("c", "missing", "d")),
        };

        let solutions = evaluate(data(), &minus).await.unwrap();

        assert_eq!(solutions.len(), 2);
    }
}
