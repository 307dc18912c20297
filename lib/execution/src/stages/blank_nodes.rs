use rdf_pipeline_common::{Pipeline, PipelineStage};
use rdf_pipeline_model::{Bindings, TermPattern, TriplePattern, Variable};
use std::sync::Arc;

const BLANK_NODE_PREFIX: &str = "__bnode_";

/// Replaces the blank nodes of query patterns with synthetic variables.
///
/// Blank nodes in a query behave like variables that are not part of the solution. The
/// synthetic variables are removed again with [BlankNodeVariables::strip].
#[derive(Debug, Default)]
pub(super) struct BlankNodeVariables {
    variables: Vec<Variable>,
}

impl BlankNodeVariables {
    pub(super) fn replace_in_term(&mut self, pattern: &TermPattern) -> TermPattern {
        match pattern {
            TermPattern::BlankNode(node) => {
                let variable =
                    Variable::new_unchecked(format!("{BLANK_NODE_PREFIX}{}", node.as_str()));
                if !self.variables.contains(&variable) {
                    self.variables.push(variable.clone());
                }
                TermPattern::Variable(variable)
            }
            _ => pattern.clone(),
        }
    }

    pub(super) fn replace(&mut self, pattern: &TriplePattern) -> TriplePattern {
        TriplePattern {
            subject: self.replace_in_term(&pattern.subject),
            predicate: pattern.predicate.clone(),
            object: self.replace_in_term(&pattern.object),
        }
    }

    /// Removes the synthetic variables from the solutions of `stage`.
    pub(super) fn strip(
        self,
        stage: PipelineStage<Bindings>,
        engine: impl Pipeline,
    ) -> PipelineStage<Bindings> {
        if self.variables.is_empty() {
            return stage;
        }
        let variables = Arc::<[Variable]>::from(self.variables);
        engine.map(stage, move |bindings| {
            bindings.filter(|variable, _| !variables.contains(variable))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_model::{BlankNode, Literal, NamedNode};

    #[tokio::test]
    async fn blank_nodes_become_hidden_variables() {
        let mut variables = BlankNodeVariables::default();
        let pattern = TriplePattern {
            subject: BlankNode::new_unchecked("b").into(),
            predicate: NamedNode::new_unchecked("http://example.com/p").into(),
            object: BlankNode::new_unchecked("b").into(),
        };

        let replaced = variables.replace(&pattern);
        assert_eq!(replaced.subject, replaced.object);
        let TermPattern::Variable(variable) = replaced.subject else {
            unreachable!("the blank node was not replaced");
        };

        let engine = rdf_pipeline_common::PipelineEngine::default();
        let input = Bindings::from_iter([
            (variable, Literal::from(1_i64).into()),
            (Variable::new_unchecked("x"), Literal::from(2_i64).into()),
        ]);
        let output = variables
            .strip(engine.of(vec![input]), engine)
            .collect_vec()
            .await
            .unwrap();

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].len(), 1);
        assert!(output[0].has(&Variable::new_unchecked("x")));
    }
}
