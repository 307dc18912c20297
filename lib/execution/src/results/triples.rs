use crate::results::QuerySolutionStream;
use futures::{Stream, StreamExt};
use rdf_pipeline_common::QueryEvaluationError;
use rdf_pipeline_model::{
    BlankNode, NamedNodePattern, Subject, Term, TermPattern, Triple, TriplePattern,
};
use rustc_hash::{FxHashMap, FxHashSet};
use sparesults::QuerySolution;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// A stream over the triples that compose a graph solution.
///
/// Every solution instantiates the template once. Blank nodes of the template are replaced by
/// fresh blank nodes for each solution, and triples with unbound or ill-typed slots are skipped.
pub struct QueryTripleStream {
    template: Vec<TriplePattern>,
    inner: QuerySolutionStream,

    buffered_results: Vec<Triple>,
    already_emitted_results: FxHashSet<Triple>,
    bnodes: FxHashMap<BlankNode, BlankNode>,
}

impl QueryTripleStream {
    pub fn new(template: Vec<TriplePattern>, inner: QuerySolutionStream) -> Self {
        Self {
            template,
            inner,
            buffered_results: Vec::new(),
            already_emitted_results: FxHashSet::default(),
            bnodes: FxHashMap::default(),
        }
    }

    /// Consumes the stream and returns all triples.
    pub async fn collect_triples(mut self) -> Result<Vec<Triple>, QueryEvaluationError> {
        let mut triples = Vec::new();
        while let Some(triple) = self.next().await {
            triples.push(triple?);
        }
        Ok(triples)
    }

    fn poll_inner(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Triple, QueryEvaluationError>>> {
        loop {
            if let Some(triple) = self.buffered_results.pop() {
                return Poll::Ready(Some(Ok(triple)));
            }

            let solution = match ready!(self.inner.poll_next_unpin(cx)) {
                None => return Poll::Ready(None),
                Some(Ok(solution)) => solution,
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
            };
            self.instantiate(&solution);
        }
    }

    fn instantiate(&mut self, solution: &QuerySolution) {
        // Keeps the template order when popping from the buffer.
        for template in self.template.iter().rev() {
            let subject = template_value(&template.subject, solution, &mut self.bnodes)
                .and_then(|term| match term {
                    Term::NamedNode(node) => Some(Subject::from(node)),
                    Term::BlankNode(node) => Some(Subject::from(node)),
                    Term::Literal(_) => None,
                });
            let predicate = match &template.predicate {
                NamedNodePattern::NamedNode(node) => Some(node.clone()),
                NamedNodePattern::Variable(variable) => match solution.get(variable) {
                    Some(Term::NamedNode(node)) => Some(node.clone()),
                    _ => None,
                },
            };
            let object = template_value(&template.object, solution, &mut self.bnodes);

            if let (Some(subject), Some(predicate), Some(object)) = (subject, predicate, object) {
                let triple = Triple::new(subject, predicate, object);
                // Blank nodes are fresh for every solution, so such triples are always new.
                let new_triple = triple.subject.is_blank_node()
                    || triple.object.is_blank_node()
                    || self.already_emitted_results.insert(triple.clone());
                if new_triple {
                    self.buffered_results.push(triple);
                }
            }
        }
        self.bnodes.clear();
    }
}

fn template_value(
    selector: &TermPattern,
    solution: &QuerySolution,
    bnodes: &mut FxHashMap<BlankNode, BlankNode>,
) -> Option<Term> {
    match selector {
        TermPattern::NamedNode(node) => Some(node.clone().into()),
        TermPattern::BlankNode(bnode) => {
            Some(bnodes.entry(bnode.clone()).or_default().clone().into())
        }
        TermPattern::Literal(literal) => Some(literal.clone().into()),
        TermPattern::Variable(variable) => solution.get(variable).cloned(),
    }
}

impl Stream for QueryTripleStream {
    type Item = Result<Triple, QueryEvaluationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.poll_inner(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, max) = self.inner.size_hint();
        (
            self.buffered_results.len(),
            max.and_then(|max| max.checked_mul(self.template.len()))
                .map(|max| max + self.buffered_results.len()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_common::{Pipeline, PipelineEngine};
    use rdf_pipeline_model::{Bindings, Literal, NamedNode, Variable};
    use std::sync::Arc;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{name}"))
    }

    fn stream(template: Vec<TriplePattern>, values: Vec<Term>) -> QueryTripleStream {
        let variable = Variable::new_unchecked("x");
        let bindings = values
            .into_iter()
            .map(|value| Bindings::from_iter([(variable.clone(), value)]))
            .collect();
        let solutions = QuerySolutionStream::new(
            Arc::new([variable]),
            PipelineEngine::default().of(bindings),
        );
        QueryTripleStream::new(template, solutions)
    }

    #[tokio::test]
    async fn duplicates_are_removed() {
        let template = vec![TriplePattern {
            subject: ex("s").into(),
            predicate: ex("p").into(),
            object: Variable::new_unchecked("x").into(),
        }];

        let triples = stream(template, vec![ex("a").into(), ex("a").into(), ex("b").into()])
            .collect_triples()
            .await
            .unwrap();

        assert_eq!(triples.len(), 2);
    }

    #[tokio::test]
    async fn ill_typed_subjects_are_skipped() {
        let template = vec![TriplePattern {
            subject: Variable::new_unchecked("x").into(),
            predicate: ex("p").into(),
            object: ex("o").into(),
        }];

        let triples = stream(template, vec![Literal::from("literal").into(), ex("a").into()])
            .collect_triples()
            .await
            .unwrap();

        assert_eq!(triples, vec![Triple::new(ex("a"), ex("p"), ex("o"))]);
    }

    #[tokio::test]
    async fn blank_nodes_are_fresh_per_solution() {
        let template = vec![TriplePattern {
            subject: BlankNode::new_unchecked("b").into(),
            predicate: ex("p").into(),
            object: Variable::new_unchecked("x").into(),
        }];

        let triples = stream(template, vec![ex("a").into(), ex("c").into()])
            .collect_triples()
            .await
            .unwrap();

        assert_eq!(triples.len(), 2);
        assert_ne!(triples[0].subject, triples[1].subject);
    }
}
