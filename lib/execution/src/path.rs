//! Evaluation of property paths.

use futures::future::BoxFuture;
use futures::FutureExt;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{
    term_to_pattern, Bindings, NamedNode, NamedNodePattern, PropertyPathExpression, Term,
    TermPattern, Triple, TriplePattern, Variable,
};
use rdf_pipeline_storage::{Graph, QueryContext};
use rustc_hash::FxHashSet;
use std::fmt::Debug;
use std::sync::Arc;

/// Evaluates a property path against a graph.
///
/// Implementations may use a native path index of the storage. The default implementation is
/// [TraversalPathEvaluator].
pub trait PropertyPathEvaluator: Debug + Send + Sync {
    /// Returns a binding for every pair of terms connected by `path`.
    ///
    /// `subject` and `object` are either terms or variables. The returned bindings bind exactly
    /// the variables of `subject` and `object`.
    fn evaluate(
        &self,
        graph: Arc<dyn Graph>,
        subject: &TermPattern,
        path: &PropertyPathExpression,
        object: &TermPattern,
        context: &QueryContext,
    ) -> PipelineStage<Bindings>;
}

/// Evaluates property paths by repeatedly calling [Graph::find].
///
/// Every path step is a pattern lookup. Closures (`*` and `+`) are computed by a breadth-first
/// traversal that visits each node once. Paths are evaluated with set semantics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraversalPathEvaluator;

impl PropertyPathEvaluator for TraversalPathEvaluator {
    fn evaluate(
        &self,
        graph: Arc<dyn Graph>,
        subject: &TermPattern,
        path: &PropertyPathExpression,
        object: &TermPattern,
        context: &QueryContext,
    ) -> PipelineStage<Bindings> {
        let engine = context.engine();
        let traversal = Traversal {
            graph,
            context: context.clone(),
        };
        let (subject, path, object) = (subject.clone(), path.clone(), object.clone());
        let solutions = engine.from_future(async move {
            traversal.solutions(&subject, &path, &object).await
        });
        engine.merge_map(solutions, move |solutions| engine.of(solutions))
    }
}

type PathResult<T> = Result<T, QueryEvaluationError>;

struct Traversal {
    graph: Arc<dyn Graph>,
    context: QueryContext,
}

impl Traversal {
    async fn solutions(
        &self,
        subject: &TermPattern,
        path: &PropertyPathExpression,
        object: &TermPattern,
    ) -> PathResult<Vec<Bindings>> {
        let solutions = match (slot(subject), slot(object)) {
            (Slot::Term(start), Slot::Term(end)) => {
                let reached = self.objects(start, path).await?;
                if reached.contains(&end) {
                    vec![Bindings::new()]
                } else {
                    Vec::new()
                }
            }
            (Slot::Term(start), Slot::Variable(end)) => self
                .objects(start, path)
                .await?
                .into_iter()
                .map(|term| Bindings::from_iter([(end.clone(), term)]))
                .collect(),
            (Slot::Variable(start), Slot::Term(end)) => self
                .subjects(end, path)
                .await?
                .into_iter()
                .map(|term| Bindings::from_iter([(start.clone(), term)]))
                .collect(),
            (Slot::Variable(start), Slot::Variable(end)) if start == end => self
                .pairs(path)
                .await?
                .into_iter()
                .filter(|(from, to)| from == to)
                .map(|(term, _)| Bindings::from_iter([(start.clone(), term)]))
                .collect(),
            (Slot::Variable(start), Slot::Variable(end)) => self
                .pairs(path)
                .await?
                .into_iter()
                .map(|(from, to)| Bindings::from_iter([(start.clone(), from), (end.clone(), to)]))
                .collect(),
        };
        Ok(solutions)
    }

    /// The terms reachable from `start` through `path`.
    fn objects<'a>(
        &'a self,
        start: Term,
        path: &'a PropertyPathExpression,
    ) -> BoxFuture<'a, PathResult<FxHashSet<Term>>> {
        async move {
            Ok(match path {
                PropertyPathExpression::NamedNode(predicate) => self
                    .find(Some(start), Some(predicate), None)
                    .await?
                    .into_iter()
                    .map(|triple| triple.object)
                    .collect(),
                PropertyPathExpression::Reverse(inner) => self.subjects(start, inner).await?,
                PropertyPathExpression::Sequence(first, second) => {
                    let mut result = FxHashSet::default();
                    for middle in self.objects(start, first).await? {
                        result.extend(self.objects(middle, second).await?);
                    }
                    result
                }
                PropertyPathExpression::Alternative(left, right) => {
                    let mut result = self.objects(start.clone(), left).await?;
                    result.extend(self.objects(start, right).await?);
                    result
                }
                PropertyPathExpression::ZeroOrMore(inner) => {
                    self.closure(start, inner, true, Direction::Forward).await?
                }
                PropertyPathExpression::OneOrMore(inner) => {
                    self.closure(start, inner, false, Direction::Forward).await?
                }
                PropertyPathExpression::ZeroOrOne(inner) => {
                    let mut result = self.objects(start.clone(), inner).await?;
                    result.insert(start);
                    result
                }
                PropertyPathExpression::NegatedPropertySet(excluded) => self
                    .find(Some(start), None, None)
                    .await?
                    .into_iter()
                    .filter(|triple| !excluded.contains(&triple.predicate))
                    .map(|triple| triple.object)
                    .collect(),
            })
        }
        .boxed()
    }

    /// The terms from which `end` is reachable through `path`.
    fn subjects<'a>(
        &'a self,
        end: Term,
        path: &'a PropertyPathExpression,
    ) -> BoxFuture<'a, PathResult<FxHashSet<Term>>> {
        async move {
            Ok(match path {
                PropertyPathExpression::NamedNode(predicate) => self
                    .find(None, Some(predicate), Some(end))
                    .await?
                    .into_iter()
                    .map(|triple| triple.subject.into())
                    .collect(),
                PropertyPathExpression::Reverse(inner) => self.objects(end, inner).await?,
                PropertyPathExpression::Sequence(first, second) => {
                    let mut result = FxHashSet::default();
                    for middle in self.subjects(end, second).await? {
                        result.extend(self.subjects(middle, first).await?);
                    }
                    result
                }
                PropertyPathExpression::Alternative(left, right) => {
                    let mut result = self.subjects(end.clone(), left).await?;
                    result.extend(self.subjects(end, right).await?);
                    result
                }
                PropertyPathExpression::ZeroOrMore(inner) => {
                    self.closure(end, inner, true, Direction::Backward).await?
                }
                PropertyPathExpression::OneOrMore(inner) => {
                    self.closure(end, inner, false, Direction::Backward).await?
                }
                PropertyPathExpression::ZeroOrOne(inner) => {
                    let mut result = self.subjects(end.clone(), inner).await?;
                    result.insert(end);
                    result
                }
                PropertyPathExpression::NegatedPropertySet(excluded) => self
                    .find(None, None, Some(end))
                    .await?
                    .into_iter()
                    .filter(|triple| !excluded.contains(&triple.predicate))
                    .map(|triple| triple.subject.into())
                    .collect(),
            })
        }
        .boxed()
    }

    /// All pairs of terms connected by `path`.
    fn pairs<'a>(
        &'a self,
        path: &'a PropertyPathExpression,
    ) -> BoxFuture<'a, PathResult<FxHashSet<(Term, Term)>>> {
        async move {
            Ok(match path {
                PropertyPathExpression::NamedNode(predicate) => self
                    .find(None, Some(predicate), None)
                    .await?
                    .into_iter()
                    .map(|triple| (triple.subject.into(), triple.object))
                    .collect(),
                PropertyPathExpression::Reverse(inner) => self
                    .pairs(inner)
                    .await?
                    .into_iter()
                    .map(|(from, to)| (to, from))
                    .collect(),
                PropertyPathExpression::Sequence(first, second) => {
                    let mut result = FxHashSet::default();
                    for (from, middle) in self.pairs(first).await? {
                        for to in self.objects(middle, second).await? {
                            result.insert((from.clone(), to));
                        }
                    }
                    result
                }
                PropertyPathExpression::Alternative(left, right) => {
                    let mut result = self.pairs(left).await?;
                    result.extend(self.pairs(right).await?);
                    result
                }
                PropertyPathExpression::ZeroOrMore(_) | PropertyPathExpression::ZeroOrOne(_) => {
                    let mut result = FxHashSet::default();
                    for start in self.nodes().await? {
                        for end in self.objects(start.clone(), path).await? {
                            result.insert((start.clone(), end));
                        }
                    }
                    result
                }
                PropertyPathExpression::OneOrMore(inner) => {
                    let starts = self
                        .pairs(inner)
                        .await?
                        .into_iter()
                        .map(|(from, _)| from)
                        .collect::<FxHashSet<_>>();
                    let mut result = FxHashSet::default();
                    for start in starts {
                        for end in self.objects(start.clone(), path).await? {
                            result.insert((start.clone(), end));
                        }
                    }
                    result
                }
                PropertyPathExpression::NegatedPropertySet(excluded) => self
                    .find(None, None, None)
                    .await?
                    .into_iter()
                    .filter(|triple| !excluded.contains(&triple.predicate))
                    .map(|triple| (triple.subject.into(), triple.object))
                    .collect(),
            })
        }
        .boxed()
    }

    /// Computes the transitive closure of `path` starting at `start`.
    async fn closure(
        &self,
        start: Term,
        path: &PropertyPathExpression,
        include_start: bool,
        direction: Direction,
    ) -> PathResult<FxHashSet<Term>> {
        let mut reached = FxHashSet::default();
        if include_start {
            reached.insert(start.clone());
        }
        let mut frontier = vec![start];
        while let Some(node) = frontier.pop() {
            let next = match direction {
                Direction::Forward => self.objects(node, path).await?,
                Direction::Backward => self.subjects(node, path).await?,
            };
            for term in next {
                if reached.insert(term.clone()) {
                    frontier.push(term);
                }
            }
        }
        Ok(reached)
    }

    /// All subjects and objects of the graph.
    async fn nodes(&self) -> PathResult<FxHashSet<Term>> {
        let mut nodes = FxHashSet::default();
        for triple in self.find(None, None, None).await? {
            nodes.insert(triple.subject.into());
            nodes.insert(triple.object);
        }
        Ok(nodes)
    }

    async fn find(
        &self,
        subject: Option<Term>,
        predicate: Option<&NamedNode>,
        object: Option<Term>,
    ) -> PathResult<Vec<Triple>> {
        let pattern = TriplePattern {
            subject: subject.map_or_else(|| variable("s"), term_to_pattern),
            predicate: predicate.map_or_else(
                || NamedNodePattern::Variable(Variable::new_unchecked("p")),
                |predicate| NamedNodePattern::NamedNode(predicate.clone()),
            ),
            object: object.map_or_else(|| variable("o"), term_to_pattern),
        };
        self.graph.find(&pattern, &self.context).collect_vec().await
    }
}

fn variable(name: &str) -> TermPattern {
    TermPattern::Variable(Variable::new_unchecked(name))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

enum Slot<'a> {
    Term(Term),
    Variable(&'a Variable),
}

fn slot(pattern: &TermPattern) -> Slot<'_> {
    match pattern {
        TermPattern::Variable(variable) => Slot::Variable(variable),
        TermPattern::NamedNode(node) => Slot::Term(node.clone().into()),
        TermPattern::BlankNode(node) => Slot::Term(node.clone().into()),
        TermPattern::Literal(literal) => Slot::Term(literal.clone().into()),
    }
}
