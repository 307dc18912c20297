use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, QueryEvaluationError};
use rdf_pipeline_model::algebra_term::{GraphName, GroundSubject, Quad};
use rdf_pipeline_model::{
    Bindings, BlankNode, GraphNamePattern, GraphPattern, GraphTarget, GraphUpdateOperation,
    GroundQuad, GroundQuadPattern, GroundTerm, GroundTermPattern, NamedNode, NamedNodePattern,
    QuadPattern, QueryDataset, Subject, Term, TermPattern, Triple, TriplePattern, Variable,
};
use rdf_pipeline_storage::{Dataset, Graph};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// An operation of a SPARQL update request.
///
/// `ADD`, `COPY` and `MOVE` are kept as separate operations so that they can be issued without
/// spelling out the equivalent graph operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOperation {
    Graph(GraphUpdateOperation),
    /// Inserts all triples of `from` into `to`.
    Add {
        silent: bool,
        from: GraphName,
        to: GraphName,
    },
    /// Replaces the content of `to` with the content of `from`.
    Copy {
        silent: bool,
        from: GraphName,
        to: GraphName,
    },
    /// Like [UpdateOperation::Copy] but clears `from` afterward.
    Move {
        silent: bool,
        from: GraphName,
        to: GraphName,
    },
}

impl From<GraphUpdateOperation> for UpdateOperation {
    fn from(operation: GraphUpdateOperation) -> Self {
        Self::Graph(operation)
    }
}

/// Executes the operations one after another.
///
/// The first failing operation aborts the request. The changes of the operations before it are
/// kept.
pub async fn execute_update(
    operations: &[UpdateOperation],
    context: &ExecutionContext,
) -> Result<(), QueryEvaluationError> {
    for operation in operations {
        match operation {
            UpdateOperation::Graph(operation) => execute_graph_operation(operation, context).await?,
            UpdateOperation::Add { silent, from, to } => {
                debug!(%from, %to, "Adding graph");
                add(from, to, *silent, context).await?;
            }
            UpdateOperation::Copy { silent, from, to } => {
                debug!(%from, %to, "Copying graph");
                copy(from, to, *silent, context).await?;
            }
            UpdateOperation::Move { silent, from, to } => {
                debug!(%from, %to, "Moving graph");
                if from != to && copy(from, to, *silent, context).await? {
                    clear(&graph_target(from), true, context).await?;
                }
            }
        }
    }
    Ok(())
}

async fn execute_graph_operation(
    operation: &GraphUpdateOperation,
    context: &ExecutionContext,
) -> Result<(), QueryEvaluationError> {
    match operation {
        GraphUpdateOperation::InsertData { data } => {
            debug!(quads = data.len(), "Inserting data");
            insert_data(data, context).await
        }
        GraphUpdateOperation::DeleteData { data } => {
            debug!(quads = data.len(), "Deleting data");
            delete_data(data, context).await
        }
        GraphUpdateOperation::DeleteInsert {
            delete,
            insert,
            using,
            pattern,
        } => delete_insert(delete, insert, using.as_ref(), pattern, context).await,
        GraphUpdateOperation::Load {
            silent,
            source,
            destination,
        } => {
            if *silent {
                debug!(%source, %destination, "Skipping silent LOAD");
                Ok(())
            } else {
                Err(QueryEvaluationError::UnsupportedUpdate(format!(
                    "LOAD <{}>",
                    source.as_str()
                )))
            }
        }
        GraphUpdateOperation::Clear { silent, graph } => {
            debug!(%graph, "Clearing graph");
            clear(graph, *silent, context).await
        }
        GraphUpdateOperation::Create { silent, graph } => {
            debug!(%graph, "Creating graph");
            match context.dataset().create_graph(graph.clone()) {
                Ok(_) => Ok(()),
                Err(QueryEvaluationError::GraphAlreadyExists(_)) if *silent => Ok(()),
                Err(error) => Err(error),
            }
        }
        GraphUpdateOperation::Drop { silent, graph } => {
            debug!(%graph, "Dropping graph");
            drop_graph(graph, *silent, context).await
        }
    }
}

async fn insert_data(data: &[Quad], context: &ExecutionContext) -> Result<(), QueryEvaluationError> {
    let mut blank_nodes = BlankNodeScope::default();
    for quad in data {
        let subject = match &quad.subject {
            Subject::BlankNode(node) => blank_nodes.fresh(node).into(),
            subject => subject.clone(),
        };
        let object = match &quad.object {
            Term::BlankNode(node) => blank_nodes.fresh(node).into(),
            object => object.clone(),
        };
        let triple = Triple::new(subject, quad.predicate.clone(), object);
        writable_graph(&quad.graph_name, context)?
            .insert(triple)
            .await?;
    }
    Ok(())
}

async fn delete_data(
    data: &[GroundQuad],
    context: &ExecutionContext,
) -> Result<(), QueryEvaluationError> {
    for quad in data {
        let Some(graph) = existing_graph(&quad.graph_name, context) else {
            continue;
        };
        let subject = match &quad.subject {
            GroundSubject::NamedNode(node) => node.clone(),
        };
        let triple = Triple::new(subject, quad.predicate.clone(), ground_term(&quad.object));
        graph.delete(&triple).await?;
    }
    Ok(())
}

async fn delete_insert(
    delete: &[GroundQuadPattern],
    insert: &[QuadPattern],
    using: Option<&QueryDataset>,
    pattern: &GraphPattern,
    context: &ExecutionContext,
) -> Result<(), QueryEvaluationError> {
    let engine = context.engine();
    let solutions = context
        .with_query_dataset(using)
        .build_plan(pattern, engine.of(vec![Bindings::new()]))?
        .collect_vec()
        .await?;
    debug!(
        solutions = solutions.len(),
        delete = delete.len(),
        insert = insert.len(),
        "Evaluated the WHERE clause of an update"
    );

    let mut deletions = Vec::new();
    let mut insertions = Vec::new();
    for solution in &solutions {
        deletions.extend(
            delete
                .iter()
                .filter_map(|template| instantiate_ground(template, solution)),
        );
        let mut blank_nodes = BlankNodeScope::default();
        insertions.extend(
            insert
                .iter()
                .filter_map(|template| instantiate(template, solution, &mut blank_nodes)),
        );
    }

    for (graph_name, triple) in deletions {
        if let Some(graph) = existing_graph(&graph_name, context) {
            graph.delete(&triple).await?;
        }
    }
    for (graph_name, triple) in insertions {
        writable_graph(&graph_name, context)?.insert(triple).await?;
    }
    Ok(())
}

async fn clear(
    target: &GraphTarget,
    silent: bool,
    context: &ExecutionContext,
) -> Result<(), QueryEvaluationError> {
    let dataset = context.dataset();
    let graph = match target {
        GraphTarget::NamedNode(iri) => match dataset.named_graph(iri) {
            Some(graph) => graph,
            None if silent => return Ok(()),
            None => return Err(QueryEvaluationError::GraphDoesNotExist(iri.clone())),
        },
        GraphTarget::DefaultGraph => dataset.default_graph(),
        GraphTarget::NamedGraphs => dataset.all_graphs(false),
        GraphTarget::AllGraphs => dataset.all_graphs(true),
    };
    graph.clear().await?;
    Ok(())
}

async fn drop_graph(
    target: &GraphTarget,
    silent: bool,
    context: &ExecutionContext,
) -> Result<(), QueryEvaluationError> {
    let dataset = context.dataset();
    match target {
        GraphTarget::NamedNode(iri) => match dataset.remove_named_graph(iri) {
            Some(_) => Ok(()),
            None if silent => Ok(()),
            None => Err(QueryEvaluationError::GraphDoesNotExist(iri.clone())),
        },
        GraphTarget::DefaultGraph => clear(target, silent, context).await,
        GraphTarget::NamedGraphs | GraphTarget::AllGraphs => {
            if matches!(target, GraphTarget::AllGraphs) {
                dataset.default_graph().clear().await?;
            }
            for iri in dataset.named_graph_iris() {
                dataset.remove_named_graph(&iri);
            }
            Ok(())
        }
    }
}

/// Inserts every triple of `from` into `to` with a single `INSERT { .. } WHERE { .. }`.
///
/// Returns false if a silent operation has been skipped because `from` does not exist.
async fn add(
    from: &GraphName,
    to: &GraphName,
    silent: bool,
    context: &ExecutionContext,
) -> Result<bool, QueryEvaluationError> {
    if let GraphName::NamedNode(iri) = from {
        if !context.dataset().has_named_graph(iri) {
            return if silent {
                Ok(false)
            } else {
                Err(QueryEvaluationError::GraphDoesNotExist(iri.clone()))
            };
        }
    }
    if from == to {
        return Ok(true);
    }

    let [subject, predicate, object] = ["s", "p", "o"].map(Variable::new_unchecked);
    let all_triples = GraphPattern::Bgp {
        patterns: vec![TriplePattern {
            subject: subject.clone().into(),
            predicate: predicate.clone().into(),
            object: object.clone().into(),
        }],
    };
    let pattern = match from {
        GraphName::NamedNode(iri) => GraphPattern::Graph {
            name: iri.clone().into(),
            inner: Box::new(all_triples),
        },
        GraphName::DefaultGraph => all_triples,
    };
    let insert = QuadPattern {
        subject: subject.into(),
        predicate: predicate.into(),
        object: object.into(),
        graph_name: match to {
            GraphName::NamedNode(iri) => iri.clone().into(),
            GraphName::DefaultGraph => GraphNamePattern::DefaultGraph,
        },
    };
    delete_insert(&[], &[insert], None, &pattern, context).await?;
    Ok(true)
}

/// Returns false if a silent operation has been skipped because `from` does not exist.
async fn copy(
    from: &GraphName,
    to: &GraphName,
    silent: bool,
    context: &ExecutionContext,
) -> Result<bool, QueryEvaluationError> {
    if from == to {
        return Ok(true);
    }
    if let GraphName::NamedNode(iri) = from {
        if !context.dataset().has_named_graph(iri) {
            return if silent {
                Ok(false)
            } else {
                Err(QueryEvaluationError::GraphDoesNotExist(iri.clone()))
            };
        }
    }
    clear(&graph_target(to), true, context).await?;
    add(from, to, silent, context).await
}

fn graph_target(graph_name: &GraphName) -> GraphTarget {
    match graph_name {
        GraphName::NamedNode(iri) => GraphTarget::NamedNode(iri.clone()),
        GraphName::DefaultGraph => GraphTarget::DefaultGraph,
    }
}

/// The graph that receives inserted triples. Unknown named graphs are created.
fn writable_graph(
    graph_name: &GraphName,
    context: &ExecutionContext,
) -> Result<Arc<dyn Graph>, QueryEvaluationError> {
    let dataset = context.dataset();
    match graph_name {
        GraphName::DefaultGraph => Ok(dataset.default_graph()),
        GraphName::NamedNode(iri) => match dataset.named_graph(iri) {
            Some(graph) => Ok(graph),
            None => match dataset.create_graph(iri.clone()) {
                Ok(graph) => Ok(graph),
                // Created concurrently.
                Err(QueryEvaluationError::GraphAlreadyExists(iri)) => dataset
                    .named_graph(&iri)
                    .ok_or(QueryEvaluationError::GraphDoesNotExist(iri)),
                Err(error) => Err(error),
            },
        },
    }
}

fn existing_graph(graph_name: &GraphName, context: &ExecutionContext) -> Option<Arc<dyn Graph>> {
    match graph_name {
        GraphName::DefaultGraph => Some(context.dataset().default_graph()),
        GraphName::NamedNode(iri) => context.dataset().named_graph(iri),
    }
}

/// Maps the blank nodes of a template to fresh blank nodes.
#[derive(Default)]
struct BlankNodeScope(FxHashMap<String, BlankNode>);

impl BlankNodeScope {
    fn fresh(&mut self, node: &BlankNode) -> BlankNode {
        self.0
            .entry(node.as_str().to_owned())
            .or_default()
            .clone()
    }
}

fn instantiate(
    template: &QuadPattern,
    solution: &Bindings,
    blank_nodes: &mut BlankNodeScope,
) -> Option<(GraphName, Triple)> {
    let subject = match instantiate_term(&template.subject, solution, blank_nodes)? {
        Term::NamedNode(node) => Subject::from(node),
        Term::BlankNode(node) => Subject::from(node),
        Term::Literal(_) => return None,
    };
    let predicate = instantiate_predicate(&template.predicate, solution)?;
    let object = instantiate_term(&template.object, solution, blank_nodes)?;
    let graph_name = instantiate_graph_name(&template.graph_name, solution)?;
    Some((graph_name, Triple::new(subject, predicate, object)))
}

fn instantiate_ground(
    template: &GroundQuadPattern,
    solution: &Bindings,
) -> Option<(GraphName, Triple)> {
    let subject = match instantiate_ground_term(&template.subject, solution)? {
        Term::NamedNode(node) => Subject::from(node),
        Term::BlankNode(node) => Subject::from(node),
        Term::Literal(_) => return None,
    };
    let predicate = instantiate_predicate(&template.predicate, solution)?;
    let object = instantiate_ground_term(&template.object, solution)?;
    let graph_name = instantiate_graph_name(&template.graph_name, solution)?;
    Some((graph_name, Triple::new(subject, predicate, object)))
}

fn instantiate_term(
    pattern: &TermPattern,
    solution: &Bindings,
    blank_nodes: &mut BlankNodeScope,
) -> Option<Term> {
    match pattern {
        TermPattern::NamedNode(node) => Some(node.clone().into()),
        TermPattern::BlankNode(node) => Some(blank_nodes.fresh(node).into()),
        TermPattern::Literal(literal) => Some(literal.clone().into()),
        TermPattern::Variable(variable) => solution.get(variable).cloned(),
    }
}

fn instantiate_ground_term(pattern: &GroundTermPattern, solution: &Bindings) -> Option<Term> {
    match pattern {
        GroundTermPattern::NamedNode(node) => Some(node.clone().into()),
        GroundTermPattern::Literal(literal) => Some(literal.clone().into()),
        GroundTermPattern::Variable(variable) => solution.get(variable).cloned(),
    }
}

fn instantiate_predicate(pattern: &NamedNodePattern, solution: &Bindings) -> Option<NamedNode> {
    match pattern {
        NamedNodePattern::NamedNode(node) => Some(node.clone()),
        NamedNodePattern::Variable(variable) => match solution.get(variable)? {
            Term::NamedNode(node) => Some(node.clone()),
            _ => None,
        },
    }
}

fn instantiate_graph_name(pattern: &GraphNamePattern, solution: &Bindings) -> Option<GraphName> {
    match pattern {
        GraphNamePattern::NamedNode(node) => Some(GraphName::NamedNode(node.clone())),
        GraphNamePattern::DefaultGraph => Some(GraphName::DefaultGraph),
        GraphNamePattern::Variable(variable) => match solution.get(variable)? {
            Term::NamedNode(node) => Some(GraphName::NamedNode(node.clone())),
            _ => None,
        },
    }
}

fn ground_term(term: &GroundTerm) -> Term {
    match term {
        GroundTerm::NamedNode(node) => node.clone().into(),
        GroundTerm::Literal(literal) => literal.clone().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{engine_context, iri, triple, var};
    use rdf_pipeline_model::Literal;

    fn quad(subject: &str, predicate: &str, object: &str, graph: GraphName) -> Quad {
        Quad {
            subject: iri(subject).into(),
            predicate: iri(predicate),
            object: iri(object).into(),
            graph_name: graph,
        }
    }

    async fn run(operations: Vec<UpdateOperation>, context: &ExecutionContext) {
        execute_update(&operations, context).await.unwrap();
    }

    async fn triples(graph: Arc<dyn Graph>, context: &ExecutionContext) -> Vec<Triple> {
        let pattern = TriplePattern {
            subject: var("s").into(),
            predicate: var("p").into(),
            object: var("o").into(),
        };
        graph
            .find(&pattern, context.query_context())
            .collect_vec()
            .await
            .unwrap()
    }

    fn insert_data(quads: Vec<Quad>) -> UpdateOperation {
        GraphUpdateOperation::InsertData { data: quads }.into()
    }

    #[tokio::test]
    async fn insert_data_creates_unknown_graphs() {
        let context = engine_context();

        run(
            vec![insert_data(vec![
                quad("a", "p", "b", GraphName::DefaultGraph),
                quad("a", "p", "c", GraphName::NamedNode(iri("g"))),
            ])],
            &context,
        )
        .await;

        let dataset = context.dataset();
        assert_eq!(triples(dataset.default_graph(), &context).await.len(), 1);
        let named = dataset.named_graph(&iri("g")).unwrap();
        assert_eq!(triples(named, &context).await, vec![triple("a", "p", "c")]);
    }

    #[tokio::test]
    async fn delete_insert_evaluates_the_where_clause_once() {
        let context = engine_context();
        let s = var("s");
        run(
            vec![
                insert_data(vec![
                    quad("a", "status", "old", GraphName::DefaultGraph),
                    quad("b", "status", "old", GraphName::DefaultGraph),
                ]),
                GraphUpdateOperation::DeleteInsert {
                    delete: vec![GroundQuadPattern {
                        subject: s.clone().into(),
                        predicate: iri("status").into(),
                        object: iri("old").into(),
                        graph_name: GraphNamePattern::DefaultGraph,
                    }],
                    insert: vec![QuadPattern {
                        subject: s.clone().into(),
                        predicate: iri("status").into(),
                        object: iri("new").into(),
                        graph_name: GraphNamePattern::DefaultGraph,
                    }],
                    using: None,
                    pattern: Box::new(GraphPattern::Bgp {
                        patterns: vec![TriplePattern {
                            subject: s.into(),
                            predicate: iri("status").into(),
                            object: iri("old").into(),
                        }],
                    }),
                }
                .into(),
            ],
            &context,
        )
        .await;

        let mut result = triples(context.dataset().default_graph(), &context).await;
        result.sort_by_key(ToString::to_string);
        assert_eq!(
            result,
            vec![triple("a", "status", "new"), triple("b", "status", "new")]
        );
    }

    #[tokio::test]
    async fn unbound_template_slots_skip_the_triple() {
        let context = engine_context();
        run(
            vec![GraphUpdateOperation::DeleteInsert {
                delete: Vec::new(),
                insert: vec![QuadPattern {
                    subject: iri("a").into(),
                    predicate: iri("p").into(),
                    object: var("unbound").into(),
                    graph_name: GraphNamePattern::DefaultGraph,
                }],
                using: None,
                pattern: Box::new(GraphPattern::Bgp {
                    patterns: Vec::new(),
                }),
            }
            .into()],
            &context,
        )
        .await;

        assert!(triples(context.dataset().default_graph(), &context)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn template_blank_nodes_are_fresh_per_solution() {
        let context = engine_context();
        run(
            vec![GraphUpdateOperation::DeleteInsert {
                delete: Vec::new(),
                insert: vec![QuadPattern {
                    subject: BlankNode::new_unchecked("x").into(),
                    predicate: iri("value").into(),
                    object: var("v").into(),
                    graph_name: GraphNamePattern::DefaultGraph,
                }],
                using: None,
                pattern: Box::new(GraphPattern::Values {
                    variables: vec![var("v")],
                    bindings: vec![
                        vec![Some(Literal::from(1_i64).into())],
                        vec![Some(Literal::from(2_i64).into())],
                    ],
                }),
            }
            .into()],
            &context,
        )
        .await;

        let result = triples(context.dataset().default_graph(), &context).await;
        assert_eq!(result.len(), 2);
        assert_ne!(result[0].subject, result[1].subject);
    }

    #[tokio::test]
    async fn create_existing_graph_fails_unless_silent() {
        let context = engine_context();
        let create = |silent| -> UpdateOperation {
            GraphUpdateOperation::Create {
                silent,
                graph: iri("g"),
            }
            .into()
        };
        run(vec![create(false)], &context).await;

        let loud = execute_update(&[create(false)], &context).await;
        let silent = execute_update(&[create(true)], &context).await;

        assert!(matches!(loud, Err(QueryEvaluationError::GraphAlreadyExists(_))));
        assert!(silent.is_ok());
    }

    #[tokio::test]
    async fn load_is_unsupported_unless_silent() {
        let context = engine_context();
        let load = |silent| -> UpdateOperation {
            GraphUpdateOperation::Load {
                silent,
                source: iri("remote"),
                destination: GraphName::DefaultGraph,
            }
            .into()
        };

        let loud = execute_update(&[load(false)], &context).await;
        let silent = execute_update(&[load(true)], &context).await;

        assert!(matches!(loud, Err(QueryEvaluationError::UnsupportedUpdate(_))));
        assert!(silent.is_ok());
    }

    #[tokio::test]
    async fn clear_and_drop_named_graphs() {
        let context = engine_context();
        let g1 = GraphName::NamedNode(iri("g1"));
        let g2 = GraphName::NamedNode(iri("g2"));
        run(
            vec![insert_data(vec![
                quad("a", "p", "b", GraphName::DefaultGraph),
                quad("a", "p", "c", g1),
                quad("a", "p", "d", g2),
            ])],
            &context,
        )
        .await;
        let dataset = context.dataset();

        run(
            vec![GraphUpdateOperation::Clear {
                silent: false,
                graph: GraphTarget::NamedGraphs,
            }
            .into()],
            &context,
        )
        .await;
        assert_eq!(dataset.named_graph_iris().len(), 2);
        assert!(triples(dataset.all_graphs(false), &context).await.is_empty());
        assert_eq!(triples(dataset.default_graph(), &context).await.len(), 1);

        run(
            vec![GraphUpdateOperation::Drop {
                silent: false,
                graph: GraphTarget::AllGraphs,
            }
            .into()],
            &context,
        )
        .await;
        assert!(dataset.named_graph_iris().is_empty());
        assert!(triples(dataset.default_graph(), &context).await.is_empty());
    }

    #[tokio::test]
    async fn add_copy_and_move() {
        let context = engine_context();
        let g1 = GraphName::NamedNode(iri("g1"));
        let g2 = GraphName::NamedNode(iri("g2"));
        run(
            vec![insert_data(vec![
                quad("a", "p", "b", GraphName::DefaultGraph),
                quad("a", "p", "c", g1.clone()),
                quad("a", "p", "d", g2.clone()),
            ])],
            &context,
        )
        .await;
        let dataset = context.dataset();

        run(
            vec![UpdateOperation::Add {
                silent: false,
                from: GraphName::DefaultGraph,
                to: g1.clone(),
            }],
            &context,
        )
        .await;
        let g1_graph = dataset.named_graph(&iri("g1")).unwrap();
        assert_eq!(triples(Arc::clone(&g1_graph), &context).await.len(), 2);

        run(
            vec![UpdateOperation::Copy {
                silent: false,
                from: g2.clone(),
                to: g1.clone(),
            }],
            &context,
        )
        .await;
        assert_eq!(
            triples(g1_graph, &context).await,
            vec![triple("a", "p", "d")]
        );

        run(
            vec![UpdateOperation::Move {
                silent: false,
                from: g2,
                to: GraphName::DefaultGraph,
            }],
            &context,
        )
        .await;
        let g2_graph = dataset.named_graph(&iri("g2")).unwrap();
        assert!(triples(g2_graph, &context).await.is_empty());
        assert_eq!(
            triples(dataset.default_graph(), &context).await,
            vec![triple("a", "p", "d")]
        );
    }

    #[tokio::test]
    async fn add_from_missing_graph() {
        let context = engine_context();
        let add = |silent| UpdateOperation::Add {
            silent,
            from: GraphName::NamedNode(iri("missing")),
            to: GraphName::DefaultGraph,
        };

        let loud = execute_update(&[add(false)], &context).await;
        let silent = execute_update(&[add(true)], &context).await;

        assert!(matches!(loud, Err(QueryEvaluationError::GraphDoesNotExist(_))));
        assert!(silent.is_ok());
    }
}
