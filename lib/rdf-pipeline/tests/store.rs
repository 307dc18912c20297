#![cfg(test)]
#![allow(clippy::panic_in_result_fn)]

use rdf_pipeline::common::EngineConfig;
use rdf_pipeline::model::{Literal, NamedNode, Term, Triple};
use rdf_pipeline::sparql::{QueryResults, QuerySolution};
use rdf_pipeline::storage::{GraphCapabilities, HashMapDataset, MemoryGraph, DEFAULT_GRAPH_IRI};
use rdf_pipeline::store::Store;
use std::error::Error;
use std::sync::Arc;

const PREFIX: &str = "PREFIX ex: <http://example.com/>\n";

fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

async fn store_with(triples: Vec<Triple>) -> Result<Store, Box<dyn Error>> {
    let store = Store::new();
    for triple in triples {
        store.insert(triple).await?;
    }
    Ok(store)
}

async fn select(store: &Store, query: &str) -> Result<Vec<QuerySolution>, Box<dyn Error>> {
    let QueryResults::Solutions(solutions) = store.query(format!("{PREFIX}{query}").as_str()).await?
    else {
        return Err("the query does not return solutions".into());
    };
    Ok(solutions.collect_solutions().await?)
}

async fn ask(store: &Store, query: &str) -> Result<bool, Box<dyn Error>> {
    let QueryResults::Boolean(value) = store.query(format!("{PREFIX}{query}").as_str()).await?
    else {
        return Err("the query does not return a boolean".into());
    };
    Ok(value)
}

fn values(solutions: &[QuerySolution], variable: &str) -> Vec<Option<Term>> {
    solutions
        .iter()
        .map(|solution| solution.get(variable).cloned())
        .collect()
}

fn sorted_strings(solutions: &[QuerySolution], variable: &str) -> Vec<String> {
    let mut values = values(solutions, variable)
        .into_iter()
        .map(|value| value.map_or_else(String::new, |term| term.to_string()))
        .collect::<Vec<_>>();
    values.sort();
    values
}

fn knows() -> Vec<Triple> {
    vec![
        Triple::new(ex("alice"), ex("knows"), ex("bob")),
        Triple::new(ex("bob"), ex("knows"), ex("carol")),
        Triple::new(ex("carol"), ex("knows"), ex("dave")),
        Triple::new(ex("alice"), ex("age"), Literal::from(31)),
        Triple::new(ex("bob"), ex("age"), Literal::from(27)),
    ]
}

#[tokio::test]
async fn test_minus_without_shared_variables_removes_everything() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let solutions = select(
        &store,
        "SELECT * WHERE { ?s ex:knows ?o MINUS { ?x ex:age ?y } }",
    )
    .await?;

    assert!(solutions.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_minus_with_shared_variables() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let solutions = select(
        &store,
        "SELECT ?s WHERE { ?s ex:knows ?o MINUS { ?s ex:age ?age } }",
    )
    .await?;

    assert_eq!(sorted_strings(&solutions, "s"), vec![ex("carol").to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_join_drops_conflicting_bind() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let conflicting = select(
        &store,
        "SELECT * WHERE { ?s ex:knows ?x . { BIND(ex:nobody AS ?x) } }",
    )
    .await?;
    let agreeing = select(
        &store,
        "SELECT * WHERE { ?s ex:knows ?x . { BIND(ex:bob AS ?x) } }",
    )
    .await?;

    assert!(conflicting.is_empty());
    assert_eq!(sorted_strings(&agreeing, "s"), vec![ex("alice").to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_join_with_values_keeps_compatible_rows() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let solutions = select(
        &store,
        "SELECT * WHERE { ?s ex:knows ?x . VALUES ?x { ex:bob ex:nobody } }",
    )
    .await?;

    assert_eq!(sorted_strings(&solutions, "s"), vec![ex("alice").to_string()]);
    assert_eq!(sorted_strings(&solutions, "x"), vec![ex("bob").to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_join_with_sub_select_keeps_compatible_rows() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let solutions = select(
        &store,
        "SELECT * WHERE { ?s ex:knows ?x . { SELECT ?x WHERE { ?x ex:age ?age } } }",
    )
    .await?;

    assert_eq!(sorted_strings(&solutions, "s"), vec![ex("alice").to_string()]);
    assert_eq!(values(&solutions, "age"), vec![None]);
    Ok(())
}

#[tokio::test]
async fn test_distinct_is_idempotent() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let once = select(&store, "SELECT DISTINCT ?p WHERE { ?s ?p ?o }").await?;
    let twice = select(
        &store,
        "SELECT DISTINCT ?p WHERE { { SELECT DISTINCT ?p WHERE { ?s ?p ?o } } }",
    )
    .await?;

    assert_eq!(once.len(), 2);
    assert_eq!(sorted_strings(&once, "p"), sorted_strings(&twice, "p"));
    Ok(())
}

#[tokio::test]
async fn test_count_over_empty_input() -> Result<(), Box<dyn Error>> {
    let store = Store::new();

    let solutions = select(
        &store,
        "SELECT (COUNT(*) AS ?count) WHERE { ?s ex:missing ?o }",
    )
    .await?;

    assert_eq!(
        values(&solutions, "count"),
        vec![Some(Literal::from(0_i64).into())]
    );
    Ok(())
}

#[tokio::test]
async fn test_group_by_with_aggregates() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let solutions = select(
        &store,
        "SELECT ?s (COUNT(?o) AS ?friends) WHERE { ?s ex:knows ?o } GROUP BY ?s HAVING (COUNT(?o) > 0)",
    )
    .await?;

    assert_eq!(solutions.len(), 3);
    assert!(values(&solutions, "friends")
        .iter()
        .all(|count| count == &Some(Literal::from(1_i64).into())));
    Ok(())
}

#[tokio::test]
async fn test_order_by_is_deterministic() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;
    let query = "SELECT ?s ?age WHERE { ?s ex:knows ?o OPTIONAL { ?s ex:age ?age } } ORDER BY DESC(?age) ?s";

    let first = select(&store, query).await?;
    let second = select(&store, query).await?;

    assert_eq!(
        values(&first, "s"),
        vec![
            Some(ex("alice").into()),
            Some(ex("bob").into()),
            Some(ex("carol").into()),
        ]
    );
    assert_eq!(values(&first, "s"), values(&second, "s"));
    Ok(())
}

#[tokio::test]
async fn test_full_text_search_match_all() -> Result<(), Box<dyn Error>> {
    let store = store_with(vec![
        Triple::new(ex("good-omens"), ex("title"), Literal::from("Good Omens by Neil Gaiman")),
        Triple::new(ex("coraline"), ex("title"), Literal::from("Coraline by Neil Gaiman")),
        Triple::new(ex("neverwhere"), ex("title"), Literal::from("Neverwhere by Neil")),
    ])
    .await?;

    let solutions = select(
        &store,
        "PREFIX ps: <http://rdf-pipeline.org/search#>
         SELECT ?s ?score WHERE {
           ?s ex:title ?title .
           ?title ps:search \"neil gaiman\" ;
                  ps:matchAllTerms true ;
                  ps:relevance ?score .
         }",
    )
    .await?;

    assert_eq!(
        sorted_strings(&solutions, "s"),
        vec![ex("coraline").to_string(), ex("good-omens").to_string()]
    );
    assert!(values(&solutions, "score").iter().all(Option::is_some));
    Ok(())
}

#[tokio::test]
async fn test_bound_join_equals_index_join() -> Result<(), Box<dyn Error>> {
    let triples = vec![
        Triple::new(ex("one"), ex("p"), ex("a")),
        Triple::new(ex("two"), ex("p"), ex("b")),
        Triple::new(ex("three"), ex("p"), ex("c")),
    ];
    let batched_graph = MemoryGraph::new(NamedNode::new_unchecked(DEFAULT_GRAPH_IRI))
        .with_capabilities(GraphCapabilities::ALL);
    let batched = Store::with_dataset(
        Arc::new(HashMapDataset::new().with_default_graph(Arc::new(batched_graph))),
        EngineConfig::default(),
    );
    for triple in triples.clone() {
        batched.insert(triple).await?;
    }
    let indexed = store_with(triples).await?;
    let query = "SELECT ?x ?y WHERE { VALUES ?x { ex:one ex:two } ?x ex:p ?y }";

    let batched_solutions = select(&batched, query).await?;
    let indexed_solutions = select(&indexed, query).await?;

    assert_eq!(
        sorted_strings(&batched_solutions, "y"),
        vec![ex("a").to_string(), ex("b").to_string()]
    );
    assert_eq!(
        sorted_strings(&batched_solutions, "y"),
        sorted_strings(&indexed_solutions, "y")
    );
    Ok(())
}

#[tokio::test]
async fn test_property_paths() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let solutions = select(&store, "SELECT ?o WHERE { ex:alice ex:knows+ ?o }").await?;

    assert_eq!(
        sorted_strings(&solutions, "o"),
        vec![
            ex("bob").to_string(),
            ex("carol").to_string(),
            ex("dave").to_string()
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_filter_and_bind() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let solutions = select(
        &store,
        "SELECT ?s ?next WHERE {
           ?s ex:age ?age
           FILTER(?age > 30)
           BIND(?age + 1 AS ?next)
         }",
    )
    .await?;

    assert_eq!(values(&solutions, "s"), vec![Some(ex("alice").into())]);
    assert_eq!(
        values(&solutions, "next"),
        vec![Some(Literal::from(32_i64).into())]
    );
    Ok(())
}

#[tokio::test]
async fn test_graph_over_named_graphs() -> Result<(), Box<dyn Error>> {
    let store = Store::new();
    store
        .insert_into(&ex("g1"), Triple::new(ex("a"), ex("p"), ex("b")))
        .await?;
    store
        .insert_into(&ex("g2"), Triple::new(ex("c"), ex("p"), ex("d")))
        .await?;

    let all = select(&store, "SELECT ?g ?s WHERE { GRAPH ?g { ?s ?p ?o } }").await?;
    let one = select(&store, "SELECT ?s WHERE { GRAPH ex:g2 { ?s ?p ?o } }").await?;
    let unknown = store
        .query(format!("{PREFIX}SELECT * WHERE {{ GRAPH ex:g3 {{ ?s ?p ?o }} }}").as_str())
        .await;

    assert_eq!(
        sorted_strings(&all, "g"),
        vec![ex("g1").to_string(), ex("g2").to_string()]
    );
    assert_eq!(values(&one, "s"), vec![Some(ex("c").into())]);
    assert!(unknown.is_err());
    Ok(())
}

#[tokio::test]
async fn test_update_lifecycle() -> Result<(), Box<dyn Error>> {
    let store = Store::new();

    store
        .update(
            "PREFIX ex: <http://example.com/>
             INSERT DATA {
               ex:a ex:p ex:b .
               GRAPH ex:g { ex:c ex:p ex:d }
             }",
        )
        .await?;
    assert!(ask(&store, "ASK { ex:a ex:p ex:b }").await?);
    assert!(ask(&store, "ASK { GRAPH ex:g { ex:c ex:p ex:d } }").await?);

    store
        .update(
            "PREFIX ex: <http://example.com/>
             DELETE { ?s ex:p ?o } INSERT { ?o ex:q ?s } WHERE { ?s ex:p ?o }",
        )
        .await?;
    assert!(!ask(&store, "ASK { ex:a ex:p ex:b }").await?);
    assert!(ask(&store, "ASK { ex:b ex:q ex:a }").await?);

    store.update("CLEAR ALL").await?;
    assert!(!ask(&store, "ASK { { ?s ?p ?o } UNION { GRAPH ?g { ?s ?p ?o } } }").await?);
    assert_eq!(store.named_graphs(), vec![ex("g")]);

    store.update("DROP GRAPH <http://example.com/g>").await?;
    assert!(store.named_graphs().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_create_existing_graph() -> Result<(), Box<dyn Error>> {
    let store = Store::new();
    store.update("CREATE GRAPH <http://example.com/g>").await?;

    let loud = store.update("CREATE GRAPH <http://example.com/g>").await;
    let silent = store
        .update("CREATE SILENT GRAPH <http://example.com/g>")
        .await;

    assert!(loud.is_err());
    assert!(silent.is_ok());
    assert!(store.dataset().has_named_graph(&ex("g")));
    Ok(())
}

#[tokio::test]
async fn test_construct() -> Result<(), Box<dyn Error>> {
    let store = store_with(knows()).await?;

    let QueryResults::Graph(triples) = store
        .query(format!("{PREFIX}CONSTRUCT {{ ?o ex:knownBy ?s }} WHERE {{ ?s ex:knows ?o }}").as_str())
        .await?
    else {
        return Err("CONSTRUCT does not return a graph".into());
    };
    let triples = triples.collect_triples().await?;

    assert_eq!(triples.len(), 3);
    assert!(triples.contains(&Triple::new(ex("bob"), ex("knownBy"), ex("alice"))));
    Ok(())
}
