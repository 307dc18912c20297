//! Vocabularies used by the engine.

/// Magic predicates that configure a full-text search inside a basic graph pattern.
///
/// ```sparql
/// PREFIX ps: <http://rdf-pipeline.org/search#>
/// SELECT ?s ?o ?score WHERE {
///   ?s ?p ?o .
///   ?o ps:search "neil gaiman" ;
///      ps:matchAllTerms true ;
///      ps:relevance ?score .
/// }
/// ```
pub mod search {
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://rdf-pipeline.org/search#";

    /// The keywords to search for.
    pub const SEARCH: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdf-pipeline.org/search#search");
    /// Whether all keywords must match.
    pub const MATCH_ALL_TERMS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdf-pipeline.org/search#matchAllTerms");
    pub const MIN_RELEVANCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdf-pipeline.org/search#minRelevance");
    pub const MAX_RELEVANCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdf-pipeline.org/search#maxRelevance");
    pub const MIN_RANK: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdf-pipeline.org/search#minRank");
    pub const MAX_RANK: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdf-pipeline.org/search#maxRank");
    /// Binds the relevance score of a match.
    pub const RELEVANCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdf-pipeline.org/search#relevance");
    /// Binds the rank of a match.
    pub const RANK: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://rdf-pipeline.org/search#rank");
}
