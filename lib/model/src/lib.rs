mod bindings;
mod error;
pub mod vocab;
mod xsd;

pub use bindings::*;
pub use error::*;
pub use xsd::*;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::vocab as rdf_vocab;
pub use oxrdf::{
    BlankNode, BlankNodeRef, GraphName, GraphNameRef, IriParseError, Literal, LiteralRef,
    NamedNode, NamedNodeRef, NamedOrBlankNode, Quad, QuadRef, Subject, SubjectRef, Term, TermRef,
    Triple, TripleRef, Variable, VariableRef,
};

pub use oxsdatatypes::{Date, DateTime, DayTimeDuration, Decimal, Double, Float, TimezoneOffset};

// Re-export the parsed algebra of spargebra.
pub use spargebra::algebra::{
    AggregateExpression, AggregateFunction, Expression, Function, GraphPattern, OrderExpression,
    GraphTarget, PropertyPathExpression, QueryDataset,
};
pub use spargebra::term::{
    GraphNamePattern, GroundQuad, GroundQuadPattern, GroundTerm, GroundTermPattern,
    NamedNodePattern, QuadPattern, TermPattern, TriplePattern,
};
/// The term module of the algebra, for types whose names collide with the RDF model.
pub use spargebra::term as algebra_term;
pub use spargebra::{GraphUpdateOperation, Query, SparqlSyntaxError, Update};
