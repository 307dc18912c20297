use rdf_pipeline_model::{Term, ThinError, ThinResult};
use std::fmt::{Debug, Formatter};
use std::iter;

/// A lazy, finite sequence of terms produced by a generator function.
///
/// The sequence can only be consumed once.
pub type TermSequence = Box<dyn Iterator<Item = Term> + Send>;

/// The result of evaluating an expression.
pub enum EvaluatedValue {
    Term(Term),
    /// Produced by custom functions that generate several values. A `BIND` of such a value
    /// produces one solution per term.
    Sequence(TermSequence),
}

impl EvaluatedValue {
    /// Returns the single term of this value. For a sequence, this is its first term.
    pub fn into_term(self) -> ThinResult<Term> {
        match self {
            Self::Term(term) => Ok(term),
            Self::Sequence(mut terms) => terms.next().ok_or(ThinError::default()),
        }
    }

    /// Returns all terms of this value.
    pub fn into_terms(self) -> TermSequence {
        match self {
            Self::Term(term) => Box::new(iter::once(term)),
            Self::Sequence(terms) => terms,
        }
    }
}

impl From<Term> for EvaluatedValue {
    fn from(term: Term) -> Self {
        Self::Term(term)
    }
}

impl Debug for EvaluatedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Term(term) => f.debug_tuple("Term").field(term).finish(),
            Self::Sequence(_) => f.debug_tuple("Sequence").finish_non_exhaustive(),
        }
    }
}
