use crate::{NamedNode, NamedNodePattern, Term, TermPattern, TriplePattern, Variable};
use rustc_hash::FxHashMap;
use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

type PropertyMap = FxHashMap<String, Arc<dyn Any + Send + Sync>>;

/// A set of solution bindings, mapping SPARQL variables to RDF terms.
///
/// Once a [Bindings] has been handed to a downstream stage it is never mutated again. All
/// combinators (e.g., [Bindings::union]) return a new value. Mutating methods such as
/// [Bindings::set] are only used while building a fresh binding set.
///
/// Besides the variable bindings, a binding set carries a map of *properties*. Properties
/// transport execution-scoped state (e.g., the materialized columns of a group) without
/// occupying the variable namespace. They take no part in equality and are never returned by
/// [Bindings::variables] or [Bindings::values]. The property map is shared between clones and
/// copied on the first write.
///
/// ```
/// # use rdf_pipeline_model::{Bindings, Literal, Variable};
/// let x = Variable::new_unchecked("x");
/// let left = Bindings::from_iter([(x.clone(), Literal::from(1_i64).into())]);
/// let right = Bindings::from_iter([(x.clone(), Literal::from(2_i64).into())]);
///
/// assert_eq!(left.union(&right).get(&x), right.get(&x));
/// ```
#[derive(Clone, Default)]
pub struct Bindings {
    values: FxHashMap<Variable, Term>,
    properties: Arc<PropertyMap>,
}

impl Bindings {
    /// Creates an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the term bound to `variable`.
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.values.get(variable)
    }

    /// Returns the term bound to the variable called `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&Term> {
        self.values
            .iter()
            .find(|(variable, _)| variable.as_str() == name)
            .map(|(_, term)| term)
    }

    pub fn has(&self, variable: &Variable) -> bool {
        self.values.contains_key(variable)
    }

    /// Binds `variable` to `term`, returning the previously bound term.
    ///
    /// Must only be called on binding sets that have not been emitted yet.
    pub fn set(&mut self, variable: Variable, term: Term) -> Option<Term> {
        self.values.insert(variable, term)
    }

    pub fn remove(&mut self, variable: &Variable) -> Option<Term> {
        self.values.remove(variable)
    }

    /// Returns a new binding set that additionally binds `variable` to `term`.
    #[must_use]
    pub fn extended(&self, variable: Variable, term: Term) -> Self {
        let mut result = self.clone();
        result.set(variable, term);
        result
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.values.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Term> {
        self.values.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.values.iter()
    }

    /// Returns the union of both binding sets. On a collision, the term of `other` wins.
    #[must_use]
    pub fn union(&self, other: &Bindings) -> Self {
        let mut result = self.clone();
        for (variable, term) in &other.values {
            result.values.insert(variable.clone(), term.clone());
        }
        if !other.properties.is_empty() {
            let properties = Arc::make_mut(&mut result.properties);
            for (key, value) in other.properties.iter() {
                properties.insert(key.clone(), Arc::clone(value));
            }
        }
        result
    }

    /// Keeps the bindings that are present and equal in both sets.
    ///
    /// Mismatching values are dropped silently.
    #[must_use]
    pub fn intersection(&self, other: &Bindings) -> Self {
        self.filter(|variable, term| other.get(variable) == Some(term))
    }

    /// Keeps the bindings whose variable is absent from `other` or bound to a different term.
    #[must_use]
    pub fn difference(&self, other: &Bindings) -> Self {
        self.filter(|variable, term| other.get(variable) != Some(term))
    }

    /// Returns true iff every binding of `self` also holds in `other`.
    pub fn is_subset(&self, other: &Bindings) -> bool {
        self.values
            .iter()
            .all(|(variable, term)| other.get(variable) == Some(term))
    }

    /// Returns true iff both sets agree on every variable they have in common.
    pub fn is_compatible(&self, other: &Bindings) -> bool {
        let (small, large) = self.smaller_first(other);
        small
            .values
            .iter()
            .all(|(variable, term)| large.get(variable).map_or(true, |other| other == term))
    }

    /// Returns true iff at least one variable is bound in both sets.
    pub fn shares_variable(&self, other: &Bindings) -> bool {
        let (small, large) = self.smaller_first(other);
        small.values.keys().any(|variable| large.has(variable))
    }

    /// Merges two compatible binding sets. Returns [None] if they disagree on any variable.
    pub fn merge_compatible(&self, other: &Bindings) -> Option<Self> {
        self.is_compatible(other).then(|| self.union(other))
    }

    /// Keeps only the bindings for which `predicate` holds.
    #[must_use]
    pub fn filter(&self, mut predicate: impl FnMut(&Variable, &Term) -> bool) -> Self {
        let values = self
            .values
            .iter()
            .filter(|(variable, term)| predicate(variable, term))
            .map(|(variable, term)| (variable.clone(), term.clone()))
            .collect();
        self.with_values(values)
    }

    /// Maps every binding. Bindings for which `mapper` returns [None] are dropped.
    #[must_use]
    pub fn map(&self, mut mapper: impl FnMut(&Variable, &Term) -> Option<(Variable, Term)>) -> Self {
        let values = self
            .values
            .iter()
            .filter_map(|(variable, term)| mapper(variable, term))
            .collect();
        self.with_values(values)
    }

    /// Renames variables. Bindings for which `mapper` returns [None] are dropped.
    #[must_use]
    pub fn map_variables(&self, mut mapper: impl FnMut(&Variable, &Term) -> Option<Variable>) -> Self {
        self.map(|variable, term| Some((mapper(variable, term)?, term.clone())))
    }

    /// Maps the bound terms. Bindings for which `mapper` returns [None] are dropped.
    #[must_use]
    pub fn map_values(&self, mut mapper: impl FnMut(&Variable, &Term) -> Option<Term>) -> Self {
        self.map(|variable, term| Some((variable.clone(), mapper(variable, term)?)))
    }

    /// Restricts the binding set to `variables`.
    #[must_use]
    pub fn project(&self, variables: &[Variable]) -> Self {
        self.filter(|variable, _| variables.contains(variable))
    }

    /// Substitutes every variable of `pattern` that is bound in this set.
    ///
    /// Variables that are not bound are left untouched. A predicate variable bound to a term that
    /// is not an IRI is also left untouched as it can never match.
    pub fn bound(&self, pattern: &TriplePattern) -> TriplePattern {
        let predicate = match &pattern.predicate {
            NamedNodePattern::Variable(variable) => match self.get(variable) {
                Some(Term::NamedNode(node)) => NamedNodePattern::NamedNode(node.clone()),
                _ => NamedNodePattern::Variable(variable.clone()),
            },
            NamedNodePattern::NamedNode(node) => NamedNodePattern::NamedNode(node.clone()),
        };
        TriplePattern {
            subject: self.bound_term(&pattern.subject),
            predicate,
            object: self.bound_term(&pattern.object),
        }
    }

    /// Substitutes a single pattern slot.
    pub fn bound_term(&self, pattern: &TermPattern) -> TermPattern {
        match pattern {
            TermPattern::Variable(variable) => match self.get(variable) {
                Some(term) => term_to_pattern(term.clone()),
                None => pattern.clone(),
            },
            _ => pattern.clone(),
        }
    }

    /// Attaches a property to this binding set.
    pub fn set_property<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        Arc::make_mut(&mut self.properties).insert(key.into(), Arc::new(value));
    }

    /// Returns the property stored under `key` if it has type `T`.
    pub fn property<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.properties.get(key)?.downcast_ref::<T>()
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn remove_property(&mut self, key: &str) {
        if self.properties.contains_key(key) {
            Arc::make_mut(&mut self.properties).remove(key);
        }
    }

    pub fn property_keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Returns the bindings sorted by variable name.
    pub fn sorted(&self) -> Vec<(&Variable, &Term)> {
        let mut result = self.values.iter().collect::<Vec<_>>();
        result.sort_by(|(lhs, _), (rhs, _)| lhs.as_str().cmp(rhs.as_str()));
        result
    }

    fn with_values(&self, values: FxHashMap<Variable, Term>) -> Self {
        Self {
            values,
            properties: Arc::clone(&self.properties),
        }
    }

    fn smaller_first<'a>(&'a self, other: &'a Bindings) -> (&'a Bindings, &'a Bindings) {
        if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        }
    }
}

/// Converts a term into a pattern slot.
pub fn term_to_pattern(term: Term) -> TermPattern {
    match term {
        Term::NamedNode(node) => TermPattern::NamedNode(node),
        Term::BlankNode(node) => TermPattern::BlankNode(node),
        Term::Literal(literal) => TermPattern::Literal(literal),
    }
}

/// Returns the term of a pattern slot, if the slot is not a variable.
pub fn pattern_to_term(pattern: &TermPattern) -> Option<Term> {
    match pattern {
        TermPattern::NamedNode(node) => Some(node.clone().into()),
        TermPattern::BlankNode(node) => Some(node.clone().into()),
        TermPattern::Literal(literal) => Some(literal.clone().into()),
        TermPattern::Variable(_) => None,
    }
}

/// Returns the IRI of a predicate slot, if the slot is not a variable.
pub fn predicate_to_node(pattern: &NamedNodePattern) -> Option<&NamedNode> {
    match pattern {
        NamedNodePattern::NamedNode(node) => Some(node),
        NamedNodePattern::Variable(_) => None,
    }
}

impl PartialEq for Bindings {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for Bindings {}

impl Debug for Bindings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("values", &self.values)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Display for Bindings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (variable, term)) in self.sorted().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{variable} -> {term}")?;
        }
        f.write_str("}")
    }
}

impl FromIterator<(Variable, Term)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            properties: Arc::default(),
        }
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a Variable, &'a Term);
    type IntoIter = std::collections::hash_map::Iter<'a, Variable, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
