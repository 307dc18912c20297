//! Helpers for matching triple patterns against triples.

use rdf_pipeline_model::{
    term_to_pattern, Bindings, NamedNodePattern, Subject, Term, TermPattern, TermRef, Triple,
    TriplePattern, Variable,
};

/// Returns the variables of `pattern` in subject, predicate, object order without duplicates.
pub fn pattern_variables(pattern: &TriplePattern) -> Vec<&Variable> {
    let mut variables = Vec::with_capacity(3);
    let slots = [
        term_variable(&pattern.subject),
        match &pattern.predicate {
            NamedNodePattern::Variable(variable) => Some(variable),
            NamedNodePattern::NamedNode(_) => None,
        },
        term_variable(&pattern.object),
    ];
    for variable in slots.into_iter().flatten() {
        if !variables.contains(&variable) {
            variables.push(variable);
        }
    }
    variables
}

fn term_variable(pattern: &TermPattern) -> Option<&Variable> {
    match pattern {
        TermPattern::Variable(variable) => Some(variable),
        _ => None,
    }
}

/// Counts the slots of `pattern` that are not variables.
pub fn bound_slot_count(pattern: &TriplePattern) -> usize {
    3 - [
        term_variable(&pattern.subject).is_some(),
        matches!(pattern.predicate, NamedNodePattern::Variable(_)),
        term_variable(&pattern.object).is_some(),
    ]
    .into_iter()
    .filter(|is_variable| *is_variable)
    .count()
}

pub fn is_fully_bound(pattern: &TriplePattern) -> bool {
    bound_slot_count(pattern) == 3
}

/// Returns the triple described by a pattern without variables.
///
/// Returns [None] if the pattern has variables or cannot describe a valid triple (e.g., a literal
/// in the subject position).
pub fn pattern_to_triple(pattern: &TriplePattern) -> Option<Triple> {
    let subject = match &pattern.subject {
        TermPattern::NamedNode(node) => Subject::NamedNode(node.clone()),
        TermPattern::BlankNode(node) => Subject::BlankNode(node.clone()),
        _ => return None,
    };
    let NamedNodePattern::NamedNode(predicate) = &pattern.predicate else {
        return None;
    };
    let object: Term = match &pattern.object {
        TermPattern::NamedNode(node) => node.clone().into(),
        TermPattern::BlankNode(node) => node.clone().into(),
        TermPattern::Literal(literal) => literal.clone().into(),
        TermPattern::Variable(_) => return None,
    };
    Some(Triple::new(subject, predicate.clone(), object))
}

/// Returns the pattern that only matches `triple`.
pub fn triple_to_pattern(triple: &Triple) -> TriplePattern {
    TriplePattern {
        subject: term_to_pattern(triple.subject.clone().into()),
        predicate: triple.predicate.clone().into(),
        object: term_to_pattern(triple.object.clone()),
    }
}

/// Matches `triple` against `pattern` and returns the bindings for the variables of the pattern.
///
/// Returns [None] if a bound slot does not match or a repeated variable would be bound to two
/// different terms.
pub fn extract_bindings(pattern: &TriplePattern, triple: &Triple) -> Option<Bindings> {
    let mut bindings = Bindings::new();
    bind_slot(&mut bindings, &pattern.subject, triple.subject.as_ref().into())?;
    match &pattern.predicate {
        NamedNodePattern::NamedNode(node) => {
            if node.as_ref() != triple.predicate.as_ref() {
                return None;
            }
        }
        NamedNodePattern::Variable(variable) => bind_variable(
            &mut bindings,
            variable,
            TermRef::NamedNode(triple.predicate.as_ref()),
        )?,
    }
    bind_slot(&mut bindings, &pattern.object, triple.object.as_ref())?;
    Some(bindings)
}

/// Returns true iff `triple` matches `pattern`.
pub fn triple_matches(pattern: &TriplePattern, triple: &Triple) -> bool {
    extract_bindings(pattern, triple).is_some()
}

fn bind_slot(bindings: &mut Bindings, slot: &TermPattern, term: TermRef<'_>) -> Option<()> {
    match slot {
        TermPattern::Variable(variable) => bind_variable(bindings, variable, term),
        TermPattern::NamedNode(node) => (TermRef::from(node.as_ref()) == term).then_some(()),
        TermPattern::BlankNode(node) => (TermRef::from(node.as_ref()) == term).then_some(()),
        TermPattern::Literal(literal) => (TermRef::from(literal.as_ref()) == term).then_some(()),
    }
}

fn bind_variable(bindings: &mut Bindings, variable: &Variable, term: TermRef<'_>) -> Option<()> {
    match bindings.get(variable) {
        Some(existing) => (existing.as_ref() == term).then_some(()),
        None => {
            bindings.set(variable.clone(), term.into_owned());
            Some(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_model::{Literal, NamedNode};

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{value}"))
    }

    #[test]
    fn repeated_variables_must_agree() {
        let x = Variable::new_unchecked("x");
        let pattern = TriplePattern {
            subject: x.clone().into(),
            predicate: iri("p").into(),
            object: x.clone().into(),
        };
        let reflexive = Triple::new(iri("a"), iri("p"), iri("a"));
        let other = Triple::new(iri("a"), iri("p"), iri("b"));

        assert_eq!(
            extract_bindings(&pattern, &reflexive),
            Some(Bindings::from_iter([(x, iri("a").into())]))
        );
        assert!(!triple_matches(&pattern, &other));
        assert_eq!(pattern_variables(&pattern).len(), 1);
    }

    #[test]
    fn fully_bound_patterns_convert_to_triples() {
        let pattern = TriplePattern {
            subject: iri("s").into(),
            predicate: iri("p").into(),
            object: Literal::from("o").into(),
        };

        assert!(is_fully_bound(&pattern));
        assert_eq!(
            pattern_to_triple(&pattern),
            Some(Triple::new(iri("s"), iri("p"), Literal::from("o")))
        );
    }

    #[test]
    fn triple_patterns_only_match_their_triple() {
        let triple = Triple::new(iri("s"), iri("p"), Literal::from("o"));
        let pattern = triple_to_pattern(&triple);

        assert!(triple_matches(&pattern, &triple));
        assert!(!triple_matches(
            &pattern,
            &Triple::new(iri("s"), iri("p"), Literal::from("x"))
        ));
        assert_eq!(pattern_to_triple(&pattern), Some(triple));
    }
}
