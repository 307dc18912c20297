use crate::scalar::{simple_string, string_literal};
use rdf_pipeline_model::rdf_vocab::xsd;
use rdf_pipeline_model::{BlankNode, Literal, NamedNode, Term, ThinError, ThinResult};
use uuid::Uuid;

pub(crate) fn str(arg: &Term) -> ThinResult<Term> {
    match arg {
        Term::NamedNode(node) => Ok(string_literal(node.as_str().to_owned(), None)),
        Term::Literal(literal) => Ok(string_literal(literal.value().to_owned(), None)),
        Term::BlankNode(_) => ThinError::expected(),
    }
}

pub(crate) fn lang(arg: &Term) -> ThinResult<Term> {
    let Term::Literal(literal) = arg else {
        return ThinError::expected();
    };
    Ok(string_literal(
        literal.language().unwrap_or_default().to_owned(),
        None,
    ))
}

pub(crate) fn datatype(arg: &Term) -> ThinResult<Term> {
    let Term::Literal(literal) = arg else {
        return ThinError::expected();
    };
    Ok(literal.datatype().into_owned().into())
}

pub(crate) fn iri(arg: &Term) -> ThinResult<Term> {
    match arg {
        Term::NamedNode(node) => Ok(node.clone().into()),
        Term::Literal(_) => Ok(NamedNode::new(simple_string(arg)?)?.into()),
        Term::BlankNode(_) => ThinError::expected(),
    }
}

pub(crate) fn bnode() -> Term {
    BlankNode::default().into()
}

/// A blank node whose identifier is derived from a simple literal.
///
/// Equal strings produce equal blank nodes.
pub(crate) fn bnode_from(arg: &Term) -> ThinResult<Term> {
    let label = simple_string(arg)?;
    let id = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_string()
            } else {
                format!("_{:x}", u32::from(c))
            }
        })
        .collect::<String>();
    Ok(BlankNode::new(format!("b{id}"))?.into())
}

pub(crate) fn str_dt(lexical: &Term, datatype: &Term) -> ThinResult<Term> {
    let Term::NamedNode(datatype) = datatype else {
        return ThinError::expected();
    };
    let value = simple_string(lexical)?;
    Ok(Literal::new_typed_literal(value, datatype.clone()).into())
}

pub(crate) fn str_lang(lexical: &Term, language: &Term) -> ThinResult<Term> {
    let value = simple_string(lexical)?;
    let language = simple_string(language)?;
    Literal::new_language_tagged_literal(value, language)
        .map(Into::into)
        .map_err(|_| ThinError::default())
}

pub(crate) fn uuid() -> Term {
    NamedNode::new_unchecked(format!("urn:uuid:{}", Uuid::new_v4())).into()
}

pub(crate) fn str_uuid() -> Term {
    Literal::new_typed_literal(Uuid::new_v4().to_string(), xsd::STRING).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_of_terms() {
        let iri = NamedNode::new_unchecked("http://example.com/a");

        assert_eq!(
            str(&iri.into()).unwrap(),
            Literal::from("http://example.com/a").into()
        );
        assert!(str(&BlankNode::default().into()).is_err());
    }

    #[test]
    fn bnode_labels_are_stable() {
        let label = Literal::from("a b").into();

        assert_eq!(bnode_from(&label).unwrap(), bnode_from(&label).unwrap());
        assert_ne!(bnode(), bnode());
    }

    #[test]
    fn uuids_are_distinct() {
        assert_ne!(uuid(), uuid());
        assert_ne!(str_uuid(), str_uuid());
    }
}
