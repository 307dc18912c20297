use rdf_pipeline_model::rdf_vocab::{rdf, xsd};
use rdf_pipeline_model::{is_numeric_datatype, Numeric, Term, ThinError, ThinResult};

/// Computes the effective boolean value of a term.
///
/// Booleans map to their value (an ill-formed lexical form is `false`), strings are `true` iff
/// they are not empty, and numbers are `true` iff they are neither zero nor NaN. All other terms
/// have no effective boolean value.
pub fn effective_boolean_value(term: &Term) -> ThinResult<bool> {
    let Term::Literal(literal) = term else {
        return ThinError::expected();
    };
    let datatype = literal.datatype();
    if datatype == xsd::BOOLEAN {
        return Ok(matches!(literal.value(), "true" | "1"));
    }
    if datatype == xsd::STRING || datatype == rdf::LANG_STRING {
        return Ok(!literal.value().is_empty());
    }
    match Numeric::from_literal(literal.as_ref()) {
        Ok(value) => Ok(!value.is_zero() && !value.is_nan()),
        Err(_) if is_numeric_datatype(datatype) => Ok(false),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_model::{Literal, NamedNode};

    #[test]
    fn effective_boolean_values() {
        assert_eq!(effective_boolean_value(&Literal::from(true).into()), Ok(true));
        assert_eq!(effective_boolean_value(&Literal::from("").into()), Ok(false));
        assert_eq!(effective_boolean_value(&Literal::from("a").into()), Ok(true));
        assert_eq!(effective_boolean_value(&Literal::from(0_i64).into()), Ok(false));
        assert_eq!(
            effective_boolean_value(&Literal::new_typed_literal("NaN", xsd::DOUBLE).into()),
            Ok(false)
        );
        assert_eq!(
            effective_boolean_value(&Literal::new_typed_literal("abc", xsd::INTEGER).into()),
            Ok(false)
        );
        assert!(
            effective_boolean_value(&NamedNode::new_unchecked("http://example.com/").into())
                .is_err()
        );
    }
}
