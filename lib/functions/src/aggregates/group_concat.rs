use crate::aggregates::Accumulator;
use rdf_pipeline_model::rdf_vocab::xsd;
use rdf_pipeline_model::{Literal, Term, ThinError, ThinResult};

/// `GROUP_CONCAT(expr; SEPARATOR=...)`: joins the string values of the group.
///
/// The result keeps a language tag only if every value carries the same one.
#[derive(Debug)]
pub struct GroupConcat {
    separator: String,
    value: ThinResult<String>,
    language: Option<String>,
    count: usize,
}

impl GroupConcat {
    pub const DEFAULT_SEPARATOR: &'static str = " ";

    pub fn new(separator: Option<String>) -> Self {
        Self {
            separator: separator.unwrap_or_else(|| Self::DEFAULT_SEPARATOR.to_owned()),
            value: Ok(String::new()),
            language: None,
            count: 0,
        }
    }

    fn append(&mut self, value: Option<&Term>) -> ThinResult<()> {
        let Some(Term::Literal(literal)) = value else {
            return ThinError::expected();
        };
        let language = literal.language();
        if language.is_none() && literal.datatype() != xsd::STRING {
            return ThinError::expected();
        }

        let result = self.value.as_mut().map_err(|error| *error)?;
        if self.count > 0 {
            result.push_str(&self.separator);
            if self.language.as_deref() != language {
                self.language = None;
            }
        } else {
            self.language = language.map(ToOwned::to_owned);
        }
        result.push_str(literal.value());
        self.count += 1;
        Ok(())
    }
}

impl Accumulator for GroupConcat {
    fn accumulate(&mut self, value: Option<Term>) {
        if self.value.is_ok() {
            if let Err(error) = self.append(value.as_ref()) {
                self.value = Err(error);
            }
        }
    }

    fn finish(self: Box<Self>) -> ThinResult<Option<Term>> {
        let value = self.value?;
        let literal = match self.language {
            Some(language) => Literal::new_language_tagged_literal_unchecked(value, language),
            None => Literal::new_simple_literal(value),
        };
        Ok(Some(literal.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(separator: Option<&str>, values: Vec<Option<Term>>) -> ThinResult<Option<Term>> {
        let mut accumulator = Box::new(GroupConcat::new(separator.map(ToOwned::to_owned)));
        for value in values {
            accumulator.accumulate(value);
        }
        accumulator.finish()
    }

    #[test]
    fn joins_with_separator() {
        let values = vec![Some(Literal::from("a").into()), Some(Literal::from("b").into())];

        assert_eq!(
            concat(None, values.clone()),
            Ok(Some(Literal::from("a b").into()))
        );
        assert_eq!(
            concat(Some(", "), values),
            Ok(Some(Literal::from("a, b").into()))
        );
    }

    #[test]
    fn keeps_shared_language() {
        let english = |value: &str| {
            Some(Term::from(Literal::new_language_tagged_literal_unchecked(
                value, "en",
            )))
        };

        assert_eq!(
            concat(None, vec![english("a"), english("b")]),
            Ok(Some(
                Literal::new_language_tagged_literal_unchecked("a b", "en").into()
            ))
        );
        assert_eq!(
            concat(None, vec![english("a"), Some(Literal::from("b").into())]),
            Ok(Some(Literal::from("a b").into()))
        );
    }

    #[test]
    fn failures_poison_the_result() {
        assert!(concat(None, vec![Some(Literal::from("a").into()), None]).is_err());
        assert_eq!(concat(None, Vec::new()), Ok(Some(Literal::from("").into())));
    }
}
