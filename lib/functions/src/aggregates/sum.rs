use crate::aggregates::Accumulator;
use rdf_pipeline_model::{Numeric, Term, ThinError, ThinResult};

/// Adds `value` to `sum`. A non-numeric value poisons the sum.
pub(super) fn add_to_sum(sum: ThinResult<Numeric>, value: Option<&Term>) -> ThinResult<Numeric> {
    let sum = sum?;
    let Some(Term::Literal(literal)) = value else {
        return ThinError::expected();
    };
    sum.checked_add(Numeric::from_literal(literal.as_ref())?)
}

/// `SUM(expr)`: the sum of all values. `0` for an empty group.
#[derive(Debug)]
pub struct Sum {
    sum: ThinResult<Numeric>,
}

impl Default for Sum {
    fn default() -> Self {
        Self {
            sum: Ok(Numeric::Integer(0)),
        }
    }
}

impl Accumulator for Sum {
    fn accumulate(&mut self, value: Option<Term>) {
        if self.sum.is_ok() {
            self.sum = add_to_sum(self.sum, value.as_ref());
        }
    }

    fn finish(self: Box<Self>) -> ThinResult<Option<Term>> {
        Ok(Some(self.sum?.into_literal().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_model::rdf_vocab::xsd;
    use rdf_pipeline_model::Literal;

    fn sum(values: Vec<Option<Term>>) -> ThinResult<Option<Term>> {
        let mut sum = Box::new(Sum::default());
        for value in values {
            sum.accumulate(value);
        }
        sum.finish()
    }

    #[test]
    fn sum_promotes_types() {
        let values = vec![
            Some(Literal::from(1_i64).into()),
            Some(Literal::new_typed_literal("1.5", xsd::DECIMAL).into()),
        ];

        assert_eq!(
            sum(values),
            Ok(Some(Literal::new_typed_literal("2.5", xsd::DECIMAL).into()))
        );
    }

    #[test]
    fn empty_sum_is_zero() {
        assert_eq!(sum(Vec::new()), Ok(Some(Literal::from(0_i64).into())));
    }

    #[test]
    fn failures_poison_the_sum() {
        let values = vec![Some(Literal::from(1_i64).into()), None];

        assert!(sum(values).is_err());
        assert!(sum(vec![Some(Literal::from("a").into())]).is_err());
    }
}
