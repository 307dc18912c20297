use crate::aggregates::sum::add_to_sum;
use crate::aggregates::Accumulator;
use rdf_pipeline_model::{Numeric, Term, ThinResult};

/// `AVG(expr)`: the average of all values. `0` for an empty group.
#[derive(Debug)]
pub struct Avg {
    sum: ThinResult<Numeric>,
    count: i64,
}

impl Default for Avg {
    fn default() -> Self {
        Self {
            sum: Ok(Numeric::Integer(0)),
            count: 0,
        }
    }
}

impl Accumulator for Avg {
    fn accumulate(&mut self, value: Option<Term>) {
        if self.sum.is_ok() {
            self.sum = add_to_sum(self.sum, value.as_ref());
            self.count += 1;
        }
    }

    fn finish(self: Box<Self>) -> ThinResult<Option<Term>> {
        let sum = self.sum?;
        if self.count == 0 {
            return Ok(Some(Numeric::Integer(0).into_literal().into()));
        }
        let average = sum.checked_div(Numeric::Integer(self.count))?;
        Ok(Some(average.into_literal().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_model::rdf_vocab::xsd;
    use rdf_pipeline_model::Literal;

    #[test]
    fn average_of_integers_is_decimal() {
        let mut avg = Box::new(Avg::default());
        for value in [1_i64, 2] {
            avg.accumulate(Some(Literal::from(value).into()));
        }

        assert_eq!(
            avg.finish(),
            Ok(Some(Literal::new_typed_literal("1.5", xsd::DECIMAL).into()))
        );
    }

    #[test]
    fn empty_average_is_zero() {
        assert_eq!(
            Box::new(Avg::default()).finish(),
            Ok(Some(Literal::from(0_i64).into()))
        );
    }
}
