use crate::aggregates::Accumulator;
use crate::order_terms;
use rdf_pipeline_model::{Term, ThinResult};

/// `MIN(expr)`: the smallest value in the order of `ORDER BY`. Failing rows are ignored.
#[derive(Debug, Default)]
pub struct Min {
    min: Option<Term>,
}

impl Accumulator for Min {
    fn accumulate(&mut self, value: Option<Term>) {
        let Some(value) = value else {
            return;
        };
        if self.min.as_ref().map_or(true, |min| {
            order_terms(Some(&value), Some(min)).is_lt()
        }) {
            self.min = Some(value);
        }
    }

    fn finish(self: Box<Self>) -> ThinResult<Option<Term>> {
        Ok(self.min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_model::{Literal, NamedNode};

    #[test]
    fn min_across_kinds() {
        let mut min = Box::new(Min::default());
        min.accumulate(Some(Literal::from(3_i64).into()));
        min.accumulate(None);
        min.accumulate(Some(NamedNode::new_unchecked("http://example.com/").into()));
        min.accumulate(Some(Literal::from(1_i64).into()));

        assert_eq!(
            min.finish(),
            Ok(Some(NamedNode::new_unchecked("http://example.com/").into()))
        );
    }

    #[test]
    fn empty_min_is_unbound() {
        assert_eq!(Box::new(Min::default()).finish(), Ok(None));
    }
}
