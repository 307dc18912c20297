use crate::aggregates::Accumulator;
use crate::order_terms;
use rdf_pipeline_model::{Term, ThinResult};

/// `MAX(expr)`: the largest value in the order of `ORDER BY`. Failing rows are ignored.
#[derive(Debug, Default)]
pub struct Max {
    max: Option<Term>,
}

impl Accumulator for Max {
    fn accumulate(&mut self, value: Option<Term>) {
        let Some(value) = value else {
            return;
        };
        if self.max.as_ref().map_or(true, |max| {
            order_terms(Some(&value), Some(max)).is_gt()
        }) {
            self.max = Some(value);
        }
    }

    fn finish(self: Box<Self>) -> ThinResult<Option<Term>> {
        Ok(self.max)
    }
}
