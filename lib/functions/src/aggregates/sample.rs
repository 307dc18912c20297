use crate::aggregates::Accumulator;
use rdf_pipeline_model::{Term, ThinResult};

/// `SAMPLE(expr)`: an arbitrary value of the group. This implementation picks the first one.
#[derive(Debug, Default)]
pub struct Sample {
    value: Option<Term>,
}

impl Accumulator for Sample {
    fn accumulate(&mut self, value: Option<Term>) {
        if self.value.is_none() {
            self.value = value;
        }
    }

    fn finish(self: Box<Self>) -> ThinResult<Option<Term>> {
        Ok(self.value)
    }
}
