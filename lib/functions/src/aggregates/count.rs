use crate::aggregates::Accumulator;
use rdf_pipeline_model::{Literal, Term, ThinResult};

/// `COUNT(expr)`: the number of rows for which the expression has a value.
#[derive(Debug, Default)]
pub struct Count {
    count: usize,
}

impl Accumulator for Count {
    fn accumulate(&mut self, value: Option<Term>) {
        if value.is_some() {
            self.count += 1;
        }
    }

    fn finish(self: Box<Self>) -> ThinResult<Option<Term>> {
        Ok(Some(count_literal(self.count)?))
    }
}

pub(super) fn count_literal(count: usize) -> ThinResult<Term> {
    Ok(Literal::from(i64::try_from(count)?).into())
}
