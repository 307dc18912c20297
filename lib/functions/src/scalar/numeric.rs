use crate::scalar::numeric_arg;
use rdf_pipeline_model::{Literal, Numeric, Term, ThinResult};

pub(crate) fn unary(arg: &Term, op: fn(Numeric) -> ThinResult<Numeric>) -> ThinResult<Term> {
    Ok(op(numeric_arg(arg)?)?.into_literal().into())
}

fn binary(
    lhs: &Term,
    rhs: &Term,
    op: fn(Numeric, Numeric) -> ThinResult<Numeric>,
) -> ThinResult<Term> {
    Ok(op(numeric_arg(lhs)?, numeric_arg(rhs)?)?
        .into_literal()
        .into())
}

pub(crate) fn add(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    binary(lhs, rhs, Numeric::checked_add)
}

pub(crate) fn subtract(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    binary(lhs, rhs, Numeric::checked_sub)
}

pub(crate) fn multiply(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    binary(lhs, rhs, Numeric::checked_mul)
}

pub(crate) fn divide(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    binary(lhs, rhs, Numeric::checked_div)
}

pub(crate) fn unary_plus(arg: &Term) -> ThinResult<Term> {
    unary(arg, Ok)
}

pub(crate) fn unary_minus(arg: &Term) -> ThinResult<Term> {
    unary(arg, Numeric::checked_neg)
}

pub(crate) fn rand() -> Term {
    Literal::from(rand::random::<f64>()).into()
}
