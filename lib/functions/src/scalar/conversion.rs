//! The XSD constructor casts.

use crate::scalar::{numeric_arg, string_literal};
use rdf_pipeline_model::rdf_vocab::xsd;
use rdf_pipeline_model::{
    DateTime, Decimal, Double, Float, Literal, LiteralRef, Numeric, Term, ThinError, ThinResult,
};
use std::str::FromStr;

/// The source of a cast: either a numeric value, a boolean, or a string to parse.
enum CastSource<'term> {
    Numeric(Numeric),
    Boolean(bool),
    String(&'term str),
    Other(LiteralRef<'term>),
}

impl<'term> CastSource<'term> {
    fn try_from_term(term: &'term Term) -> ThinResult<Self> {
        let Term::Literal(literal) = term else {
            return ThinError::expected();
        };
        let datatype = literal.datatype();
        if datatype == xsd::STRING {
            return Ok(Self::String(literal.value()));
        }
        if datatype == xsd::BOOLEAN {
            return Ok(Self::Boolean(parse_boolean(literal.value())?));
        }
        match numeric_arg(term) {
            Ok(value) => Ok(Self::Numeric(value)),
            Err(_) if literal.language().is_none() => Ok(Self::Other(literal.as_ref())),
            Err(error) => Err(error),
        }
    }
}

fn parse_boolean(value: &str) -> ThinResult<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => ThinError::expected(),
    }
}

pub(crate) fn cast_string(arg: &Term) -> ThinResult<Term> {
    let value = match arg {
        Term::NamedNode(node) => node.as_str(),
        Term::Literal(literal) if literal.language().is_none() => literal.value(),
        _ => return ThinError::expected(),
    };
    Ok(string_literal(value.to_owned(), None))
}

pub(crate) fn cast_boolean(arg: &Term) -> ThinResult<Term> {
    let value = match CastSource::try_from_term(arg)? {
        CastSource::Boolean(value) => value,
        CastSource::Numeric(value) => !value.is_zero() && !value.is_nan(),
        CastSource::String(value) => parse_boolean(value)?,
        CastSource::Other(_) => return ThinError::expected(),
    };
    Ok(Literal::from(value).into())
}

fn to_integer(arg: &Term) -> ThinResult<i64> {
    match CastSource::try_from_term(arg)? {
        CastSource::Boolean(value) => Ok(i64::from(value)),
        CastSource::Numeric(Numeric::Integer(value)) => Ok(value),
        CastSource::Numeric(Numeric::Decimal(value)) => {
            let value = value.to_string();
            let integral = value.split_once('.').map_or(value.as_str(), |(integral, _)| integral);
            Ok(integral.parse()?)
        }
        CastSource::Numeric(value) => float_to_integer(value.to_f64()),
        CastSource::String(value) => Ok(value.trim().trim_start_matches('+').parse()?),
        CastSource::Other(_) => ThinError::expected(),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "The range is checked before the cast"
)]
fn float_to_integer(value: f64) -> ThinResult<i64> {
    let value = value.trunc();
    if !value.is_finite() || value.abs() > 9.2e18 {
        return ThinError::expected();
    }
    Ok(value as i64)
}

pub(crate) fn cast_integer(arg: &Term) -> ThinResult<Term> {
    Ok(Literal::from(to_integer(arg)?).into())
}

pub(crate) fn cast_int(arg: &Term) -> ThinResult<Term> {
    let value = i32::try_from(to_integer(arg)?)?;
    Ok(Literal::new_typed_literal(value.to_string(), xsd::INT).into())
}

pub(crate) fn cast_decimal(arg: &Term) -> ThinResult<Term> {
    let value = match CastSource::try_from_term(arg)? {
        CastSource::Boolean(value) => Decimal::from(i64::from(value)),
        CastSource::Numeric(Numeric::Integer(value)) => Decimal::from(value),
        CastSource::Numeric(Numeric::Decimal(value)) => value,
        CastSource::Numeric(Numeric::Float(value)) => {
            Decimal::try_from(Double::from(f64::from(value)))?
        }
        CastSource::Numeric(Numeric::Double(value)) => Decimal::try_from(Double::from(value))?,
        CastSource::String(value) => Decimal::from_str(value.trim())?,
        CastSource::Other(_) => return ThinError::expected(),
    };
    Ok(Literal::new_typed_literal(value.to_string(), xsd::DECIMAL).into())
}

fn to_double(arg: &Term) -> ThinResult<f64> {
    match CastSource::try_from_term(arg)? {
        CastSource::Boolean(value) => Ok(if value { 1.0 } else { 0.0 }),
        CastSource::Numeric(value) => Ok(value.to_f64()),
        CastSource::String(value) => Ok(Double::from_str(value.trim())?.into()),
        CastSource::Other(_) => ThinError::expected(),
    }
}

pub(crate) fn cast_double(arg: &Term) -> ThinResult<Term> {
    Ok(Numeric::Double(to_double(arg)?).into_literal().into())
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Casting to float is lossy by definition"
)]
pub(crate) fn cast_float(arg: &Term) -> ThinResult<Term> {
    let value = match CastSource::try_from_term(arg)? {
        CastSource::String(value) => Float::from_str(value.trim())?.into(),
        _ => to_double(arg)? as f32,
    };
    Ok(Numeric::Float(value).into_literal().into())
}

pub(crate) fn cast_date_time(arg: &Term) -> ThinResult<Term> {
    let value = match CastSource::try_from_term(arg)? {
        CastSource::String(value) => value,
        CastSource::Other(literal) if literal.datatype() == xsd::DATE_TIME => literal.value(),
        _ => return ThinError::expected(),
    };
    let value = DateTime::from_str(value.trim()).map_err(|_| ThinError::default())?;
    Ok(Literal::new_typed_literal(value.to_string(), xsd::DATE_TIME).into())
}
