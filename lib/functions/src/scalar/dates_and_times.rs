use crate::scalar::string_literal;
use rdf_pipeline_model::rdf_vocab::xsd;
use rdf_pipeline_model::{Date, DateTime, Literal, Term, ThinError, ThinResult};
use std::str::FromStr;

/// The calendar fields shared by `xsd:dateTime` and `xsd:date`.
enum Temporal {
    DateTime(DateTime),
    Date(Date),
}

impl Temporal {
    fn try_from_term(term: &Term) -> ThinResult<Self> {
        let Term::Literal(literal) = term else {
            return ThinError::expected();
        };
        let datatype = literal.datatype();
        if datatype == xsd::DATE_TIME {
            DateTime::from_str(literal.value())
                .map(Self::DateTime)
                .map_err(|_| ThinError::default())
        } else if datatype == xsd::DATE {
            Date::from_str(literal.value())
                .map(Self::Date)
                .map_err(|_| ThinError::default())
        } else {
            ThinError::expected()
        }
    }
}

fn date_time(term: &Term) -> ThinResult<DateTime> {
    match Temporal::try_from_term(term)? {
        Temporal::DateTime(value) => Ok(value),
        Temporal::Date(_) => ThinError::expected(),
    }
}

pub(crate) fn year(arg: &Term) -> ThinResult<Term> {
    let year = match Temporal::try_from_term(arg)? {
        Temporal::DateTime(value) => value.year(),
        Temporal::Date(value) => value.year(),
    };
    Ok(Literal::from(year).into())
}

pub(crate) fn month(arg: &Term) -> ThinResult<Term> {
    let month = match Temporal::try_from_term(arg)? {
        Temporal::DateTime(value) => value.month(),
        Temporal::Date(value) => value.month(),
    };
    Ok(Literal::from(i64::from(month)).into())
}

pub(crate) fn day(arg: &Term) -> ThinResult<Term> {
    let day = match Temporal::try_from_term(arg)? {
        Temporal::DateTime(value) => value.day(),
        Temporal::Date(value) => value.day(),
    };
    Ok(Literal::from(i64::from(day)).into())
}

pub(crate) fn hours(arg: &Term) -> ThinResult<Term> {
    Ok(Literal::from(i64::from(date_time(arg)?.hour())).into())
}

pub(crate) fn minutes(arg: &Term) -> ThinResult<Term> {
    Ok(Literal::from(i64::from(date_time(arg)?.minute())).into())
}

pub(crate) fn seconds(arg: &Term) -> ThinResult<Term> {
    let seconds = date_time(arg)?.second();
    Ok(Literal::new_typed_literal(seconds.to_string(), xsd::DECIMAL).into())
}

pub(crate) fn timezone(arg: &Term) -> ThinResult<Term> {
    let timezone = match Temporal::try_from_term(arg)? {
        Temporal::DateTime(value) => value.timezone(),
        Temporal::Date(value) => value.timezone(),
    };
    let timezone = timezone.ok_or(ThinError::default())?;
    Ok(Literal::new_typed_literal(timezone.to_string(), xsd::DAY_TIME_DURATION).into())
}

/// Returns the timezone suffix of the lexical form, or an empty string if there is none.
pub(crate) fn tz(arg: &Term) -> ThinResult<Term> {
    Temporal::try_from_term(arg)?;
    let Term::Literal(literal) = arg else {
        return ThinError::expected();
    };
    let value = literal.value();
    let suffix = if value.ends_with('Z') {
        "Z"
    } else {
        value
            .char_indices()
            .rev()
            .nth(5)
            .filter(|(_, sign)| *sign == '+' || *sign == '-')
            .map(|(index, _)| &value[index..])
            .filter(|suffix| suffix.as_bytes().get(3) == Some(&b':'))
            .unwrap_or_default()
    };
    Ok(string_literal(suffix.to_owned(), None))
}

pub(crate) fn now() -> Term {
    Literal::new_typed_literal(DateTime::now().to_string(), xsd::DATE_TIME).into()
}
