//! Value comparison and the total order used by `ORDER BY`, `MIN` and `MAX`.

use rdf_pipeline_model::rdf_vocab::{rdf, xsd};
use rdf_pipeline_model::{
    DateTime, Literal, Numeric, Term, ThinError, ThinResult, TimezoneOffset,
};
use std::cmp::Ordering;
use std::str::FromStr;

/// The comparable value of a literal.
enum LiteralValue<'term> {
    Numeric(Numeric),
    Boolean(bool),
    String(&'term str),
    LanguageString(&'term str, &'term str),
    DateTime(DateTime),
    /// A literal with an unsupported or ill-formed datatype.
    Unknown,
}

impl<'term> LiteralValue<'term> {
    fn from_literal(literal: &'term Literal) -> Self {
        let datatype = literal.datatype();
        if datatype == xsd::STRING {
            return Self::String(literal.value());
        }
        if datatype == rdf::LANG_STRING {
            return Self::LanguageString(literal.value(), literal.language().unwrap_or_default());
        }
        if datatype == xsd::BOOLEAN {
            return match literal.value() {
                "true" | "1" => Self::Boolean(true),
                "false" | "0" => Self::Boolean(false),
                _ => Self::Unknown,
            };
        }
        if datatype == xsd::DATE_TIME {
            return DateTime::from_str(literal.value()).map_or(Self::Unknown, Self::DateTime);
        }
        Numeric::from_literal(literal.as_ref()).map_or(Self::Unknown, Self::Numeric)
    }
}

/// Compares two terms with the SPARQL operators `<`, `>`, `<=` and `>=`.
///
/// Fails for values that are not comparable (e.g., a string and a number).
pub fn partial_compare(lhs: &Term, rhs: &Term) -> ThinResult<Ordering> {
    let (Term::Literal(lhs), Term::Literal(rhs)) = (lhs, rhs) else {
        return ThinError::expected();
    };
    let ordering = match (LiteralValue::from_literal(lhs), LiteralValue::from_literal(rhs)) {
        (LiteralValue::Numeric(lhs), LiteralValue::Numeric(rhs)) => lhs.partial_cmp(&rhs),
        (LiteralValue::Boolean(lhs), LiteralValue::Boolean(rhs)) => Some(lhs.cmp(&rhs)),
        (LiteralValue::String(lhs), LiteralValue::String(rhs)) => Some(lhs.cmp(rhs)),
        (LiteralValue::LanguageString(lhs, lhs_lang), LiteralValue::LanguageString(rhs, rhs_lang))
            if lhs_lang.eq_ignore_ascii_case(rhs_lang) =>
        {
            Some(lhs.cmp(rhs))
        }
        (LiteralValue::DateTime(lhs), LiteralValue::DateTime(rhs)) => lhs.partial_cmp(&rhs),
        _ => None,
    };
    ordering.ok_or(ThinError::default())
}

/// The `RDFterm-equal` comparison of the SPARQL `=` operator.
///
/// Numbers, booleans and date times are compared by value. Otherwise, terms are equal iff they are
/// identical. Comparing two different literals of which one has an unsupported datatype fails.
pub fn equals(lhs: &Term, rhs: &Term) -> ThinResult<bool> {
    if lhs == rhs {
        return Ok(true);
    }
    let (Term::Literal(lhs), Term::Literal(rhs)) = (lhs, rhs) else {
        return Ok(false);
    };
    match (LiteralValue::from_literal(lhs), LiteralValue::from_literal(rhs)) {
        (LiteralValue::Numeric(lhs), LiteralValue::Numeric(rhs)) => Ok(lhs == rhs),
        (LiteralValue::Boolean(lhs), LiteralValue::Boolean(rhs)) => Ok(lhs == rhs),
        (LiteralValue::DateTime(lhs), LiteralValue::DateTime(rhs)) => Ok(lhs == rhs),
        (LiteralValue::Unknown, _) | (_, LiteralValue::Unknown) => ThinError::expected(),
        _ => Ok(false),
    }
}

/// The total order of `ORDER BY`.
///
/// Unbound values come first, followed by blank nodes, IRIs and literals. Literals are grouped
/// into numbers, booleans, simple strings, language-tagged strings, date times and all others, in
/// this order. Within a group, literals are ordered by value. Ties and the remaining literals are
/// ordered by datatype, lexical value and language.
pub fn order_terms(lhs: Option<&Term>, rhs: Option<&Term>) -> Ordering {
    match (lhs, rhs) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(lhs), Some(rhs)) => match (lhs, rhs) {
            (Term::BlankNode(lhs), Term::BlankNode(rhs)) => lhs.as_str().cmp(rhs.as_str()),
            (Term::BlankNode(_), _) => Ordering::Less,
            (_, Term::BlankNode(_)) => Ordering::Greater,
            (Term::NamedNode(lhs), Term::NamedNode(rhs)) => lhs.as_str().cmp(rhs.as_str()),
            (Term::NamedNode(_), _) => Ordering::Less,
            (_, Term::NamedNode(_)) => Ordering::Greater,
            (Term::Literal(lhs), Term::Literal(rhs)) => order_literals(lhs, rhs),
        },
    }
}

/// The sort key of a literal within its group.
enum OrderKey<'term> {
    Numeric(f64),
    Boolean(bool),
    String(&'term str),
    LanguageString(&'term str, &'term str),
    /// Normalized to UTC. Date times without a timezone are read as UTC.
    DateTime(DateTime),
    Other,
}

impl<'term> OrderKey<'term> {
    fn from_literal(literal: &'term Literal) -> Self {
        match LiteralValue::from_literal(literal) {
            LiteralValue::Numeric(value) => Self::Numeric(value.to_f64()),
            LiteralValue::Boolean(value) => Self::Boolean(value),
            LiteralValue::String(value) => Self::String(value),
            LiteralValue::LanguageString(value, language) => Self::LanguageString(value, language),
            LiteralValue::DateTime(value) => value
                .adjust(Some(TimezoneOffset::UTC))
                .map_or(Self::Other, Self::DateTime),
            LiteralValue::Unknown => Self::Other,
        }
    }

    fn group(&self) -> u8 {
        match self {
            Self::Numeric(_) => 0,
            Self::Boolean(_) => 1,
            Self::String(_) => 2,
            Self::LanguageString(..) => 3,
            Self::DateTime(_) => 4,
            Self::Other => 5,
        }
    }

    /// Compares two keys of the same group.
    fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(lhs), Self::Numeric(rhs)) => lhs.total_cmp(rhs),
            (Self::Boolean(lhs), Self::Boolean(rhs)) => lhs.cmp(rhs),
            (Self::String(lhs), Self::String(rhs)) => lhs.cmp(rhs),
            (Self::LanguageString(lhs, lhs_lang), Self::LanguageString(rhs, rhs_lang)) => {
                lhs.cmp(rhs).then_with(|| lhs_lang.cmp(rhs_lang))
            }
            (Self::DateTime(lhs), Self::DateTime(rhs)) => {
                lhs.partial_cmp(rhs).unwrap_or(Ordering::Equal)
            }
            _ => Ordering::Equal,
        }
    }
}

fn order_literals(lhs: &Literal, rhs: &Literal) -> Ordering {
    let lhs_key = OrderKey::from_literal(lhs);
    let rhs_key = OrderKey::from_literal(rhs);
    lhs_key
        .group()
        .cmp(&rhs_key.group())
        .then_with(|| lhs_key.cmp_value(&rhs_key))
        .then_with(|| lhs.datatype().as_str().cmp(rhs.datatype().as_str()))
        .then_with(|| lhs.value().cmp(rhs.value()))
        .then_with(|| lhs.language().cmp(&rhs.language()))
}
