//! The implementations of the built-in scalar functions.
//!
//! Every function receives its already evaluated arguments. Lazy forms (e.g., `IF` or
//! `COALESCE`) are handled by the expression evaluator.

mod conversion;
mod dates_and_times;
mod hash;
mod numeric;
mod strings;
mod terms;

use crate::BuiltinName;
use rdf_pipeline_model::rdf_vocab::{rdf, xsd};
use rdf_pipeline_model::{Literal, Numeric, Term, ThinError, ThinResult};

pub(crate) use dates_and_times::now;
pub(crate) use numeric::{add, divide, multiply, subtract, unary_minus, unary_plus};

/// Evaluates a built-in function. The arity must have been checked beforehand.
pub(crate) fn evaluate_builtin(name: BuiltinName, args: &[Term]) -> ThinResult<Term> {
    match (name, args) {
        (BuiltinName::Str, [arg]) => terms::str(arg),
        (BuiltinName::Lang, [arg]) => terms::lang(arg),
        (BuiltinName::Datatype, [arg]) => terms::datatype(arg),
        (BuiltinName::Iri, [arg]) => terms::iri(arg),
        (BuiltinName::BNode, []) => Ok(terms::bnode()),
        (BuiltinName::BNode, [arg]) => terms::bnode_from(arg),
        (BuiltinName::StrDt, [lexical, datatype]) => terms::str_dt(lexical, datatype),
        (BuiltinName::StrLang, [lexical, language]) => terms::str_lang(lexical, language),
        (BuiltinName::IsIri, [arg]) => Ok(boolean(matches!(arg, Term::NamedNode(_)))),
        (BuiltinName::IsBlank, [arg]) => Ok(boolean(matches!(arg, Term::BlankNode(_)))),
        (BuiltinName::IsLiteral, [arg]) => Ok(boolean(matches!(arg, Term::Literal(_)))),
        (BuiltinName::IsNumeric, [arg]) => Ok(boolean(numeric_arg(arg).is_ok())),
        (BuiltinName::Uuid, []) => Ok(terms::uuid()),
        (BuiltinName::StrUuid, []) => Ok(terms::str_uuid()),
        (BuiltinName::StrLen, [arg]) => strings::str_len(arg),
        (BuiltinName::SubStr, [arg, start]) => strings::sub_str(arg, start, None),
        (BuiltinName::SubStr, [arg, start, length]) => strings::sub_str(arg, start, Some(length)),
        (BuiltinName::UCase, [arg]) => strings::ucase(arg),
        (BuiltinName::LCase, [arg]) => strings::lcase(arg),
        (BuiltinName::StrStarts, [lhs, rhs]) => strings::str_starts(lhs, rhs),
        (BuiltinName::StrEnds, [lhs, rhs]) => strings::str_ends(lhs, rhs),
        (BuiltinName::Contains, [lhs, rhs]) => strings::contains(lhs, rhs),
        (BuiltinName::StrBefore, [lhs, rhs]) => strings::str_before(lhs, rhs),
        (BuiltinName::StrAfter, [lhs, rhs]) => strings::str_after(lhs, rhs),
        (BuiltinName::EncodeForUri, [arg]) => strings::encode_for_uri(arg),
        (BuiltinName::Concat, args) => strings::concat(args),
        (BuiltinName::LangMatches, [tag, range]) => strings::lang_matches(tag, range),
        (BuiltinName::Regex, [arg, pattern]) => strings::regex(arg, pattern, None),
        (BuiltinName::Regex, [arg, pattern, flags]) => strings::regex(arg, pattern, Some(flags)),
        (BuiltinName::Replace, [arg, pattern, replacement]) => {
            strings::replace(arg, pattern, replacement, None)
        }
        (BuiltinName::Replace, [arg, pattern, replacement, flags]) => {
            strings::replace(arg, pattern, replacement, Some(flags))
        }
        (BuiltinName::Abs, [arg]) => numeric::unary(arg, Numeric::checked_abs),
        (BuiltinName::Round, [arg]) => numeric::unary(arg, Numeric::checked_round),
        (BuiltinName::Ceil, [arg]) => numeric::unary(arg, Numeric::checked_ceil),
        (BuiltinName::Floor, [arg]) => numeric::unary(arg, Numeric::checked_floor),
        (BuiltinName::Rand, []) => Ok(numeric::rand()),
        (BuiltinName::Year, [arg]) => dates_and_times::year(arg),
        (BuiltinName::Month, [arg]) => dates_and_times::month(arg),
        (BuiltinName::Day, [arg]) => dates_and_times::day(arg),
        (BuiltinName::Hours, [arg]) => dates_and_times::hours(arg),
        (BuiltinName::Minutes, [arg]) => dates_and_times::minutes(arg),
        (BuiltinName::Seconds, [arg]) => dates_and_times::seconds(arg),
        (BuiltinName::Timezone, [arg]) => dates_and_times::timezone(arg),
        (BuiltinName::Tz, [arg]) => dates_and_times::tz(arg),
        (BuiltinName::Now, []) => Ok(now()),
        (BuiltinName::Md5, [arg]) => hash::md5(arg),
        (BuiltinName::Sha1, [arg]) => hash::sha1(arg),
        (BuiltinName::Sha256, [arg]) => hash::sha256(arg),
        (BuiltinName::Sha384, [arg]) => hash::sha384(arg),
        (BuiltinName::Sha512, [arg]) => hash::sha512(arg),
        (BuiltinName::CastString, [arg]) => conversion::cast_string(arg),
        (BuiltinName::CastBoolean, [arg]) => conversion::cast_boolean(arg),
        (BuiltinName::CastInteger, [arg]) => conversion::cast_integer(arg),
        (BuiltinName::CastInt, [arg]) => conversion::cast_int(arg),
        (BuiltinName::CastDecimal, [arg]) => conversion::cast_decimal(arg),
        (BuiltinName::CastFloat, [arg]) => conversion::cast_float(arg),
        (BuiltinName::CastDouble, [arg]) => conversion::cast_double(arg),
        (BuiltinName::CastDateTime, [arg]) => conversion::cast_date_time(arg),
        _ => ThinError::expected(),
    }
}

/// A string argument: its lexical value and, for language-tagged strings, its language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StringArg<'term> {
    pub value: &'term str,
    pub language: Option<&'term str>,
}

impl<'term> StringArg<'term> {
    /// Accepts simple literals, `xsd:string` literals and language-tagged strings.
    pub fn try_from_term(term: &'term Term) -> ThinResult<Self> {
        let Term::Literal(literal) = term else {
            return ThinError::expected();
        };
        if let Some(language) = literal.language() {
            return Ok(Self {
                value: literal.value(),
                language: Some(language),
            });
        }
        if literal.datatype() == xsd::STRING {
            return Ok(Self {
                value: literal.value(),
                language: None,
            });
        }
        ThinError::expected()
    }

    /// Creates a literal with the language of this argument.
    pub fn with_value(self, value: impl Into<String>) -> Term {
        string_literal(value.into(), self.language)
    }

    /// Checks the argument compatibility rules of the SPARQL string functions.
    ///
    /// The arguments are compatible if both are simple literals, both have the same language, or
    /// only the first one has a language.
    pub fn is_compatible_with(self, other: Self) -> bool {
        match (self.language, other.language) {
            (_, None) => true,
            (Some(lhs), Some(rhs)) => lhs.eq_ignore_ascii_case(rhs),
            (None, Some(_)) => false,
        }
    }
}

/// Accepts only simple literals and `xsd:string` literals.
pub(crate) fn simple_string(term: &Term) -> ThinResult<&str> {
    match term {
        Term::Literal(literal) if literal.datatype() == xsd::STRING => Ok(literal.value()),
        _ => ThinError::expected(),
    }
}

pub(crate) fn string_literal(value: String, language: Option<&str>) -> Term {
    match language {
        Some(language) => Literal::new_language_tagged_literal_unchecked(value, language).into(),
        None => Literal::new_simple_literal(value).into(),
    }
}

pub(crate) fn numeric_arg(term: &Term) -> ThinResult<Numeric> {
    match term {
        Term::Literal(literal) => Numeric::from_literal(literal.as_ref()),
        _ => ThinError::expected(),
    }
}

pub(crate) fn integer_arg(term: &Term) -> ThinResult<i64> {
    match numeric_arg(term)? {
        Numeric::Integer(value) => Ok(value),
        _ => ThinError::expected(),
    }
}

pub(crate) fn boolean(value: bool) -> Term {
    Literal::from(value).into()
}

/// Returns true iff `term` is a language-tagged string.
pub(crate) fn is_language_string(term: &Term) -> bool {
    matches!(term, Term::Literal(literal) if literal.datatype() == rdf::LANG_STRING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(value: &str, language: &str) -> Term {
        Literal::new_language_tagged_literal_unchecked(value, language).into()
    }

    #[test]
    fn string_compatibility() {
        let simple = Term::from(Literal::from("a"));
        let english = lang("a", "en");
        let french = lang("a", "fr");
        let arg = |term| StringArg::try_from_term(term).unwrap();

        assert!(arg(&english).is_compatible_with(arg(&simple)));
        assert!(arg(&english).is_compatible_with(arg(&english)));
        assert!(!arg(&english).is_compatible_with(arg(&french)));
        assert!(!arg(&simple).is_compatible_with(arg(&english)));
    }

    #[test]
    fn non_strings_are_rejected() {
        assert!(StringArg::try_from_term(&Literal::from(1_i64).into()).is_err());
        assert!(simple_string(&lang("a", "en")).is_err());
        assert!(is_language_string(&lang("a", "en")));
    }
}
