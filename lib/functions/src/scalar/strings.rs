use crate::scalar::{boolean, numeric_arg, simple_string, string_literal, StringArg};
use rdf_pipeline_model::{Literal, Term, ThinError, ThinResult};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

pub(crate) fn str_len(arg: &Term) -> ThinResult<Term> {
    let arg = StringArg::try_from_term(arg)?;
    let length = i64::try_from(arg.value.chars().count())?;
    Ok(Literal::from(length).into())
}

/// `SUBSTR` with 1-based, rounded character positions.
#[allow(
    clippy::cast_precision_loss,
    reason = "Character positions are compared with rounded doubles"
)]
pub(crate) fn sub_str(arg: &Term, start: &Term, length: Option<&Term>) -> ThinResult<Term> {
    let arg = StringArg::try_from_term(arg)?;
    let start = numeric_arg(start)?.to_f64().round();
    let length = length
        .map(|length| numeric_arg(length).map(|length| length.to_f64().round()))
        .transpose()?;

    let value = arg
        .value
        .chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = (*index + 1) as f64;
            position >= start && length.map_or(true, |length| position < start + length)
        })
        .map(|(_, c)| c)
        .collect::<String>();
    Ok(arg.with_value(value))
}

pub(crate) fn ucase(arg: &Term) -> ThinResult<Term> {
    let arg = StringArg::try_from_term(arg)?;
    Ok(arg.with_value(arg.value.to_uppercase()))
}

pub(crate) fn lcase(arg: &Term) -> ThinResult<Term> {
    let arg = StringArg::try_from_term(arg)?;
    Ok(arg.with_value(arg.value.to_lowercase()))
}

fn compatible_args<'term>(
    lhs: &'term Term,
    rhs: &'term Term,
) -> ThinResult<(StringArg<'term>, StringArg<'term>)> {
    let lhs = StringArg::try_from_term(lhs)?;
    let rhs = StringArg::try_from_term(rhs)?;
    if !lhs.is_compatible_with(rhs) {
        return ThinError::expected();
    }
    Ok((lhs, rhs))
}

pub(crate) fn str_starts(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(boolean(lhs.value.starts_with(rhs.value)))
}

pub(crate) fn str_ends(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(boolean(lhs.value.ends_with(rhs.value)))
}

pub(crate) fn contains(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(boolean(lhs.value.contains(rhs.value)))
}

pub(crate) fn str_before(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(match lhs.value.find(rhs.value) {
        Some(position) => lhs.with_value(&lhs.value[..position]),
        None => string_literal(String::new(), None),
    })
}

pub(crate) fn str_after(lhs: &Term, rhs: &Term) -> ThinResult<Term> {
    let (lhs, rhs) = compatible_args(lhs, rhs)?;
    Ok(match lhs.value.find(rhs.value) {
        Some(position) => lhs.with_value(&lhs.value[position + rhs.value.len()..]),
        None => string_literal(String::new(), None),
    })
}

pub(crate) fn encode_for_uri(arg: &Term) -> ThinResult<Term> {
    const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

    let arg = StringArg::try_from_term(arg)?;
    let mut result = String::with_capacity(arg.value.len());
    for byte in arg.value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(char::from(byte));
            }
            _ => {
                result.push('%');
                result.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
                result.push(char::from(HEX_DIGITS[usize::from(byte & 0xF)]));
            }
        }
    }
    Ok(string_literal(result, None))
}

/// Concatenates strings. The result keeps the language only if all arguments share it.
pub(crate) fn concat(args: &[Term]) -> ThinResult<Term> {
    let args = args
        .iter()
        .map(StringArg::try_from_term)
        .collect::<ThinResult<Vec<_>>>()?;
    let language = match args.split_first() {
        Some((first, rest)) if rest.iter().all(|arg| arg.language == first.language) => {
            first.language
        }
        _ => None,
    };
    let value = args.iter().map(|arg| arg.value).collect::<String>();
    Ok(string_literal(value, language))
}

pub(crate) fn lang_matches(tag: &Term, range: &Term) -> ThinResult<Term> {
    let tag = simple_string(tag)?.to_ascii_lowercase();
    let range = simple_string(range)?.to_ascii_lowercase();
    let matches = if range == "*" {
        !tag.is_empty()
    } else {
        tag == range
            || tag
                .strip_prefix(range.as_str())
                .is_some_and(|rest| rest.starts_with('-'))
    };
    Ok(boolean(matches))
}

pub(crate) fn regex(arg: &Term, pattern: &Term, flags: Option<&Term>) -> ThinResult<Term> {
    let arg = StringArg::try_from_term(arg)?;
    let flags = flags.map(simple_string).transpose()?;
    let regex = compile_pattern(simple_string(pattern)?, flags)?;
    Ok(boolean(regex.is_match(arg.value)))
}

pub(crate) fn replace(
    arg: &Term,
    pattern: &Term,
    replacement: &Term,
    flags: Option<&Term>,
) -> ThinResult<Term> {
    let arg = StringArg::try_from_term(arg)?;
    let flags = flags.map(simple_string).transpose()?;
    let regex = compile_pattern(simple_string(pattern)?, flags)?;
    let replacement = simple_string(replacement)?;
    Ok(arg.with_value(regex.replace_all(arg.value, replacement).into_owned()))
}

pub(crate) fn compile_pattern(pattern: &str, flags: Option<&str>) -> ThinResult<Regex> {
    const REGEX_SIZE_LIMIT: usize = 1_000_000;

    let mut pattern = Cow::Borrowed(pattern);
    let flags = flags.unwrap_or_default();
    if flags.contains('q') {
        pattern = regex::escape(&pattern).into();
    }
    let mut builder = RegexBuilder::new(&pattern);
    builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            's' => {
                builder.dot_matches_new_line(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            'i' => {
                builder.case_insensitive(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'q' => (),
            _ => return ThinError::expected(),
        }
    }
    builder.build().map_err(|_| ThinError::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple(value: &str) -> Term {
        Literal::from(value).into()
    }

    fn lang(value: &str, language: &str) -> Term {
        Literal::new_language_tagged_literal_unchecked(value, language).into()
    }

    #[test]
    fn substring_uses_one_based_positions() {
        let value = simple("foobar");
        let start = Literal::from(4_i64).into();
        let length = Literal::from(2_i64).into();

        assert_eq!(sub_str(&value, &start, None).unwrap(), simple("bar"));
        assert_eq!(sub_str(&value, &start, Some(&length)).unwrap(), simple("ba"));
    }

    #[test]
    fn str_before_keeps_language_only_on_match() {
        assert_eq!(
            str_before(&lang("abc", "en"), &simple("b")).unwrap(),
            lang("a", "en")
        );
        assert_eq!(
            str_before(&lang("abc", "en"), &simple("z")).unwrap(),
            simple("")
        );
        assert!(str_before(&simple("abc"), &lang("b", "en")).is_err());
    }

    #[test]
    fn concat_drops_mixed_languages() {
        assert_eq!(
            concat(&[lang("a", "en"), lang("b", "en")]).unwrap(),
            lang("ab", "en")
        );
        assert_eq!(
            concat(&[lang("a", "en"), simple("b")]).unwrap(),
            simple("ab")
        );
    }

    #[test]
    fn regex_flags() {
        let value = simple("Alice");

        assert_eq!(
            regex(&value, &simple("^ali"), Some(&simple("i"))).unwrap(),
            boolean(true)
        );
        assert_eq!(regex(&value, &simple("^ali"), None).unwrap(), boolean(false));
        assert!(regex(&value, &simple("a"), Some(&simple("z"))).is_err());
    }

    #[test]
    fn replace_and_encode() {
        assert_eq!(
            replace(&simple("abcd"), &simple("b"), &simple("Z"), None).unwrap(),
            simple("aZcd")
        );
        assert_eq!(
            encode_for_uri(&simple("Los Angeles")).unwrap(),
            simple("Los%20Angeles")
        );
    }

    #[test]
    fn language_ranges() {
        assert_eq!(
            lang_matches(&simple("en-US"), &simple("en")).unwrap(),
            boolean(true)
        );
        assert_eq!(
            lang_matches(&simple("fr"), &simple("*")).unwrap(),
            boolean(true)
        );
        assert_eq!(
            lang_matches(&simple("english"), &simple("en")).unwrap(),
            boolean(false)
        );
    }
}
