use rdf_pipeline_model::rdf_vocab::xsd;
use rdf_pipeline_model::{Function, NamedNodeRef};
use std::fmt::{Display, Formatter};

/// The built-in scalar functions of SPARQL, including the XSD constructor casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinName {
    // Terms
    Str,
    Lang,
    Datatype,
    Iri,
    BNode,
    StrDt,
    StrLang,
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    Uuid,
    StrUuid,
    // Strings
    StrLen,
    SubStr,
    UCase,
    LCase,
    StrStarts,
    StrEnds,
    Contains,
    StrBefore,
    StrAfter,
    EncodeForUri,
    Concat,
    LangMatches,
    Regex,
    Replace,
    // Numeric
    Abs,
    Round,
    Ceil,
    Floor,
    Rand,
    // Dates and times
    Year,
    Month,
    Day,
    Hours,
    Minutes,
    Seconds,
    Timezone,
    Tz,
    Now,
    // Hashing
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    // Casts
    CastString,
    CastBoolean,
    CastInteger,
    CastInt,
    CastDecimal,
    CastFloat,
    CastDouble,
    CastDateTime,
}

impl BuiltinName {
    /// Maps a parsed SPARQL function to its builtin.
    ///
    /// Custom functions are only mapped if they are an XSD constructor cast.
    pub fn from_function(function: &Function) -> Option<Self> {
        Some(match function {
            Function::Str => Self::Str,
            Function::Lang => Self::Lang,
            Function::LangMatches => Self::LangMatches,
            Function::Datatype => Self::Datatype,
            Function::Iri => Self::Iri,
            Function::BNode => Self::BNode,
            Function::Rand => Self::Rand,
            Function::Abs => Self::Abs,
            Function::Ceil => Self::Ceil,
            Function::Floor => Self::Floor,
            Function::Round => Self::Round,
            Function::Concat => Self::Concat,
            Function::SubStr => Self::SubStr,
            Function::StrLen => Self::StrLen,
            Function::Replace => Self::Replace,
            Function::UCase => Self::UCase,
            Function::LCase => Self::LCase,
            Function::EncodeForUri => Self::EncodeForUri,
            Function::Contains => Self::Contains,
            Function::StrStarts => Self::StrStarts,
            Function::StrEnds => Self::StrEnds,
            Function::StrBefore => Self::StrBefore,
            Function::StrAfter => Self::StrAfter,
            Function::Year => Self::Year,
            Function::Month => Self::Month,
            Function::Day => Self::Day,
            Function::Hours => Self::Hours,
            Function::Minutes => Self::Minutes,
            Function::Seconds => Self::Seconds,
            Function::Timezone => Self::Timezone,
            Function::Tz => Self::Tz,
            Function::Now => Self::Now,
            Function::Uuid => Self::Uuid,
            Function::StrUuid => Self::StrUuid,
            Function::Md5 => Self::Md5,
            Function::Sha1 => Self::Sha1,
            Function::Sha256 => Self::Sha256,
            Function::Sha384 => Self::Sha384,
            Function::Sha512 => Self::Sha512,
            Function::StrLang => Self::StrLang,
            Function::StrDt => Self::StrDt,
            Function::IsIri => Self::IsIri,
            Function::IsBlank => Self::IsBlank,
            Function::IsLiteral => Self::IsLiteral,
            Function::IsNumeric => Self::IsNumeric,
            Function::Regex => Self::Regex,
            Function::Custom(name) => return Self::from_cast(name.as_ref()),
        })
    }

    /// Maps the IRI of an XSD constructor function to its cast.
    pub fn from_cast(name: NamedNodeRef<'_>) -> Option<Self> {
        Some(match name {
            xsd::STRING => Self::CastString,
            xsd::BOOLEAN => Self::CastBoolean,
            xsd::INTEGER => Self::CastInteger,
            xsd::INT => Self::CastInt,
            xsd::DECIMAL => Self::CastDecimal,
            xsd::FLOAT => Self::CastFloat,
            xsd::DOUBLE => Self::CastDouble,
            xsd::DATE_TIME => Self::CastDateTime,
            _ => return None,
        })
    }

    /// Returns true iff the function can be called with `count` arguments.
    pub fn accepts_arity(self, count: usize) -> bool {
        match self {
            Self::Rand | Self::Now | Self::Uuid | Self::StrUuid => count == 0,
            Self::BNode => count <= 1,
            Self::Concat => true,
            Self::StrDt
            | Self::StrLang
            | Self::StrStarts
            | Self::StrEnds
            | Self::Contains
            | Self::StrBefore
            | Self::StrAfter
            | Self::LangMatches => count == 2,
            Self::SubStr | Self::Regex => count == 2 || count == 3,
            Self::Replace => count == 3 || count == 4,
            _ => count == 1,
        }
    }

    /// Returns true iff the function may return a different result for the same arguments.
    pub fn is_volatile(self) -> bool {
        matches!(self, Self::Rand | Self::Uuid | Self::StrUuid | Self::BNode)
    }
}

impl Display for BuiltinName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Str => "STR",
            Self::Lang => "LANG",
            Self::Datatype => "DATATYPE",
            Self::Iri => "IRI",
            Self::BNode => "BNODE",
            Self::StrDt => "STRDT",
            Self::StrLang => "STRLANG",
            Self::IsIri => "isIRI",
            Self::IsBlank => "isBLANK",
            Self::IsLiteral => "isLITERAL",
            Self::IsNumeric => "isNUMERIC",
            Self::Uuid => "UUID",
            Self::StrUuid => "STRUUID",
            Self::StrLen => "STRLEN",
            Self::SubStr => "SUBSTR",
            Self::UCase => "UCASE",
            Self::LCase => "LCASE",
            Self::StrStarts => "STRSTARTS",
            Self::StrEnds => "STRENDS",
            Self::Contains => "CONTAINS",
            Self::StrBefore => "STRBEFORE",
            Self::StrAfter => "STRAFTER",
            Self::EncodeForUri => "ENCODE_FOR_URI",
            Self::Concat => "CONCAT",
            Self::LangMatches => "LANGMATCHES",
            Self::Regex => "REGEX",
            Self::Replace => "REPLACE",
            Self::Abs => "ABS",
            Self::Round => "ROUND",
            Self::Ceil => "CEIL",
            Self::Floor => "FLOOR",
            Self::Rand => "RAND",
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::Hours => "HOURS",
            Self::Minutes => "MINUTES",
            Self::Seconds => "SECONDS",
            Self::Timezone => "TIMEZONE",
            Self::Tz => "TZ",
            Self::Now => "NOW",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
            Self::CastString => "xsd:string",
            Self::CastBoolean => "xsd:boolean",
            Self::CastInteger => "xsd:integer",
            Self::CastInt => "xsd:int",
            Self::CastDecimal => "xsd:decimal",
            Self::CastFloat => "xsd:float",
            Self::CastDouble => "xsd:double",
            Self::CastDateTime => "xsd:dateTime",
        };
        f.write_str(name)
    }
}
