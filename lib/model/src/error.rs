use oxiri::IriParseError;
use oxrdf::BlankNodeIdParseError;
use oxsdatatypes::{ParseDecimalError, TooLargeForDecimalError};
use std::num::{ParseFloatError, ParseIntError, TryFromIntError};
use std::str::ParseBoolError;
use thiserror::Error;

/// The result of evaluating a SPARQL expression or aggregate.
pub type ThinResult<T> = Result<T, ThinError>;

/// Marks an expression that has no value, e.g., `1 + "a"` or a function applied to an unbound
/// variable.
///
/// Such failures do not abort the query. `BIND` leaves its variable unbound, `FILTER` drops the
/// solution, and aggregates skip the value. Because all of them are handled the same way, the
/// error carries no payload.
#[derive(Clone, Copy, Debug, Default, Error, PartialEq, Eq, Hash)]
#[error("expression has no value")]
pub struct ThinError;

impl ThinError {
    pub fn expected<T>() -> ThinResult<T> {
        Err(ThinError)
    }
}

/// Lexical and range errors of the underlying parsers all collapse into a [ThinError].
macro_rules! collapse_into_thin_error {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for ThinError {
                fn from(_: $error) -> Self {
                    ThinError
                }
            }
        )*
    };
}

collapse_into_thin_error!(
    BlankNodeIdParseError,
    IriParseError,
    ParseBoolError,
    ParseDecimalError,
    ParseFloatError,
    ParseIntError,
    TooLargeForDecimalError,
    TryFromIntError,
);
