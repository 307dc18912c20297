use crate::{Literal, LiteralRef, NamedNodeRef, ThinError, ThinResult};
use oxrdf::vocab::xsd;
use oxsdatatypes::{Decimal, Double, Float};
use std::cmp::Ordering;
use std::str::FromStr;

/// A numeric value of one of the XSD numeric types supported in SPARQL arithmetic.
///
/// All types derived from `xsd:integer` are represented as [Numeric::Integer].
#[derive(Copy, Clone, Debug)]
pub enum Numeric {
    Integer(i64),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
}

impl Numeric {
    /// Parses the numeric value of a literal. Fails for non-numeric or ill-formed literals.
    pub fn from_literal(literal: LiteralRef<'_>) -> ThinResult<Self> {
        let datatype = literal.datatype();
        let value = literal.value();
        if datatype == xsd::DOUBLE {
            Ok(Numeric::Double(f64::from(Double::from_str(value)?)))
        } else if datatype == xsd::FLOAT {
            Ok(Numeric::Float(f32::from(Float::from_str(value)?)))
        } else if datatype == xsd::DECIMAL {
            Ok(Numeric::Decimal(Decimal::from_str(value)?))
        } else if is_integer_datatype(datatype) {
            Ok(Numeric::Integer(value.trim_start_matches('+').parse()?))
        } else {
            ThinError::expected()
        }
    }

    /// Returns the literal representation of this value.
    pub fn into_literal(self) -> Literal {
        match self {
            Numeric::Integer(value) => Literal::from(value),
            Numeric::Decimal(value) => Literal::new_typed_literal(value.to_string(), xsd::DECIMAL),
            Numeric::Float(value) => {
                Literal::new_typed_literal(Float::from(value).to_string(), xsd::FLOAT)
            }
            Numeric::Double(value) => {
                Literal::new_typed_literal(Double::from(value).to_string(), xsd::DOUBLE)
            }
        }
    }

    #[allow(clippy::cast_precision_loss, reason = "Casting to double is lossy by definition")]
    pub fn to_f64(self) -> f64 {
        match self {
            Numeric::Integer(value) => value as f64,
            Numeric::Decimal(value) => Double::from(value).into(),
            Numeric::Float(value) => f64::from(value),
            Numeric::Double(value) => value,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Numeric::Integer(value) => value == 0,
            Numeric::Decimal(value) => value == Decimal::from(0),
            Numeric::Float(value) => value == 0.0,
            Numeric::Double(value) => value == 0.0,
        }
    }

    pub fn is_nan(self) -> bool {
        match self {
            Numeric::Float(value) => value.is_nan(),
            Numeric::Double(value) => value.is_nan(),
            Numeric::Integer(_) | Numeric::Decimal(_) => false,
        }
    }

    pub fn checked_add(self, rhs: Self) -> ThinResult<Self> {
        match NumericPair::with_casts_from(self, rhs) {
            NumericPair::Integer(lhs, rhs) => lhs.checked_add(rhs).map(Numeric::Integer),
            NumericPair::Decimal(lhs, rhs) => lhs.checked_add(rhs).map(Numeric::Decimal),
            NumericPair::Float(lhs, rhs) => Some(Numeric::Float(lhs + rhs)),
            NumericPair::Double(lhs, rhs) => Some(Numeric::Double(lhs + rhs)),
        }
        .ok_or(ThinError::default())
    }

    pub fn checked_sub(self, rhs: Self) -> ThinResult<Self> {
        match NumericPair::with_casts_from(self, rhs) {
            NumericPair::Integer(lhs, rhs) => lhs.checked_sub(rhs).map(Numeric::Integer),
            NumericPair::Decimal(lhs, rhs) => lhs.checked_sub(rhs).map(Numeric::Decimal),
            NumericPair::Float(lhs, rhs) => Some(Numeric::Float(lhs - rhs)),
            NumericPair::Double(lhs, rhs) => Some(Numeric::Double(lhs - rhs)),
        }
        .ok_or(ThinError::default())
    }

    pub fn checked_mul(self, rhs: Self) -> ThinResult<Self> {
        match NumericPair::with_casts_from(self, rhs) {
            NumericPair::Integer(lhs, rhs) => lhs.checked_mul(rhs).map(Numeric::Integer),
            NumericPair::Decimal(lhs, rhs) => lhs.checked_mul(rhs).map(Numeric::Decimal),
            NumericPair::Float(lhs, rhs) => Some(Numeric::Float(lhs * rhs)),
            NumericPair::Double(lhs, rhs) => Some(Numeric::Double(lhs * rhs)),
        }
        .ok_or(ThinError::default())
    }

    /// Divides two numerics. The division of two integers yields a decimal.
    pub fn checked_div(self, rhs: Self) -> ThinResult<Self> {
        match NumericPair::with_casts_from(self, rhs) {
            NumericPair::Integer(lhs, rhs) => Decimal::from(lhs)
                .checked_div(Decimal::from(rhs))
                .map(Numeric::Decimal),
            NumericPair::Decimal(lhs, rhs) => lhs.checked_div(rhs).map(Numeric::Decimal),
            NumericPair::Float(lhs, rhs) => Some(Numeric::Float(lhs / rhs)),
            NumericPair::Double(lhs, rhs) => Some(Numeric::Double(lhs / rhs)),
        }
        .ok_or(ThinError::default())
    }

    pub fn checked_neg(self) -> ThinResult<Self> {
        match self {
            Numeric::Integer(value) => value.checked_neg().map(Numeric::Integer),
            Numeric::Decimal(value) => value.checked_neg().map(Numeric::Decimal),
            Numeric::Float(value) => Some(Numeric::Float(-value)),
            Numeric::Double(value) => Some(Numeric::Double(-value)),
        }
        .ok_or(ThinError::default())
    }

    pub fn checked_abs(self) -> ThinResult<Self> {
        match self {
            Numeric::Integer(value) => value.checked_abs().map(Numeric::Integer),
            Numeric::Decimal(value) => value.checked_abs().map(Numeric::Decimal),
            Numeric::Float(value) => Some(Numeric::Float(value.abs())),
            Numeric::Double(value) => Some(Numeric::Double(value.abs())),
        }
        .ok_or(ThinError::default())
    }

    pub fn checked_round(self) -> ThinResult<Self> {
        match self {
            Numeric::Integer(value) => Some(Numeric::Integer(value)),
            Numeric::Decimal(value) => value.checked_round().map(Numeric::Decimal),
            Numeric::Float(value) => Some(Numeric::Float((value + 0.5).floor())),
            Numeric::Double(value) => Some(Numeric::Double((value + 0.5).floor())),
        }
        .ok_or(ThinError::default())
    }

    pub fn checked_ceil(self) -> ThinResult<Self> {
        match self {
            Numeric::Integer(value) => Some(Numeric::Integer(value)),
            Numeric::Decimal(value) => value.checked_ceil().map(Numeric::Decimal),
            Numeric::Float(value) => Some(Numeric::Float(value.ceil())),
            Numeric::Double(value) => Some(Numeric::Double(value.ceil())),
        }
        .ok_or(ThinError::default())
    }

    pub fn checked_floor(self) -> ThinResult<Self> {
        match self {
            Numeric::Integer(value) => Some(Numeric::Integer(value)),
            Numeric::Decimal(value) => value.checked_floor().map(Numeric::Decimal),
            Numeric::Float(value) => Some(Numeric::Float(value.floor())),
            Numeric::Double(value) => Some(Numeric::Double(value.floor())),
        }
        .ok_or(ThinError::default())
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match NumericPair::with_casts_from(*self, *other) {
            NumericPair::Integer(lhs, rhs) => Some(lhs.cmp(&rhs)),
            NumericPair::Decimal(lhs, rhs) => Some(lhs.cmp(&rhs)),
            NumericPair::Float(lhs, rhs) => lhs.partial_cmp(&rhs),
            NumericPair::Double(lhs, rhs) => lhs.partial_cmp(&rhs),
        }
    }
}

/// Two numerics promoted to their common type.
///
/// The promotion follows the XSD type hierarchy: integer < decimal < float < double.
pub enum NumericPair {
    Integer(i64, i64),
    Decimal(Decimal, Decimal),
    Float(f32, f32),
    Double(f64, f64),
}

impl NumericPair {
    pub fn with_casts_from(lhs: Numeric, rhs: Numeric) -> NumericPair {
        match (lhs, rhs) {
            (Numeric::Integer(lhs), Numeric::Integer(rhs)) => NumericPair::Integer(lhs, rhs),
            (Numeric::Integer(lhs), Numeric::Decimal(rhs)) => {
                NumericPair::Decimal(Decimal::from(lhs), rhs)
            }
            (Numeric::Decimal(lhs), Numeric::Integer(rhs)) => {
                NumericPair::Decimal(lhs, Decimal::from(rhs))
            }
            (Numeric::Decimal(lhs), Numeric::Decimal(rhs)) => NumericPair::Decimal(lhs, rhs),

            (Numeric::Float(lhs), Numeric::Float(rhs)) => NumericPair::Float(lhs, rhs),
            (lhs @ (Numeric::Integer(_) | Numeric::Decimal(_)), Numeric::Float(rhs)) => {
                NumericPair::Float(lhs.to_f32(), rhs)
            }
            (Numeric::Float(lhs), rhs @ (Numeric::Integer(_) | Numeric::Decimal(_))) => {
                NumericPair::Float(lhs, rhs.to_f32())
            }

            (lhs, Numeric::Double(rhs)) => NumericPair::Double(lhs.to_f64(), rhs),
            (Numeric::Double(lhs), rhs) => NumericPair::Double(lhs, rhs.to_f64()),
        }
    }
}

impl Numeric {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        reason = "Casting to float is lossy by definition"
    )]
    fn to_f32(self) -> f32 {
        match self {
            Numeric::Integer(value) => value as f32,
            Numeric::Decimal(value) => Float::from(value).into(),
            Numeric::Float(value) => value,
            Numeric::Double(value) => value as f32,
        }
    }
}

/// Checks if the datatype is `xsd:integer` or one of the types derived from it.
pub fn is_integer_datatype(datatype: NamedNodeRef<'_>) -> bool {
    static INTEGER_DATATYPES: &[NamedNodeRef<'_>; 13] = &[
        xsd::INTEGER,
        xsd::BYTE,
        xsd::SHORT,
        xsd::INT,
        xsd::LONG,
        xsd::UNSIGNED_BYTE,
        xsd::UNSIGNED_SHORT,
        xsd::UNSIGNED_INT,
        xsd::UNSIGNED_LONG,
        xsd::POSITIVE_INTEGER,
        xsd::NEGATIVE_INTEGER,
        xsd::NON_POSITIVE_INTEGER,
        xsd::NON_NEGATIVE_INTEGER,
    ];
    INTEGER_DATATYPES.contains(&datatype)
}

/// Checks if the datatype is a numeric datatype.
pub fn is_numeric_datatype(datatype: NamedNodeRef<'_>) -> bool {
    datatype == xsd::DECIMAL
        || datatype == xsd::FLOAT
        || datatype == xsd::DOUBLE
        || is_integer_datatype(datatype)
}
