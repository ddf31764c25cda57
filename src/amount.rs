use serde::Serialize;
use thiserror::Error;

use std::fmt;
use std::ops::{Add, Neg};

/// Absolute tolerance for monetary comparisons. Amounts are never compared
/// with exact float equality.
pub const COMPARISON_EPSILON: f64 = 1e-6;

/// A single signed monetary value, displayed at two decimal places.
///
/// Immutable: every operation returns a new value. The only arithmetic is
/// addition and negation.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Amount(f64);

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,
    #[error("input `{0}' is not a numeric amount")]
    Invalid(String),
}

impl Amount {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.abs() < COMPARISON_EPSILON
    }

    pub fn sign(&self) -> i8 {
        if self.0 > COMPARISON_EPSILON {
            1
        } else if self.0 < -COMPARISON_EPSILON {
            -1
        } else {
            0
        }
    }

    /// Parse an amount from journal text.
    ///
    /// A value fully wrapped in parentheses is negated. Currency glyphs and
    /// interior whitespace are stripped. A comma next to a decimal point is
    /// a thousands separator and dropped; with no point present, a comma is
    /// the decimal point.
    pub fn parse(input: &str) -> Result<Self, ParseAmountError> {
        let mut token = input.trim();
        let mut negated = false;

        if token.len() >= 3 && token.starts_with('(') && token.ends_with(')') {
            negated = true;
            token = &token[1..token.len() - 1];
        }

        let stripped: String = token
            .chars()
            .filter(|c| !matches!(c, '$' | '€' | '£' | '¥') && !c.is_whitespace())
            .collect();
        if stripped.is_empty() {
            return Err(ParseAmountError::Empty);
        }

        let normalized = if stripped.contains('.') {
            stripped.replace(',', "")
        } else {
            stripped.replace(',', ".")
        };

        let value: f64 = normalized
            .parse()
            .map_err(|_| ParseAmountError::Invalid(input.trim().to_string()))?;
        if !value.is_finite() {
            return Err(ParseAmountError::Invalid(input.trim().to_string()));
        }

        Ok(Self(if negated { -value } else { value }))
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        (self.0 - other.0).abs() < COMPARISON_EPSILON
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keep epsilon-zero from rendering as "-0.00"
        let value = if self.is_zero() { 0.0 } else { self.0 };
        write!(f, "{:.2}", value)
    }
}
