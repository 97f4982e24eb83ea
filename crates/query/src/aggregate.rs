//! Aggregation stage.
//!
//! Numeric operators work on [`Decimal`] so sums and averages of values like
//! `"0.1"` stay exact. `STDEV` and `VAR` are sample statistics (n - 1).
//!
//! A [`Decimal`] carries at most 28 fractional digits. Inputs with more are
//! rounded on the way in, and so are intermediate results: the variance of
//! values around `1e-28` rounds to zero, so their `STDEV` is `0`. Numbers
//! beyond the decimal range (about `7.9e28`) are arithmetic errors.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, MathematicalOps};
use serde_json::Value;

use crate::error::QueryError;

/// Aggregation operator of a query row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Empty token: the extracted value is the result.
    Identity,
    Count,
    Avg,
    Max,
    Med,
    Min,
    Stdev,
    Sum,
    Var,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Identity => "",
            Aggregation::Count => "COUNT",
            Aggregation::Avg => "AVG",
            Aggregation::Max => "MAX",
            Aggregation::Med => "MED",
            Aggregation::Min => "MIN",
            Aggregation::Stdev => "STDEV",
            Aggregation::Sum => "SUM",
            Aggregation::Var => "VAR",
        }
    }
}

impl FromStr for Aggregation {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" => Ok(Aggregation::Identity),
            "COUNT" => Ok(Aggregation::Count),
            "AVG" => Ok(Aggregation::Avg),
            "MAX" => Ok(Aggregation::Max),
            "MED" => Ok(Aggregation::Med),
            "MIN" => Ok(Aggregation::Min),
            "STDEV" => Ok(Aggregation::Stdev),
            "SUM" => Ok(Aggregation::Sum),
            "VAR" => Ok(Aggregation::Var),
            _ => Err(QueryError::AggregationInvalidOperator(s.to_string())),
        }
    }
}

/// Output of the aggregation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregated {
    /// Identity aggregation: the extracted JSON value.
    Json(Value),
    Count(usize),
    Number(Decimal),
}

impl Aggregated {
    /// Element count when the result is a sequence, -1 otherwise.
    pub fn length(&self) -> i64 {
        match self {
            Aggregated::Json(Value::Array(items)) => items.len() as i64,
            _ => -1,
        }
    }
}

impl fmt::Display for Aggregated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregated::Json(value) => write!(f, "{value}"),
            Aggregated::Count(n) => write!(f, "{n}"),
            Aggregated::Number(d) => write!(f, "{d}"),
        }
    }
}

/// Apply `op` to the extracted value.
pub fn aggregate(op: Aggregation, value: Value) -> Result<Aggregated, QueryError> {
    let statistic = match op {
        Aggregation::Identity => return Ok(Aggregated::Json(value)),
        Aggregation::Count => return sequence(op, value).map(|items| Aggregated::Count(items.len())),
        Aggregation::Sum => Statistic::Sum,
        Aggregation::Avg => Statistic::Avg,
        Aggregation::Max => Statistic::Max,
        Aggregation::Min => Statistic::Min,
        Aggregation::Med => Statistic::Med,
        Aggregation::Var => Statistic::Var,
        Aggregation::Stdev => Statistic::Stdev,
    };

    let numbers = sequence(op, value)?
        .iter()
        .map(|item| match to_numeric(item) {
            Numeric::Value(d) => Ok(d),
            Numeric::OutOfRange => Err(overflow(op.as_str())),
            Numeric::NotNumeric => Err(QueryError::AggregationWrongDatatype(format!(
                "{} expects numeric values, got {}",
                op.as_str(),
                item
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let result = match statistic {
        Statistic::Sum => sum(&numbers)?,
        Statistic::Avg => mean(&numbers)?.normalize(),
        Statistic::Max => numbers.iter().max().copied().ok_or_else(|| empty("MAX"))?,
        Statistic::Min => numbers.iter().min().copied().ok_or_else(|| empty("MIN"))?,
        Statistic::Med => median(numbers)?.normalize(),
        Statistic::Var => variance(&numbers)?.normalize(),
        Statistic::Stdev => variance(&numbers)?
            .sqrt()
            .ok_or_else(|| overflow("STDEV"))?
            .normalize(),
    };

    Ok(Aggregated::Number(result))
}

/// Operators that reduce a sequence of numbers.
#[derive(Clone, Copy)]
enum Statistic {
    Sum,
    Avg,
    Max,
    Min,
    Med,
    Var,
    Stdev,
}

fn sequence(op: Aggregation, value: Value) -> Result<Vec<Value>, QueryError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(QueryError::AggregationWrongDatatype(format!(
            "{} expects a sequence, got {}",
            op.as_str(),
            type_name(&other)
        ))),
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Numeric reading of one sequence element.
#[derive(Debug, PartialEq)]
enum Numeric {
    Value(Decimal),
    /// A number, but larger than the decimal range.
    OutOfRange,
    NotNumeric,
}

/// Exact decimal value of a JSON number or a numeric string.
fn to_numeric(value: &Value) -> Numeric {
    match value {
        Value::Number(n) => parse_numeric(&n.to_string()),
        Value::String(s) => parse_numeric(s.trim()),
        _ => Numeric::NotNumeric,
    }
}

fn parse_numeric(s: &str) -> Numeric {
    if s.is_empty() || s.contains('_') {
        return Numeric::NotNumeric;
    }
    if let Some(d) = Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
    {
        return Numeric::Value(d);
    }
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() && x.abs() < 1.0 => {
            round_to_precision(s, x).map_or(Numeric::OutOfRange, Numeric::Value)
        }
        Ok(x) if x.is_finite() => Numeric::OutOfRange,
        _ => Numeric::NotNumeric,
    }
}

/// A magnitude below one with more fractional digits than a [`Decimal`]
/// holds, rounded to 28 decimal places.
fn round_to_precision(s: &str, x: f64) -> Option<Decimal> {
    let scientific = if s.contains(['e', 'E']) {
        s.to_string()
    } else {
        format!("{x:e}")
    };
    let (mantissa, exponent) = scientific.split_once(['e', 'E'])?;
    let exponent: i32 = exponent.parse().ok()?;
    if exponent >= 0 {
        return None;
    }

    let mut d = Decimal::from_str(mantissa).ok()?;
    for _ in 0..exponent.unsigned_abs() {
        if d.is_zero() {
            break;
        }
        d = d.checked_div(Decimal::TEN)?;
    }
    Some(d.normalize())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

fn empty(op: &str) -> QueryError {
    QueryError::AggregationArithmetic(format!("{op} requires at least one data point"))
}

fn overflow(op: &str) -> QueryError {
    QueryError::AggregationArithmetic(format!("{op} overflowed the decimal range"))
}

fn sum(numbers: &[Decimal]) -> Result<Decimal, QueryError> {
    numbers
        .iter()
        .try_fold(Decimal::ZERO, |acc, x| acc.checked_add(*x))
        .ok_or_else(|| overflow("SUM"))
}

fn mean(numbers: &[Decimal]) -> Result<Decimal, QueryError> {
    if numbers.is_empty() {
        return Err(empty("AVG"));
    }
    sum(numbers)?
        .checked_div(Decimal::from(numbers.len()))
        .ok_or_else(|| overflow("AVG"))
}

fn median(mut numbers: Vec<Decimal>) -> Result<Decimal, QueryError> {
    if numbers.is_empty() {
        return Err(empty("MED"));
    }
    numbers.sort();
    let mid = numbers.len() / 2;
    if numbers.len() % 2 == 1 {
        return Ok(numbers[mid]);
    }
    numbers[mid - 1]
        .checked_add(numbers[mid])
        .and_then(|s| s.checked_div(Decimal::TWO))
        .ok_or_else(|| overflow("MED"))
}

/// Sample variance. Undefined below two data points.
fn variance(numbers: &[Decimal]) -> Result<Decimal, QueryError> {
    if numbers.len() < 2 {
        return Err(QueryError::AggregationArithmetic(format!(
            "variance requires at least two data points, got {}",
            numbers.len()
        )));
    }
    let m = mean(numbers)?;
    let squares = numbers
        .iter()
        .try_fold(Decimal::ZERO, |acc, x| {
            let d = x.checked_sub(m)?;
            acc.checked_add(d.checked_mul(d)?)
        })
        .ok_or_else(|| overflow("VAR"))?;
    squares
        .checked_div(Decimal::from(numbers.len() - 1))
        .ok_or_else(|| overflow("VAR"))
}
