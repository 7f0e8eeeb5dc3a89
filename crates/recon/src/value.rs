//! Field values.
//!
//! A value is either present (text, integer, decimal, date) or
//! [`Value::Missing`]. Missing is its own variant: it is never zero, never the
//! empty string and never false. Arithmetic exists only for present numeric
//! operands, through [`Number`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Value {
    Missing,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Date(_) => "date",
        }
    }

    /// The numeric view of a present integer or decimal.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Integer(i) => Some(Number::Integer(*i)),
            Self::Decimal(d) => Some(Number::Decimal(*d)),
            _ => None,
        }
    }

    /// Infer a typed value from a raw cell.
    ///
    /// Order: integer, decimal (financial formats allowed), ISO date, text.
    /// Digit strings with a leading zero ("00123") stay text so identifiers
    /// such as barcodes keep their exact spelling, and so do digit strings
    /// too long for an `i64`.
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        if has_significant_leading_zero(trimmed) {
            return Value::Text(raw.to_string());
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        if is_plain_digits(trimmed) {
            return Value::Text(raw.to_string());
        }
        if let Some(d) = parse_financial_number(trimmed) {
            return Value::Decimal(d);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Value::Date(date);
        }
        Value::Text(raw.to_string())
    }

    /// Rank of the variant in the total order: missing first, then numbers,
    /// dates, text.
    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Integer(_) => 1,
            Self::Decimal(_) => 2,
            Self::Date(_) => 3,
            Self::Text(_) => 4,
        }
    }
}

fn has_significant_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.len() > 1 && digits.starts_with('0') && !digits[1..].starts_with('.')
}

/// Optionally signed run of ASCII digits, with no decimal point or
/// currency formatting.
fn is_plain_digits(s: &str) -> bool {
    let digits = s.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// -0.0 and 0.0 compare and hash the same; every NaN is one value.
fn canonical_bits(d: f64) -> u64 {
    if d == 0.0 {
        0.0f64.to_bits()
    } else if d.is_nan() {
        f64::NAN.to_bits()
    } else {
        d.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Missing => {}
            Self::Text(s) => s.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Decimal(d) => canonical_bits(*d).hash(state),
            Self::Date(d) => d.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Decimal(a), Self::Decimal(b)) => {
                f64::from_bits(canonical_bits(*a)).total_cmp(&f64::from_bits(canonical_bits(*b)))
            }
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Text(s) => write!(f, "{s}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Missing => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Decimal(d) => serializer.serialize_f64(*d),
            Self::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

// ---------------------------------------------------------------------------
// Number
// ---------------------------------------------------------------------------

/// A present numeric value. Differences and sums are computed in this type.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(i) => i as f64,
            Self::Decimal(d) => d,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Self::Integer(i) => i == 0,
            Self::Decimal(d) => d == 0.0,
        }
    }

    pub fn abs(self) -> Number {
        match self {
            Self::Integer(i) => i
                .checked_abs()
                .map(Number::Integer)
                .unwrap_or(Number::Decimal((i as f64).abs())),
            Self::Decimal(d) => Number::Decimal(d.abs()),
        }
    }

    /// `|self| <= tolerance`; a zero tolerance means exact equality with zero.
    pub fn within(self, tolerance: f64) -> bool {
        if tolerance <= 0.0 {
            return self.is_zero();
        }
        // Epsilon-inclusive so a human-decimal boundary like 0.01 survives
        // IEEE-754 representation.
        let delta = self.as_f64().abs();
        let eps = f64::EPSILON * 16.0 * 1.0_f64.max(delta).max(tolerance);
        delta <= tolerance + eps
    }

    /// Numeric order regardless of representation, so `Integer(10)` sorts
    /// above `Decimal(2.5)`.
    pub fn cmp_value(self, other: Number) -> Ordering {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.cmp(&b),
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
            }
        }
    }

    /// Integer arithmetic stays integer until it overflows.
    pub fn add(self, other: Number) -> Number {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a
                .checked_add(b)
                .map(Number::Integer)
                .unwrap_or(Number::Decimal(a as f64 + b as f64)),
            (a, b) => Number::Decimal(a.as_f64() + b.as_f64()),
        }
    }

    pub fn sub(self, other: Number) -> Number {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a
                .checked_sub(b)
                .map(Number::Integer)
                .unwrap_or(Number::Decimal(a as f64 - b as f64)),
            (a, b) => Number::Decimal(a.as_f64() - b.as_f64()),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(i) => Value::Integer(i),
            Number::Decimal(d) => Value::Decimal(d),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Decimal(d) => serializer.serialize_f64(*d),
        }
    }
}

/// Sum of an iterator of numbers; `None` when the iterator is empty.
pub fn sum_present(values: impl IntoIterator<Item = Number>) -> Option<Number> {
    values.into_iter().fold(None, |acc, n| match acc {
        None => Some(n),
        Some(total) => Some(total.add(n)),
    })
}

// ---------------------------------------------------------------------------
// Column types
// ---------------------------------------------------------------------------

/// Declared type of an input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Date,
}

impl ColumnType {
    /// Strict parse of a non-null cell. `None` means the cell does not hold
    /// this type.
    pub fn parse(self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            Self::Text => Some(Value::Text(raw.to_string())),
            Self::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
            Self::Decimal => parse_financial_number(trimmed).map(Value::Decimal),
            Self::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok().map(Value::Date),
        }
    }
}

/// Parse a financial number string:
/// - Strip `$`, commas, whitespace
/// - Handle `(123.45)` → `-123.45`
/// - Returns None if non-numeric characters remain after stripping
pub fn parse_financial_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    Some(if is_negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_is_not_zero_or_empty() {
        assert_ne!(Value::Missing, Value::Integer(0));
        assert_ne!(Value::Missing, Value::Text(String::new()));
        assert_ne!(Value::Missing, Value::Decimal(0.0));
        assert_eq!(Value::Missing, Value::Missing);
    }

    #[test]
    fn infer_types() {
        assert_eq!(Value::infer("42"), Value::Integer(42));
        assert_eq!(Value::infer("-7"), Value::Integer(-7));
        assert_eq!(Value::infer("12.50"), Value::Decimal(12.5));
        assert_eq!(Value::infer("$1,234.50"), Value::Decimal(1234.5));
        assert_eq!(Value::infer("(10.00)"), Value::Decimal(-10.0));
        assert_eq!(
            Value::infer("2026-01-15"),
            Value::Date(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
        );
        assert_eq!(Value::infer("abc"), Value::Text("abc".into()));
    }

    #[test]
    fn leading_zero_identifiers_stay_text() {
        assert_eq!(Value::infer("00123"), Value::Text("00123".into()));
        assert_eq!(Value::infer("0"), Value::Integer(0));
        assert_eq!(Value::infer("0.5"), Value::Decimal(0.5));
    }

    #[test]
    fn oversized_digit_strings_stay_text() {
        assert_eq!(
            Value::infer("12345678901234567890"),
            Value::Text("12345678901234567890".into())
        );
        assert_ne!(Value::infer("12345678901234567890"), Value::infer("12345678901234567891"));
        assert_eq!(Value::infer("-99999999999999999999"), Value::Text("-99999999999999999999".into()));
        assert_eq!(Value::infer("9223372036854775807"), Value::Integer(i64::MAX));
        assert_eq!(Value::infer("12345678901234567890.5"), Value::Decimal(12345678901234567890.5));
        assert_eq!(Value::infer("$12,345"), Value::Decimal(12345.0));
    }

    #[test]
    fn numbers_order_by_magnitude_across_representations() {
        assert_eq!(Number::Integer(10).cmp_value(Number::Decimal(2.5)), Ordering::Greater);
        assert_eq!(Number::Decimal(-1.5).cmp_value(Number::Integer(-1)), Ordering::Less);
        assert_eq!(Number::Integer(2).cmp_value(Number::Decimal(2.0)), Ordering::Equal);
        assert_eq!(Number::Integer(i64::MAX).cmp_value(Number::Integer(i64::MAX - 1)), Ordering::Greater);
    }

    #[test]
    fn integer_and_decimal_are_distinct_keys() {
        assert_ne!(Value::Integer(1), Value::Decimal(1.0));
        assert_eq!(Value::Decimal(0.0), Value::Decimal(-0.0));
    }

    #[test]
    fn total_order_ranks_missing_first() {
        let mut values = vec![
            Value::Text("a".into()),
            Value::Integer(3),
            Value::Missing,
            Value::Integer(1),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![Value::Missing, Value::Integer(1), Value::Integer(3), Value::Text("a".into())]
        );
    }

    #[test]
    fn number_arithmetic() {
        assert_eq!(Number::Integer(10).sub(Number::Integer(7)), Number::Integer(3));
        assert_eq!(Number::Integer(1).sub(Number::Decimal(0.5)), Number::Decimal(0.5));
        assert_eq!(
            Number::Integer(i64::MAX).add(Number::Integer(1)),
            Number::Decimal(i64::MAX as f64 + 1.0)
        );
        assert!(matches!(Number::Integer(i64::MIN).abs(), Number::Decimal(_)));
    }

    #[test]
    fn within_tolerance() {
        assert!(Number::Integer(0).within(0.0));
        assert!(!Number::Integer(1).within(0.0));
        assert!(Number::Decimal(0.1 + 0.2 - 0.3).within(0.01));
        assert!(Number::Decimal(-0.01).within(0.01));
        assert!(!Number::Decimal(0.02).within(0.01));
    }

    #[test]
    fn sum_present_empty_is_none() {
        assert_eq!(sum_present(Vec::new()), None);
        assert_eq!(
            sum_present(vec![Number::Integer(2), Number::Integer(-5)]),
            Some(Number::Integer(-3))
        );
    }

    #[test]
    fn column_type_parse_is_strict() {
        assert_eq!(ColumnType::Integer.parse("12"), Some(Value::Integer(12)));
        assert_eq!(ColumnType::Integer.parse("12.5"), None);
        assert_eq!(ColumnType::Text.parse("00123"), Some(Value::Text("00123".into())));
        assert_eq!(ColumnType::Date.parse("15/01/2026"), None);
    }

    #[test]
    fn test_parse_financial_number_non_numeric() {
        assert_eq!(parse_financial_number("abc"), None);
        assert_eq!(parse_financial_number("12abc34"), None);
        assert_eq!(parse_financial_number("N/A"), None);
        assert_eq!(parse_financial_number("$"), None);
    }
}
