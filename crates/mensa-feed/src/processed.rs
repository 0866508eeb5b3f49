use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::raw::{RawRow, RawRowError};

/// All meals of one ISO week, in the order the feed lists them.
pub type WeeklyFeed = Vec<MealEntry>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedParseError {
    #[error("invalid date '{value}' in line {line}")]
    InvalidDate { line: usize, value: String },
}

/// Parses a decoded feed body. The first line is the header.
///
/// Lines with too few fields are skipped with a warning; a date that does
/// not parse fails the whole feed. Prices never do, see [`Price::parse`].
pub fn parse_feed(text: &str) -> Result<WeeklyFeed, FeedParseError> {
    let mut entries = Vec::new();

    for (i, line) in text.lines().enumerate().skip(1) {
        let line_no = i + 1;
        if line.trim().is_empty() { continue; }

        let row = match RawRow::split(line) {
            Ok(row) => row,
            Err(RawRowError::TooFewFields { found }) => {
                tracing::warn!("skipping line {line_no}, only {found} fields: '{line}'");
                continue;
            },
        };

        entries.push(MealEntry::try_from(&row).map_err(|InvalidDate(value)| {
            FeedParseError::InvalidDate { line: line_no, value }
        })?);
    }

    Ok(entries)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub date: NaiveDate,
    /// weekday as written in the feed
    pub day: String,
    pub category: String,
    pub name: String,
    pub labels: Vec<String>,
    pub price: MealPrice,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date: '{0}'")]
pub struct InvalidDate(pub String);

impl<'a> TryFrom<&RawRow<'a>> for MealEntry {
    type Error = InvalidDate;

    fn try_from(row: &RawRow<'a>) -> Result<Self, Self::Error> {
        // chrono can not read DD.MM.YYYY reliably, go through the iso form
        let date = row.iso_date()
            .and_then(|iso| NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok())
            .ok_or_else(|| InvalidDate(row.datum.to_string()))?;

        let (name, labels) = split_name_labels(row.name);

        Ok(Self {
            date,
            day: row.tag.trim().to_string(),
            category: row.warengruppe.trim().to_string(),
            name,
            labels,
            price: MealPrice {
                stud: Price::parse(row.stud),
                bed: Price::parse(row.bed),
                gast: Price::parse(row.gast),
            },
        })
    }
}

/// Splits `Erbsensuppe (1,2,Gf)` into the name and its label codes.
/// The group runs from the first `(` to the last `)`.
pub fn split_name_labels(raw: &str) -> (String, Vec<String>) {
    let group = raw.find('(')
        .zip(raw.rfind(')'))
        .filter(|(open, close)| open < close);

    let Some((open, close)) = group else {
        return (raw.trim().to_string(), Vec::new());
    };

    let name = format!("{}{}", &raw[..open], &raw[close + 1..]);
    let labels = raw[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    (name.trim().to_string(), labels)
}

/// Student, staff and guest price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealPrice {
    pub stud: Price,
    pub bed: Price,
    pub gast: Price,
}

/// A price in euros, or NaN when the feed had something unreadable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price(f64);

impl Price {
    pub const NAN: Price = Price(f64::NAN);

    pub fn new(eur: f64) -> Self { Self(eur) }

    pub fn eur(&self) -> f64 { self.0 }

    pub fn is_nan(&self) -> bool { self.0.is_nan() }

    /// Parses `1,20`. Anything unreadable, negative or infinite becomes
    /// [`Price::NAN`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.replace(',', ".").parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Self(v),
            _ => {
                if !s.is_empty() {
                    tracing::debug!("could not parse price: '{s}'");
                }
                Self::NAN
            },
        }
    }

    /// Rounded to cents.
    pub fn cents(&self) -> Option<i64> {
        self.0.is_finite().then(|| (self.0 * 100.0).round() as i64)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: serde::Serializer
    {
        if self.0.is_finite() {
            serializer.serialize_f64(self.0)
        } else {
            serializer.serialize_none()
        }
    }
}

struct PriceVisitor;
impl<'de> serde::de::Visitor<'de> for PriceVisitor {
    type Value = Price;

    fn expecting(
        &self, formatter: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        write!(formatter, "a number, a price with a comma or null")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where E: serde::de::Error
    { Ok(Price(v)) }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where E: serde::de::Error
    { Ok(Price(v as f64)) }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where E: serde::de::Error
    { Ok(Price(v as f64)) }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where E: serde::de::Error
    { Ok(Price::parse(v)) }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where E: serde::de::Error
    { Ok(Price::NAN) }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where E: serde::de::Error
    { Ok(Price::NAN) }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::Deserializer<'de>
    { deserializer.deserialize_any(PriceVisitor) }
}
