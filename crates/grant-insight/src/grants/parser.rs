use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Header-typed row of a grant catalog export. Each column declares its type and default.
#[derive(Debug, Deserialize)]
pub(crate) struct GrantRow {
    pub(crate) id: u64,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) excerpt: String,
    #[serde(default)]
    pub(crate) permalink: String,
    #[serde(default)]
    pub(crate) organization: String,
    #[serde(default, deserialize_with = "pipe_separated")]
    pub(crate) categories: Vec<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) prefecture: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) amount_min: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) amount_max: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) deadline: Option<String>,
    #[serde(default)]
    pub(crate) status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) views: Option<String>,
    pub(crate) published_on: String,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<GrantRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.deserialize::<GrantRow>().collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn pipe_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .split('|')
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .map(str::to_string)
        .collect())
}

/// Accepts `YYYY-MM-DD` or RFC 3339 timestamps (date part kept).
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.naive_utc().date())
}

/// Parses a yen amount, tolerating thousands separators (`1,000,000`).
pub(crate) fn parse_amount(value: &str) -> Option<u64> {
    let digits: String = value.chars().filter(|ch| *ch != ',').collect();
    digits.trim().parse::<u64>().ok()
}
