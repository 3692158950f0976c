use super::parser::{self, GrantRow};
use super::{FundingRange, GrantCandidate, GrantId, GrantStatus};
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum GrantImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidField {
        grant_id: u64,
        field: &'static str,
        value: String,
    },
}

impl std::fmt::Display for GrantImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantImportError::Io(err) => write!(f, "failed to read grant catalog: {}", err),
            GrantImportError::Csv(err) => write!(f, "invalid grant catalog CSV: {}", err),
            GrantImportError::InvalidField {
                grant_id,
                field,
                value,
            } => write!(
                f,
                "grant {} has an invalid {} value '{}'",
                grant_id, field, value
            ),
        }
    }
}

impl std::error::Error for GrantImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrantImportError::Io(err) => Some(err),
            GrantImportError::Csv(err) => Some(err),
            GrantImportError::InvalidField { .. } => None,
        }
    }
}

impl From<std::io::Error> for GrantImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for GrantImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads grant records from a CSV export of the grant post type.
pub struct GrantCatalogImporter;

impl GrantCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<GrantCandidate>, GrantImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<GrantCandidate>, GrantImportError> {
        parser::parse_rows(reader)?
            .into_iter()
            .map(candidate_from_row)
            .collect()
    }
}

fn candidate_from_row(row: GrantRow) -> Result<GrantCandidate, GrantImportError> {
    let grant_id = row.id;
    let invalid = |field: &'static str, value: &str| GrantImportError::InvalidField {
        grant_id,
        field,
        value: value.to_string(),
    };

    let amount = |field: &'static str, raw: Option<&str>| -> Result<Option<u64>, GrantImportError> {
        raw.map(|value| parser::parse_amount(value).ok_or_else(|| invalid(field, value)))
            .transpose()
    };

    let funding = FundingRange {
        min_yen: amount("amount_min", row.amount_min.as_deref())?,
        max_yen: amount("amount_max", row.amount_max.as_deref())?,
    };

    let deadline = row
        .deadline
        .as_deref()
        .map(|value| parser::parse_date(value).ok_or_else(|| invalid("deadline", value)))
        .transpose()?;

    let published_on = parser::parse_date(&row.published_on)
        .ok_or_else(|| invalid("published_on", &row.published_on))?;

    let status = GrantStatus::parse(&row.status).ok_or_else(|| invalid("status", &row.status))?;

    let views = row
        .views
        .as_deref()
        .map(|value| value.trim().parse::<u64>().map_err(|_| invalid("views", value)))
        .transpose()?
        .unwrap_or(0);

    Ok(GrantCandidate {
        id: GrantId(grant_id),
        title: row.title,
        excerpt: row.excerpt,
        permalink: row.permalink,
        organization: row.organization,
        categories: row.categories,
        prefecture: row.prefecture,
        funding,
        deadline,
        status,
        views,
        published_on,
    })
}
