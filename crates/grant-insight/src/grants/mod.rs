//! Grant records as the diagnosis engine sees them, plus the CSV catalog importer.

mod import;
mod parser;

pub use import::{GrantCatalogImporter, GrantImportError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a published grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrantId(pub u64);

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Funding amount bounds in yen. Either side may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRange {
    pub min_yen: Option<u64>,
    pub max_yen: Option<u64>,
}

impl FundingRange {
    pub fn is_unknown(&self) -> bool {
        self.min_yen.is_none() && self.max_yen.is_none()
    }

    /// Largest published amount, falling back to the lower bound.
    pub fn headline_yen(&self) -> Option<u64> {
        self.max_yen.or(self.min_yen)
    }
}

/// Application window state of a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    #[default]
    Open,
    Upcoming,
    Closed,
}

impl GrantStatus {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "open" | "active" => Some(Self::Open),
            "upcoming" => Some(Self::Upcoming),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Label used by the front end badge styles.
    pub const fn ui_label(self) -> &'static str {
        match self {
            GrantStatus::Open => "active",
            GrantStatus::Upcoming => "upcoming",
            GrantStatus::Closed => "closed",
        }
    }
}

/// Read-only grant record returned by the grant datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantCandidate {
    pub id: GrantId,
    pub title: String,
    pub excerpt: String,
    pub permalink: String,
    pub organization: String,
    /// Category taxonomy slugs, e.g. `it-digital`.
    pub categories: Vec<String>,
    /// Prefecture taxonomy name, e.g. `東京都`.
    pub prefecture: Option<String>,
    pub funding: FundingRange,
    pub deadline: Option<NaiveDate>,
    pub status: GrantStatus,
    pub views: u64,
    pub published_on: NaiveDate,
}

impl GrantCandidate {
    pub fn has_category(&self, slug: &str) -> bool {
        self.categories.iter().any(|category| category == slug)
    }

    pub fn summary_view(&self) -> GrantSummaryView {
        GrantSummaryView {
            id: self.id,
            title: self.title.clone(),
            excerpt: trim_words(&self.excerpt, EXCERPT_WORDS),
            permalink: self.permalink.clone(),
            amount: format_man(self.funding.headline_yen().unwrap_or(0)),
            organization: self.organization.clone(),
            deadline: self.deadline,
            prefecture: self.prefecture.clone().unwrap_or_default(),
            category: self.categories.first().cloned().unwrap_or_default(),
            status: self.status.ui_label().to_string(),
        }
    }
}

/// Card-shaped projection of a grant for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSummaryView {
    pub id: GrantId,
    pub title: String,
    pub excerpt: String,
    pub permalink: String,
    /// Amount in units of 10,000 yen (万円), thousands-separated.
    pub amount: String,
    pub organization: String,
    pub deadline: Option<NaiveDate>,
    pub prefecture: String,
    pub category: String,
    pub status: String,
}

const EXCERPT_WORDS: usize = 30;

fn trim_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return words.join(" ");
    }
    format!("{}…", words[..limit].join(" "))
}

/// Formats a yen amount as 万円 with thousands separators: 12,500,000 -> "1,250".
pub fn format_man(amount_yen: u64) -> String {
    let digits = (amount_yen / 10_000).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
