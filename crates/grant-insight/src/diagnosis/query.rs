use serde::{Deserialize, Serialize};

use super::answers::{AnswerSet, AnswerValue};
use super::catalog::ids;
use crate::grants::{FundingRange, GrantCandidate};

/// Category slug for an `industry` answer. `other` and unknown values impose no filter.
pub fn industry_category(industry: &str) -> Option<&'static str> {
    match industry {
        "it" => Some("it-digital"),
        "manufacturing" => Some("manufacturing"),
        "retail" => Some("retail-service"),
        "agriculture" => Some("agriculture"),
        "medical" => Some("medical-welfare"),
        "education" => Some("education"),
        "construction" => Some("construction"),
        _ => None,
    }
}

/// Yen bounds of a `budget` answer.
pub fn budget_range(budget: &str) -> Option<AmountRange> {
    let range = match budget {
        "0-100" => AmountRange::new(None, Some(1_000_000)),
        "100-500" => AmountRange::new(Some(1_000_000), Some(5_000_000)),
        "500-1000" => AmountRange::new(Some(5_000_000), Some(10_000_000)),
        "1000-3000" => AmountRange::new(Some(10_000_000), Some(30_000_000)),
        "3000+" => AmountRange::new(Some(30_000_000), None),
        _ => return None,
    };
    Some(range)
}

/// Requested funding range. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min_yen: Option<u64>,
    pub max_yen: Option<u64>,
}

impl AmountRange {
    pub const fn new(min_yen: Option<u64>, max_yen: Option<u64>) -> Self {
        Self { min_yen, max_yen }
    }

    /// Overlap test against a grant's funding. Grants with no funding data never overlap.
    pub fn overlaps(&self, funding: &FundingRange) -> bool {
        if funding.is_unknown() {
            return false;
        }

        let grant_min = funding.min_yen.unwrap_or(0);
        let grant_max = funding.max_yen.unwrap_or(u64::MAX);

        let above_floor = self.min_yen.map_or(true, |min| grant_max >= min);
        let below_ceiling = self.max_yen.map_or(true, |max| grant_min <= max);
        above_floor && below_ceiling
    }
}

/// Conjunctive filter handed to the grant datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantQuery {
    pub category: Option<String>,
    pub prefecture: Option<String>,
    pub amount: Option<AmountRange>,
    pub limit: usize,
}

impl GrantQuery {
    pub fn from_answers(answers: &AnswerSet, limit: usize) -> Self {
        let single = |question: &str| answers.answered(question).and_then(AnswerValue::as_single);

        Self {
            category: single(ids::INDUSTRY)
                .and_then(industry_category)
                .map(str::to_string),
            prefecture: single(ids::LOCATION).map(str::to_string),
            amount: single(ids::BUDGET).and_then(budget_range),
            limit,
        }
    }

    pub fn matches(&self, grant: &GrantCandidate) -> bool {
        if let Some(category) = &self.category {
            if !grant.has_category(category) {
                return false;
            }
        }

        if let Some(prefecture) = &self.prefecture {
            if grant.prefecture.as_deref() != Some(prefecture.as_str()) {
                return false;
            }
        }

        if let Some(amount) = &self.amount {
            if !amount.overlaps(&grant.funding) {
                return false;
            }
        }

        true
    }
}
