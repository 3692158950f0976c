use serde::{Deserialize, Serialize};

use super::super::answers::AnswerSet;
use super::super::catalog::ids;
use crate::grants::GrantCandidate;

const VERY_HIGH_FIT: f64 = 80.0;
const HIGH_FIT: f64 = 60.0;

/// Explanation attached to a matched grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    IndustryMatch,
    RegionalGrant,
    WithinBudget,
    VeryHighFit,
    HighFit,
}

impl MatchReason {
    pub const fn label(self) -> &'static str {
        match self {
            MatchReason::IndustryMatch => "業種が一致しています",
            MatchReason::RegionalGrant => "地域の助成金です",
            MatchReason::WithinBudget => "予算範囲に適合しています",
            MatchReason::VeryHighFit => "非常に高い適合度です",
            MatchReason::HighFit => "高い適合度です",
        }
    }
}

pub(crate) fn reasons_for(grant: &GrantCandidate, answers: &AnswerSet, score: f64) -> Vec<MatchReason> {
    let mut reasons = Vec::new();

    if answers.answered(ids::INDUSTRY).is_some() && !grant.categories.is_empty() {
        reasons.push(MatchReason::IndustryMatch);
    }
    if answers.answered(ids::LOCATION).is_some() && grant.prefecture.is_some() {
        reasons.push(MatchReason::RegionalGrant);
    }
    // Candidates were already filtered to the requested range.
    if answers.answered(ids::BUDGET).is_some() {
        reasons.push(MatchReason::WithinBudget);
    }

    if score > VERY_HIGH_FIT {
        reasons.push(MatchReason::VeryHighFit);
    } else if score > HIGH_FIT {
        reasons.push(MatchReason::HighFit);
    }

    reasons
}
