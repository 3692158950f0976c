use serde::{Deserialize, Serialize};

use super::answers::{AnswerSet, AnswerValue};
use super::catalog::ids;

/// Follow-up advice derived from the diagnosis answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StartupSupport,
    SmallBusinessSupport,
    DigitalizationPrograms,
    EmploymentPrograms,
    ApplyEarly,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::StartupSupport => {
                "創業支援の助成金を優先的に検討することをお勧めします。"
            }
            Recommendation::SmallBusinessSupport => {
                "個人事業主向けの小規模事業者支援制度もご確認ください。"
            }
            Recommendation::DigitalizationPrograms => {
                "IT導入補助金やDX推進関連の助成金が特に適している可能性があります。"
            }
            Recommendation::EmploymentPrograms => {
                "雇用関連の助成金（キャリアアップ助成金等）も併せてご検討ください。"
            }
            Recommendation::ApplyEarly => {
                "締切が近い助成金から優先的に検討し、早めの準備をお勧めします。"
            }
        }
    }
}

pub fn recommend(answers: &AnswerSet) -> Vec<Recommendation> {
    let single = |question: &str| answers.answered(question).and_then(AnswerValue::as_single);
    let purpose_includes = |purpose: &str| {
        answers
            .answered(ids::PURPOSE)
            .is_some_and(|value| value.contains(purpose))
    };

    let mut recommendations = Vec::new();

    match single(ids::BUSINESS_TYPE) {
        Some("startup") => recommendations.push(Recommendation::StartupSupport),
        Some("sole_proprietor") => recommendations.push(Recommendation::SmallBusinessSupport),
        _ => {}
    }
    if purpose_includes("digitalization") {
        recommendations.push(Recommendation::DigitalizationPrograms);
    }
    if purpose_includes("hr") {
        recommendations.push(Recommendation::EmploymentPrograms);
    }
    if single(ids::URGENCY) == Some("immediate") {
        recommendations.push(Recommendation::ApplyEarly);
    }

    recommendations
}
