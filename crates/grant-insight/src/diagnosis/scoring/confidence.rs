use super::super::answers::AnswerSet;
use super::super::catalog::QuestionCatalog;
use super::config::MatchingConfig;

/// Aggregate confidence over the returned scores and answer completeness.
pub(crate) fn estimate_confidence(
    scores: &[f64],
    answers: &AnswerSet,
    catalog: &QuestionCatalog,
    config: &MatchingConfig,
) -> f64 {
    if scores.is_empty() || catalog.is_empty() {
        return 0.0;
    }

    let mean_score = scores.iter().sum::<f64>() / scores.len() as f64;
    let completeness = answers.answered_count(catalog) as f64 / catalog.len() as f64 * 100.0;

    (config.confidence_score_weight * mean_score
        + config.confidence_completeness_weight * completeness)
        .clamp(0.0, 100.0)
}
