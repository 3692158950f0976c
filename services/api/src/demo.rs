use crate::infra::{parse_answers, InMemoryGrantRepository, InMemoryHistoryRepository};
use clap::Args;
use grant_insight::diagnosis::{
    DiagnosisError, DiagnosisOutcome, DiagnosisService, MatchingConfig, Owner, QuestionCatalog,
    SessionId,
};
use grant_insight::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DiagnoseArgs {
    /// Answers as a JSON object keyed by question id
    #[arg(long)]
    pub(crate) answers: String,
    /// Grant catalog CSV (defaults to the bundled sample catalog)
    #[arg(long)]
    pub(crate) grants_csv: Option<PathBuf>,
    /// Diagnose as an authenticated user instead of an anonymous session
    #[arg(long)]
    pub(crate) user_id: Option<u64>,
}

pub(crate) fn run_questions() -> Result<(), AppError> {
    let catalog = QuestionCatalog::standard();
    println!("Grant Insight diagnosis questions");
    for question in catalog.questions() {
        let required = if question.required { "required" } else { "optional" };
        println!(
            "\n[{}] {} ({}, weight {:.1})",
            question.id, question.prompt, required, question.weight
        );
        if question.options.len() > 10 {
            println!("  {} options", question.options.len());
            continue;
        }
        for option in &question.options {
            println!("  - {}: {}", option.value, option.label);
        }
    }
    Ok(())
}

pub(crate) async fn run_diagnose(args: DiagnoseArgs) -> Result<(), AppError> {
    let DiagnoseArgs {
        answers,
        grants_csv,
        user_id,
    } = args;

    let payload = parse_answers(&answers)?;
    let grants = Arc::new(InMemoryGrantRepository::load(grants_csv.as_deref())?);
    let history = Arc::new(InMemoryHistoryRepository::default());
    let (service, worker) = DiagnosisService::spawn(grants, history, MatchingConfig::default());

    let owner = match user_id {
        Some(id) => Owner::User(id),
        None => Owner::Session(SessionId::generate()),
    };

    let result = service.diagnose(&owner, &payload);
    drop(service);
    if let Err(err) = worker.await {
        println!("History worker stopped unexpectedly: {err}");
    }

    match result {
        Ok(outcome) => render_outcome(&outcome),
        Err(DiagnosisError::Validation(err)) => {
            println!("Diagnosis rejected: {err}");
        }
        Err(err) => {
            println!("Diagnosis failed: {err}");
        }
    }

    Ok(())
}

fn render_outcome(outcome: &DiagnosisOutcome) {
    println!("Diagnosis {}", outcome.diagnosis_id);
    println!(
        "- {} candidate grants | {} matches | confidence {:.1}",
        outcome.candidate_count,
        outcome.results.len(),
        outcome.confidence_score
    );

    if outcome.has_matches() {
        println!("Matched grants:");
        for (grant, result) in outcome.matched_grants.iter().zip(&outcome.results) {
            let reasons: Vec<&str> = result.reasons.iter().map(|reason| reason.label()).collect();
            println!(
                "  - [{:.1}] {} ({}万円, {})",
                grant.match_score, grant.grant.title, grant.grant.amount, grant.grant.organization
            );
            if !reasons.is_empty() {
                println!("    {}", reasons.join(" / "));
            }
        }
    } else {
        println!("No grants matched. Popular grants instead:");
        for grant in &outcome.fallback_grants {
            println!("  - {} ({}万円)", grant.title, grant.amount);
        }
    }

    if !outcome.recommendations.is_empty() {
        println!("Recommendations:");
        for recommendation in &outcome.recommendations {
            println!("  - {}", recommendation.label());
        }
    }
}
