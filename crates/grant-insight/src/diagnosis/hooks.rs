use std::fmt;
use std::sync::Arc;

use super::answers::AnswerSet;
use super::domain::DiagnosisOutcome;
use super::query::GrantQuery;
use crate::grants::GrantCandidate;

/// Extension point invoked at fixed stages of a diagnosis. Every stage defaults to a no-op.
pub trait DiagnosisHook: Send + Sync {
    fn name(&self) -> &str;

    fn on_request(&self, _answers: &AnswerSet) {}

    fn before_query(&self, _query: &mut GrantQuery) {}

    fn after_query(&self, _candidates: &mut Vec<GrantCandidate>) {}

    fn on_response(&self, _outcome: &mut DiagnosisOutcome) {}
}

/// Hooks run in registration order at each stage.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn DiagnosisHook>>,
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|hook| hook.name()))
            .finish()
    }
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn DiagnosisHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn on_request(&self, answers: &AnswerSet) {
        for hook in &self.hooks {
            hook.on_request(answers);
        }
    }

    pub(crate) fn before_query(&self, query: &mut GrantQuery) {
        for hook in &self.hooks {
            hook.before_query(query);
        }
    }

    pub(crate) fn after_query(&self, candidates: &mut Vec<GrantCandidate>) {
        for hook in &self.hooks {
            hook.after_query(candidates);
        }
    }

    pub(crate) fn on_response(&self, outcome: &mut DiagnosisOutcome) {
        for hook in &self.hooks {
            hook.on_response(outcome);
        }
    }
}
