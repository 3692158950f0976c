use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::{AnswerArity, QuestionCatalog};

/// A submitted answer: one value, or a selection of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerValue {
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Single(value) => value.is_empty(),
            AnswerValue::Multiple(values) => values.is_empty(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            AnswerValue::Single(value) => Some(value),
            AnswerValue::Multiple(_) => None,
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            AnswerValue::Single(value) => std::slice::from_ref(value),
            AnswerValue::Multiple(values) => values,
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.values().iter().any(|value| value == candidate)
    }
}

/// Validation failures raised before any grant lookup happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("診断データの形式が正しくありません（{0}）")]
    MalformedPayload(String),
    #[error("「{prompt}」は必須項目です。")]
    MissingRequired { question: String, prompt: String },
    #[error("{question} には1つだけ回答してください。")]
    UnexpectedArity { question: String },
    #[error("{question} に「{value}」という選択肢はありません。")]
    UnknownOption { question: String, value: String },
}

/// Answers keyed by question id. Unknown ids are carried along but never scored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, AnswerValue>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, question: &str, value: AnswerValue) -> Self {
        self.0.insert(question.to_string(), value);
        self
    }

    pub fn single(self, question: &str, value: &str) -> Self {
        self.with(question, AnswerValue::Single(value.to_string()))
    }

    pub fn multiple(self, question: &str, values: &[&str]) -> Self {
        self.with(
            question,
            AnswerValue::Multiple(values.iter().map(|value| value.to_string()).collect()),
        )
    }

    pub fn get(&self, question: &str) -> Option<&AnswerValue> {
        self.0.get(question)
    }

    /// The answer for `question` when one was actually given.
    pub fn answered(&self, question: &str) -> Option<&AnswerValue> {
        self.get(question).filter(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of catalog questions that received a non-empty answer.
    pub fn answered_count(&self, catalog: &QuestionCatalog) -> usize {
        catalog
            .questions()
            .iter()
            .filter(|question| self.answered(&question.id).is_some())
            .count()
    }

    /// Parses a JSON object payload and validates it against the catalog.
    pub fn from_json(payload: &Value, catalog: &QuestionCatalog) -> Result<Self, ValidationError> {
        let object = payload.as_object().ok_or_else(|| {
            ValidationError::MalformedPayload(
                "answers must be an object keyed by question id".to_string(),
            )
        })?;

        let mut answers = BTreeMap::new();
        for (key, raw) in object {
            let arity = catalog.get(key).map(|question| question.arity);
            let value = match answer_from_json(key, raw) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(_) if arity.is_none() => continue,
                Err(error) => return Err(error),
            };

            let value = match (arity, value) {
                (Some(AnswerArity::Multiple), AnswerValue::Single(single)) if !single.is_empty() => {
                    AnswerValue::Multiple(vec![single])
                }
                (Some(AnswerArity::Multiple), AnswerValue::Single(_)) => {
                    AnswerValue::Multiple(Vec::new())
                }
                (_, value) => value,
            };
            answers.insert(key.clone(), value);
        }

        let answers = Self(answers);
        answers.validate(catalog)?;
        Ok(answers)
    }

    /// Checks catalog order, reporting the first unmet requirement.
    pub fn validate(&self, catalog: &QuestionCatalog) -> Result<(), ValidationError> {
        for question in catalog.questions() {
            let Some(value) = self.answered(&question.id) else {
                if question.required {
                    return Err(ValidationError::MissingRequired {
                        question: question.id.clone(),
                        prompt: question.prompt.clone(),
                    });
                }
                continue;
            };

            if question.arity != AnswerArity::Multiple && value.as_single().is_none() {
                return Err(ValidationError::UnexpectedArity {
                    question: question.id.clone(),
                });
            }

            if let Some(unknown) = value.values().iter().find(|value| !question.accepts(value)) {
                return Err(ValidationError::UnknownOption {
                    question: question.id.clone(),
                    value: unknown.clone(),
                });
            }
        }

        Ok(())
    }
}

fn answer_from_json(key: &str, raw: &Value) -> Result<Option<AnswerValue>, ValidationError> {
    match raw {
        Value::Null => Ok(None),
        Value::Array(items) => {
            let mut values: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                let Some(value) = scalar_to_string(item) else {
                    return Err(ValidationError::MalformedPayload(format!(
                        "`{key}` must contain only scalar values"
                    )));
                };
                if !value.is_empty() && !values.contains(&value) {
                    values.push(value);
                }
            }
            Ok(Some(AnswerValue::Multiple(values)))
        }
        scalar => scalar_to_string(scalar)
            .map(|value| Some(AnswerValue::Single(value)))
            .ok_or_else(|| {
                ValidationError::MalformedPayload(format!("`{key}` must be a scalar or an array"))
            }),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
