use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 100;

/// Cleanliness score and candidate tasks produced by the vision service for
/// one snapshot. Only constructible through validation, so a value in hand
/// always satisfies `1 <= score <= 100`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    score: u8,
    tasks: Vec<String>,
}

#[derive(Deserialize)]
struct RawAnalysis {
    score: Option<Value>,
    tasks: Option<Value>,
}

impl AnalysisResult {
    pub fn new(score: i64, tasks: Vec<String>) -> Result<Self, ServiceError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ServiceError::Malformed(format!(
                "score {score} outside {MIN_SCORE}..={MAX_SCORE}"
            )));
        }
        Ok(Self {
            score: score as u8,
            tasks,
        })
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<String> {
        self.tasks
    }

    /// Parse the model's text reply. Markdown code fences are stripped first;
    /// extra keys are ignored, a missing `score` or `tasks` is malformed.
    pub fn parse(text: &str) -> Result<Self, ServiceError> {
        let cleaned = strip_code_fences(text);
        let value: Value = serde_json::from_str(cleaned)
            .map_err(|e| ServiceError::Malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ServiceError> {
        let raw: RawAnalysis = serde_json::from_value(value)
            .map_err(|e| ServiceError::Malformed(format!("expected an object: {e}")))?;

        let score = raw
            .score
            .ok_or_else(|| ServiceError::Malformed("missing score".into()))?;
        let score = score
            .as_i64()
            .ok_or_else(|| ServiceError::Malformed(format!("score is not an integer: {score}")))?;

        let tasks = match raw.tasks {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(ServiceError::Malformed(format!(
                        "task is not a string: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(ServiceError::Malformed(format!(
                    "tasks is not an array: {other}"
                )))
            }
            None => return Err(ServiceError::Malformed("missing tasks".into())),
        };

        Self::new(score, tasks)
    }
}

fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}
