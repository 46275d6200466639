use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResponseShapeError;

pub const HEALTH_PATH: &str = "health";
pub const ANALYZE_PATH: &str = "analyze";

pub const ADDITIONAL_INFO_FIELD: &str = "additional_info";

pub const SCORE_KEY: &str = "Evaluating Score";
pub const STATEMENT_KEY: &str = "Evaluating Statement";
pub const SUGGESTIONS_KEY: &str = "Suggestions";
pub const IMPROVED_RESUME_PATH_KEY: &str = "improved_resume_path";

/// File name offered to the user when saving the generated document.
pub const IMPROVED_RESUME_FILENAME: &str = "improved_resume.pdf";

/// Validated analysis returned by `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub score: f64,
    pub statement: String,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improved_document_ref: Option<String>,
}

impl AnalysisResult {
    pub fn from_value(value: Value) -> Result<Self, ResponseShapeError> {
        let Value::Object(body) = value else {
            return Err(ResponseShapeError::NotAnObject);
        };

        let score = read_score(&body).ok_or(ResponseShapeError::MissingField(SCORE_KEY))?;
        let statement = body
            .get(STATEMENT_KEY)
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ResponseShapeError::MissingField(STATEMENT_KEY))?
            .to_string();
        let suggestions = body
            .get(SUGGESTIONS_KEY)
            .and_then(Value::as_array)
            .ok_or(ResponseShapeError::MissingField(SUGGESTIONS_KEY))?
            .iter()
            .map(suggestion_text)
            .collect();
        let improved_document_ref = body
            .get(IMPROVED_RESUME_PATH_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_string);

        Ok(Self {
            score,
            statement,
            suggestions,
            improved_document_ref,
        })
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, ResponseShapeError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| ResponseShapeError::NotAnObject)?;
        Self::from_value(value)
    }
}

fn read_score(body: &Map<String, Value>) -> Option<f64> {
    match body.get(SCORE_KEY)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn suggestion_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
