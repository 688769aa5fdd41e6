use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("could not parse grades, missing fields: {}", missing.join(", "))]
    Parse { missing: Vec<String> },

    #[error("malformed grading output: {0}")]
    MalformedGrade(String),

    #[error("query to model {model} failed: {message}")]
    Query { model: String, message: String },

    #[error("grading failed: {0}")]
    Grading(String),
}

impl EvalError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn query(model: &str, message: impl Into<String>) -> Self {
        Self::Query {
            model: model.to_string(),
            message: message.into(),
        }
    }
}
