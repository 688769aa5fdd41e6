use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::orchestrator::CellFailure;
use crate::report::Summary;

pub const EXPLANATION_MAX_CHARS: usize = 200;
pub const NO_EXPLANATION: &str = "No explanation provided.";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub number: u32,
    pub text: String,
    pub context_path: Option<PathBuf>,
}

impl Question {
    pub fn load_context(&self) -> Result<Option<String>> {
        let Some(path) = self.context_path.as_ref() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read context file {}", path.display()))?;
        Ok(Some(text))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeBreakdown {
    accuracy: u8,
    completeness: u8,
    clarity: u8,
    response_time_score: Option<u8>,
    explanation: String,
}

impl GradeBreakdown {
    pub fn new(accuracy: i64, completeness: i64, clarity: i64, explanation: &str) -> Self {
        Self {
            accuracy: clamp_score(accuracy),
            completeness: clamp_score(completeness),
            clarity: clamp_score(clarity),
            response_time_score: None,
            explanation: bound_explanation(explanation),
        }
    }

    pub fn with_response_time_score(mut self, score: i64) -> Self {
        self.response_time_score = Some(clamp_score(score));
        self
    }

    pub fn accuracy(&self) -> u8 {
        self.accuracy
    }

    pub fn completeness(&self) -> u8 {
        self.completeness
    }

    pub fn clarity(&self) -> u8 {
        self.clarity
    }

    pub fn response_time_score(&self) -> Option<u8> {
        self.response_time_score
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn weighted_score(&self) -> f64 {
        let accuracy = f64::from(self.accuracy);
        let completeness = f64::from(self.completeness);
        let clarity = f64::from(self.clarity);

        let raw = match self.response_time_score {
            Some(response_time) => {
                accuracy * 0.5 + completeness * 0.2 + clarity * 0.2 + f64::from(response_time) * 0.1
            }
            None => accuracy * 0.5 + completeness * 0.25 + clarity * 0.25,
        };
        round_to(raw, 2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResumeKey {
    pub model: String,
    pub question: u32,
    pub with_context: bool,
}

impl ResumeKey {
    pub fn new(model: &str, question: u32, with_context: bool) -> Self {
        Self {
            model: model.to_string(),
            question,
            with_context,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    pub model_name: String,
    pub question_number: u32,
    pub context_provided: bool,
    pub response: String,
    pub response_time: f64,
    pub grades: GradeBreakdown,
    pub percentile: f64,
}

impl EvalResult {
    pub fn key(&self) -> ResumeKey {
        ResumeKey::new(&self.model_name, self.question_number, self.context_provided)
    }

    pub fn weighted_score(&self) -> f64 {
        self.grades.weighted_score()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub scoring_profile: String,
    pub grade_format: String,
    pub missing_field_policy: String,
    pub grader_model: String,
    pub models: Vec<String>,
    pub question_numbers: Vec<u32>,
    pub questions_fingerprint: String,
    pub paths: RunPaths,
    pub counts: RunCounts,
    pub summary: Option<Summary>,
    pub failures: Vec<CellFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunPaths {
    pub output_csv_path: String,
    pub questions_dir: String,
    pub contexts_dir: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunCounts {
    pub total_cells: usize,
    pub skipped: usize,
    pub completed: usize,
    pub failed: usize,
    pub results_in_file: usize,
}

pub fn response_time_score(seconds: f64) -> i64 {
    match seconds {
        s if s <= 10.0 => 95,
        s if s <= 30.0 => 80,
        s if s <= 60.0 => 60,
        s if s <= 90.0 => 40,
        s if s <= 120.0 => 20,
        _ => 5,
    }
}

pub fn clamp_score(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

pub fn bound_explanation(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return NO_EXPLANATION.to_string();
    }
    if trimmed.chars().count() <= EXPLANATION_MAX_CHARS {
        return trimmed.to_string();
    }

    let kept: String = trimmed
        .chars()
        .take(EXPLANATION_MAX_CHARS - ELLIPSIS.len())
        .collect();
    format!("{}{ELLIPSIS}", kept.trim_end())
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
