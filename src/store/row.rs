use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::cli::ScoringProfile;
use crate::model::{EvalResult, GradeBreakdown, ResumeKey, response_time_score, round_to};

pub const COLUMNS: [&str; 10] = [
    "Model Name",
    "Question",
    "Context Provided",
    "Accuracy Score",
    "Completeness Score",
    "Clarity Score",
    "Response time",
    "Weighted Score",
    "Percentile Rank",
    "Explanation",
];

const QUESTION_PREFIX: char = 'Q';
const YES: &str = "Yes";
const NO: &str = "No";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct ResultRow {
    #[serde(rename = "Model Name")]
    model_name: String,
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Context Provided")]
    context_provided: String,
    #[serde(rename = "Accuracy Score")]
    accuracy: i64,
    #[serde(rename = "Completeness Score")]
    completeness: i64,
    #[serde(rename = "Clarity Score")]
    clarity: i64,
    #[serde(rename = "Response time")]
    response_time: f64,
    #[serde(rename = "Weighted Score", default)]
    weighted_score: f64,
    #[serde(rename = "Percentile Rank", default)]
    percentile: f64,
    #[serde(rename = "Explanation", default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct KeyRow {
    #[serde(rename = "Model Name")]
    model_name: String,
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Context Provided")]
    context_provided: String,
}

impl KeyRow {
    pub(super) fn into_key(self) -> Result<ResumeKey> {
        Ok(ResumeKey::new(
            &self.model_name,
            parse_question(&self.question)?,
            parse_flag(&self.context_provided)?,
        ))
    }
}

impl ResultRow {
    pub(super) fn from_result(result: &EvalResult) -> Self {
        let grades = &result.grades;
        Self {
            model_name: result.model_name.clone(),
            question: format!("{QUESTION_PREFIX}{}", result.question_number),
            context_provided: if result.context_provided { YES } else { NO }.to_string(),
            accuracy: i64::from(grades.accuracy()),
            completeness: i64::from(grades.completeness()),
            clarity: i64::from(grades.clarity()),
            response_time: round_to(result.response_time, 2),
            weighted_score: grades.weighted_score(),
            percentile: round_to(result.percentile, 1),
            explanation: grades.explanation().to_string(),
        }
    }

    pub(super) fn into_result(self, profile: ScoringProfile) -> Result<EvalResult> {
        let question_number = parse_question(&self.question)?;
        let context_provided = parse_flag(&self.context_provided)?;
        if self.response_time < 0.0 {
            bail!("negative response time: {}", self.response_time);
        }

        let mut grades = GradeBreakdown::new(
            self.accuracy,
            self.completeness,
            self.clarity,
            &self.explanation,
        );
        if profile == ScoringProfile::Timed {
            grades = grades.with_response_time_score(response_time_score(self.response_time));
        }

        Ok(EvalResult {
            model_name: self.model_name,
            question_number,
            context_provided,
            response: String::new(),
            response_time: self.response_time,
            grades,
            percentile: self.percentile,
        })
    }
}

fn parse_question(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(QUESTION_PREFIX)
        .unwrap_or(trimmed)
        .parse::<u32>()
        .with_context(|| format!("invalid question identifier: {raw:?}"))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim() {
        YES => Ok(true),
        NO => Ok(false),
        other => bail!("invalid context flag: {other:?}"),
    }
}
