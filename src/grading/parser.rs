use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cli::{GradeFormat, MissingFieldPolicy, ScoringProfile};
use crate::errors::EvalError;
use crate::model::{GradeBreakdown, NO_EXPLANATION, bound_explanation};

pub const MIDPOINT_SCORE: i64 = 50;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ScoreField {
    Accuracy,
    Completeness,
    Clarity,
    ResponseTime,
}

impl ScoreField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Accuracy => "ACCURACY",
            Self::Completeness => "COMPLETENESS",
            Self::Clarity => "CLARITY",
            Self::ResponseTime => "RESPONSE_TIME",
        }
    }

    pub fn json_key(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Completeness => "completeness",
            Self::Clarity => "clarity",
            Self::ResponseTime => "response_time",
        }
    }

    fn label_pattern(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Completeness => "completeness",
            Self::Clarity => "clarity",
            Self::ResponseTime => r"response[_ \t]time",
        }
    }
}

pub fn required_fields(profile: ScoringProfile) -> &'static [ScoreField] {
    match profile {
        ScoringProfile::Standard => &[
            ScoreField::Accuracy,
            ScoreField::Completeness,
            ScoreField::Clarity,
        ],
        ScoringProfile::Timed => &[
            ScoreField::Accuracy,
            ScoreField::Completeness,
            ScoreField::Clarity,
            ScoreField::ResponseTime,
        ],
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialGrades {
    scores: Vec<(ScoreField, i64)>,
    explanation: String,
}

impl PartialGrades {
    pub fn get(&self, field: ScoreField) -> Option<i64> {
        self.scores
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, value)| *value)
    }

    fn set(&mut self, field: ScoreField, value: i64) {
        if self.get(field).is_none() {
            self.scores.push((field, value));
        }
    }

    fn missing(&self, profile: ScoringProfile) -> Vec<ScoreField> {
        required_fields(profile)
            .iter()
            .copied()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    fn into_breakdown(self, profile: ScoringProfile, fill: i64) -> GradeBreakdown {
        let score = |field| self.get(field).unwrap_or(fill);
        let grades = GradeBreakdown::new(
            score(ScoreField::Accuracy),
            score(ScoreField::Completeness),
            score(ScoreField::Clarity),
            &self.explanation,
        );
        match profile {
            ScoringProfile::Standard => grades,
            ScoringProfile::Timed => grades.with_response_time_score(score(ScoreField::ResponseTime)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GradeOutcome {
    Parsed(GradeBreakdown),
    MissingFields {
        missing: Vec<ScoreField>,
        partial: PartialGrades,
    },
}

#[derive(Debug)]
pub struct GradeParser {
    format: GradeFormat,
    policy: MissingFieldPolicy,
    profile: ScoringProfile,
    field_patterns: Vec<(ScoreField, Regex)>,
    explanation_prefix: Regex,
}

impl GradeParser {
    pub fn new(
        format: GradeFormat,
        policy: MissingFieldPolicy,
        profile: ScoringProfile,
    ) -> Result<Self> {
        let mut field_patterns = Vec::new();
        for field in [
            ScoreField::Accuracy,
            ScoreField::Completeness,
            ScoreField::Clarity,
            ScoreField::ResponseTime,
        ] {
            let pattern = format!(
                r"(?i)\b{}\b(?:[ \t]+score)?(?:[ \t]*\([^)\n]*\))?[ \t]*\**[ \t]*[:=]?[ \t]*\**[ \t]*([+-]?\d+)",
                field.label_pattern()
            );
            let regex = Regex::new(&pattern)
                .with_context(|| format!("failed to compile {} score regex", field.label()))?;
            field_patterns.push((field, regex));
        }

        Ok(Self {
            format,
            policy,
            profile,
            field_patterns,
            explanation_prefix: Regex::new(
                r"(?i)^[*_#\s]*(?:explanation|justification|reasoning|rationale)[*_\s]*:[*_\s]*",
            )
            .context("failed to compile explanation prefix regex")?,
        })
    }

    pub fn profile(&self) -> ScoringProfile {
        self.profile
    }

    pub fn format(&self) -> GradeFormat {
        self.format
    }

    pub fn match_fields(&self, raw: &str) -> Result<GradeOutcome, EvalError> {
        let partial = match self.format {
            GradeFormat::Text => self.match_text(raw),
            GradeFormat::Json => match_json(raw)?,
        };

        let missing = partial.missing(self.profile);
        if missing.is_empty() {
            Ok(GradeOutcome::Parsed(partial.into_breakdown(self.profile, MIDPOINT_SCORE)))
        } else {
            Ok(GradeOutcome::MissingFields { missing, partial })
        }
    }

    pub fn parse(&self, raw: &str) -> Result<GradeBreakdown, EvalError> {
        match self.match_fields(raw)? {
            GradeOutcome::Parsed(grades) => Ok(grades),
            GradeOutcome::MissingFields { missing, partial } => {
                let labels: Vec<String> = missing
                    .iter()
                    .map(|field| field.label().to_string())
                    .collect();
                match self.policy {
                    MissingFieldPolicy::Fail => Err(EvalError::Parse { missing: labels }),
                    MissingFieldPolicy::Default => {
                        warn!(
                            fields = %labels.join(","),
                            default = MIDPOINT_SCORE,
                            excerpt = %excerpt(raw),
                            "grading output missing required fields; substituting midpoint"
                        );
                        Ok(partial.into_breakdown(self.profile, MIDPOINT_SCORE))
                    }
                }
            }
        }
    }

    fn match_text(&self, raw: &str) -> PartialGrades {
        let mut partial = PartialGrades::default();
        let mut scores_end = 0usize;

        for (field, regex) in self.active_patterns() {
            let Some(captures) = regex.captures(raw) else {
                continue;
            };
            let Some(value) = captures.get(1) else {
                continue;
            };
            partial.set(*field, parse_signed(value.as_str()));
            if let Some(whole) = captures.get(0) {
                scores_end = scores_end.max(whole.end());
            }
        }

        partial.explanation = self.extract_explanation(&raw[scores_end..]);
        debug!(
            found = partial.scores.len(),
            explanation_chars = partial.explanation.chars().count(),
            "matched text grading fields"
        );
        partial
    }

    fn active_patterns(&self) -> impl Iterator<Item = &(ScoreField, Regex)> {
        let required = required_fields(self.profile);
        self.field_patterns
            .iter()
            .filter(move |(field, _)| required.contains(field))
    }

    fn extract_explanation(&self, tail: &str) -> String {
        for line in tail.lines() {
            let stripped = self.explanation_prefix.replace(line.trim(), "");
            let candidate = stripped.trim().trim_matches('*').trim();
            if candidate.is_empty() {
                continue;
            }
            if self
                .active_patterns()
                .any(|(_, regex)| regex.is_match(candidate))
            {
                continue;
            }
            return bound_explanation(candidate);
        }
        NO_EXPLANATION.to_string()
    }
}

fn match_json(raw: &str) -> Result<PartialGrades, EvalError> {
    let body = json_body(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|err| EvalError::MalformedGrade(format!("invalid JSON: {err}")))?;
    let Value::Object(object) = value else {
        return Err(EvalError::MalformedGrade(
            "expected a JSON object".to_string(),
        ));
    };

    let mut partial = PartialGrades::default();
    for field in [
        ScoreField::Accuracy,
        ScoreField::Completeness,
        ScoreField::Clarity,
        ScoreField::ResponseTime,
    ] {
        if let Some(score) = json_score(&object, field) {
            partial.set(field, score);
        }
    }

    partial.explanation = object
        .get("explanation")
        .and_then(Value::as_str)
        .map(bound_explanation)
        .unwrap_or_else(|| NO_EXPLANATION.to_string());
    Ok(partial)
}

fn json_score(object: &Map<String, Value>, field: ScoreField) -> Option<i64> {
    let value = object.get(field.json_key())?;
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn json_body(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn parse_signed(digits: &str) -> i64 {
    digits.parse::<i64>().unwrap_or(if digits.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(500).collect()
}
