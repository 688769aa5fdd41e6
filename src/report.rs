use serde::Serialize;
use tracing::{info, warn};

use crate::model::{EvalResult, round_to};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRef {
    pub model_name: String,
    pub question_number: u32,
    pub context_provided: bool,
    pub weighted_score: f64,
    pub percentile: f64,
}

impl ResultRef {
    fn from_result(result: &EvalResult) -> Self {
        Self {
            model_name: result.model_name.clone(),
            question_number: result.question_number,
            context_provided: result.context_provided,
            weighted_score: result.weighted_score(),
            percentile: result.percentile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub average_score: f64,
    pub average_response_time: f64,
    pub best: ResultRef,
    pub worst: ResultRef,
    pub average_with_context: Option<f64>,
    pub average_without_context: Option<f64>,
    pub context_improvement: Option<f64>,
}

impl Summary {
    pub fn from_results(results: &[EvalResult]) -> Option<Self> {
        let first = results.first()?;

        let mut best = first;
        let mut worst = first;
        for result in &results[1..] {
            if result.weighted_score() > best.weighted_score() {
                best = result;
            }
            if result.weighted_score() < worst.weighted_score() {
                worst = result;
            }
        }

        let average_with_context = mean_score(results.iter().filter(|r| r.context_provided));
        let average_without_context = mean_score(results.iter().filter(|r| !r.context_provided));
        let context_improvement = average_with_context
            .zip(average_without_context)
            .map(|(with, without)| round_to(with - without, 2));

        Some(Self {
            total: results.len(),
            average_score: mean_score(results.iter()).unwrap_or_default(),
            average_response_time: round_to(
                results.iter().map(|r| r.response_time).sum::<f64>() / results.len() as f64,
                2,
            ),
            best: ResultRef::from_result(best),
            worst: ResultRef::from_result(worst),
            average_with_context,
            average_without_context,
            context_improvement,
        })
    }
}

fn mean_score<'a>(results: impl Iterator<Item = &'a EvalResult>) -> Option<f64> {
    let (count, sum) = results.fold((0_usize, 0.0_f64), |(count, sum), result| {
        (count + 1, sum + result.weighted_score())
    });
    (count > 0).then(|| round_to(sum / count as f64, 2))
}

pub fn log_summary(results: &[EvalResult]) -> Option<Summary> {
    let Some(summary) = Summary::from_results(results) else {
        warn!("no results to summarize");
        return None;
    };

    info!(
        total = summary.total,
        average_score = summary.average_score,
        average_response_time = summary.average_response_time,
        "results summary"
    );
    info!(
        model = %summary.best.model_name,
        question = summary.best.question_number,
        with_context = summary.best.context_provided,
        score = summary.best.weighted_score,
        percentile = summary.best.percentile,
        "best result"
    );
    info!(
        model = %summary.worst.model_name,
        question = summary.worst.question_number,
        with_context = summary.worst.context_provided,
        score = summary.worst.weighted_score,
        percentile = summary.worst.percentile,
        "worst result"
    );
    info!(
        with_context = ?summary.average_with_context,
        without_context = ?summary.average_without_context,
        improvement = ?summary.context_improvement,
        "context impact"
    );
    Some(summary)
}
