use std::collections::HashSet;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::collaborators::{Grader, ModelQuery};
use crate::grading::create_prompt;
use crate::model::{EvalResult, Question, ResumeKey};
use crate::store::ResultStore;

const CONTEXT_FLAGS: [bool; 2] = [false, true];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellFailure {
    pub model: String,
    pub question: u32,
    pub with_context: bool,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    pub results: Vec<EvalResult>,
    pub total_cells: usize,
    pub skipped: usize,
    pub failed: Vec<CellFailure>,
}

pub fn progress_bar(len: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

pub struct Orchestrator<'a> {
    query: &'a dyn ModelQuery,
    grader: &'a dyn Grader,
    store: &'a ResultStore,
    completed: HashSet<ResumeKey>,
    progress: ProgressBar,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        query: &'a dyn ModelQuery,
        grader: &'a dyn Grader,
        store: &'a ResultStore,
        completed: HashSet<ResumeKey>,
        progress: ProgressBar,
    ) -> Self {
        Self {
            query,
            grader,
            store,
            completed,
            progress,
        }
    }

    pub fn run(&mut self, models: &[String], questions: &[Question]) -> RunOutcome {
        let total_cells = models.len() * questions.len() * CONTEXT_FLAGS.len();
        let mut outcome = RunOutcome {
            total_cells,
            ..RunOutcome::default()
        };

        info!(
            models = models.len(),
            questions = questions.len(),
            total_cells,
            already_completed = self.completed.len(),
            "starting evaluation"
        );

        for model in models {
            self.progress.set_message(model.clone());
            for question in questions {
                for with_context in CONTEXT_FLAGS {
                    self.run_cell(model, question, with_context, &mut outcome);
                    self.progress.inc(1);
                }
            }
        }
        self.progress.finish_and_clear();

        info!(
            completed = outcome.results.len(),
            skipped = outcome.skipped,
            failed = outcome.failed.len(),
            "evaluation finished"
        );
        outcome
    }

    fn run_cell(
        &mut self,
        model: &str,
        question: &Question,
        with_context: bool,
        outcome: &mut RunOutcome,
    ) {
        let key = ResumeKey::new(model, question.number, with_context);
        if self.completed.contains(&key) {
            debug!(model = %model, question = question.number, with_context, "skipping completed cell");
            outcome.skipped += 1;
            return;
        }

        let attempt = self
            .evaluate(model, question, with_context)
            .and_then(|result| {
                self.store.append_result(&result)?;
                Ok(result)
            });

        match attempt {
            Ok(result) => {
                debug!(
                    model = %model,
                    question = question.number,
                    with_context,
                    score = result.weighted_score(),
                    response_time = result.response_time,
                    response_chars = result.response.chars().count(),
                    "cell completed"
                );
                self.completed.insert(key);
                outcome.results.push(result);
            }
            Err(err) => {
                let message = format!("{err:#}");
                self.progress.suspend(|| {
                    error!(
                        model = %model,
                        question = question.number,
                        with_context,
                        error = %message,
                        "test failed"
                    );
                });
                outcome.failed.push(CellFailure {
                    model: model.to_string(),
                    question: question.number,
                    with_context,
                    error: message,
                });
            }
        }
    }

    fn evaluate(&self, model: &str, question: &Question, with_context: bool) -> Result<EvalResult> {
        let context = if with_context {
            question
                .load_context()
                .with_context(|| format!("failed to load context for question {}", question.number))?
        } else {
            None
        };

        let prompt = create_prompt(&question.text, context.as_deref());
        let response = self.query.query(model, &prompt)?;
        let grades = self.grader.grade(
            &question.text,
            &response.text,
            context.as_deref(),
            response.elapsed_secs,
        )?;

        Ok(EvalResult {
            model_name: model.to_string(),
            question_number: question.number,
            context_provided: with_context,
            response: response.text,
            response_time: response.elapsed_secs,
            grades,
            percentile: 0.0,
        })
    }
}
