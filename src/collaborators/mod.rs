use std::time::{Duration, Instant};

use tracing::debug;

use crate::errors::EvalError;
use crate::grading::{GradeParser, grading_prompt};
use crate::model::GradeBreakdown;

mod process;
#[cfg(test)]
mod tests;

pub use process::CommandTemplate;
use process::{ProcessRun, run_with_stdin};

const STDERR_EXCERPT_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub elapsed_secs: f64,
}

pub trait ModelQuery {
    fn query(&self, model_id: &str, prompt: &str) -> Result<ModelResponse, EvalError>;
}

pub trait Grader {
    fn grade(
        &self,
        question: &str,
        response: &str,
        context: Option<&str>,
        elapsed_secs: f64,
    ) -> Result<GradeBreakdown, EvalError>;
}

#[derive(Debug, Clone)]
pub struct CommandModelQuery {
    template: CommandTemplate,
    timeout: Duration,
}

impl CommandModelQuery {
    pub fn new(template: CommandTemplate, timeout: Duration) -> Self {
        Self { template, timeout }
    }
}

impl ModelQuery for CommandModelQuery {
    fn query(&self, model_id: &str, prompt: &str) -> Result<ModelResponse, EvalError> {
        let (program, args) = self.template.render(model_id);
        debug!(model = %model_id, program = %program, "querying model");

        let started = Instant::now();
        let run = run_with_stdin(&program, &args, prompt, self.timeout)
            .map_err(|err| EvalError::query(model_id, format!("failed to run {program}: {err}")))?;
        let elapsed_secs = started.elapsed().as_secs_f64();

        let stdout = finished_stdout(run, self.timeout)
            .map_err(|message| EvalError::query(model_id, message))?;
        let text = stdout.trim().to_string();
        if text.is_empty() {
            return Err(EvalError::query(model_id, "model returned an empty response"));
        }

        Ok(ModelResponse { text, elapsed_secs })
    }
}

#[derive(Debug)]
pub struct CommandGrader {
    template: CommandTemplate,
    grader_model: String,
    parser: GradeParser,
    timeout: Duration,
}

impl CommandGrader {
    pub fn new(
        template: CommandTemplate,
        grader_model: impl Into<String>,
        parser: GradeParser,
        timeout: Duration,
    ) -> Self {
        Self {
            template,
            grader_model: grader_model.into(),
            parser,
            timeout,
        }
    }
}

impl Grader for CommandGrader {
    fn grade(
        &self,
        question: &str,
        response: &str,
        context: Option<&str>,
        elapsed_secs: f64,
    ) -> Result<GradeBreakdown, EvalError> {
        debug!(
            grader_model = %self.grader_model,
            has_context = context.is_some(),
            response_chars = response.chars().count(),
            "grading response"
        );

        let prompt = grading_prompt(
            question,
            response,
            elapsed_secs,
            self.parser.profile(),
            self.parser.format(),
        );
        let (program, args) = self.template.render(&self.grader_model);
        let run = run_with_stdin(&program, &args, &prompt, self.timeout)
            .map_err(|err| EvalError::Grading(format!("failed to run {program}: {err}")))?;
        let stdout = finished_stdout(run, self.timeout).map_err(EvalError::Grading)?;

        self.parser.parse(&stdout)
    }
}

fn finished_stdout(run: ProcessRun, timeout: Duration) -> Result<String, String> {
    match run {
        ProcessRun::TimedOut => Err(format!("timed out after {timeout:?}")),
        ProcessRun::Finished {
            success: false,
            code,
            stderr,
            ..
        } => {
            let code = code.map_or_else(|| "signal".to_string(), |code| code.to_string());
            let stderr: String = stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            Err(format!("command exited with {code}: {stderr}"))
        }
        ProcessRun::Finished { stdout, .. } => Ok(stdout),
    }
}
