use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::catalog::{load_catalog, select_models};
use crate::cli::RunArgs;
use crate::collaborators::{CommandGrader, CommandModelQuery, CommandTemplate};
use crate::commands::rank::rerank;
use crate::errors::EvalError;
use crate::grading::GradeParser;
use crate::model::{EvalRunManifest, ResumeKey, RunCounts, RunPaths};
use crate::orchestrator::{Orchestrator, progress_bar};
use crate::questions::{
    load_questions, parse_question_numbers, questions_fingerprint, select_questions,
};
use crate::report::log_summary;
use crate::store::ResultStore;
use crate::util::{utc_compact_string, utc_rfc3339, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: RunArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("run-{}", utc_compact_string(started_ts));
    let profile = args.results.scoring_profile;

    info!(
        run_id = %run_id,
        output = %args.results.output_csv_path.display(),
        profile = profile.as_str(),
        "starting evaluation run"
    );

    if args.request_timeout_secs == 0 {
        return Err(EvalError::config("request timeout must be at least one second").into());
    }
    let query_template = CommandTemplate::parse(&args.query_command)?;
    let grader_template = CommandTemplate::parse(&args.grader_command)?;
    let question_numbers = args
        .question_numbers
        .as_deref()
        .map(parse_question_numbers)
        .transpose()?;
    let catalog = args
        .model_catalog
        .as_deref()
        .map(load_catalog)
        .transpose()?;
    let models = select_models(&args.models, catalog.as_ref())?;
    let parser = GradeParser::new(args.grade_format, args.missing_field_policy, profile)?;

    let questions = select_questions(
        load_questions(&args.questions_dir, &args.contexts_dir)?,
        question_numbers.as_deref(),
    )?;
    let fingerprint = questions_fingerprint(&questions);
    info!(
        models = models.len(),
        questions = questions.len(),
        grader_model = %args.grader_model,
        "run configured"
    );

    let store = ResultStore::new(&args.results.output_csv_path, profile);
    store.initialize()?;
    let completed = store.load_existing_keys();

    let total_cells = models.len() * questions.len() * 2;
    let already_done = models
        .iter()
        .flat_map(|model| {
            questions.iter().flat_map(move |question| {
                [false, true].map(|with_context| ResumeKey::new(model, question.number, with_context))
            })
        })
        .filter(|key| completed.contains(key))
        .count();
    if already_done > 0 {
        info!(
            completed = already_done,
            remaining = total_cells - already_done,
            "resuming from existing results"
        );
    }

    let timeout = Duration::from_secs(args.request_timeout_secs);
    let query = CommandModelQuery::new(query_template, timeout);
    let grader = CommandGrader::new(grader_template, args.grader_model.clone(), parser, timeout);
    let progress = progress_bar(total_cells as u64, !args.no_progress);

    let outcome =
        Orchestrator::new(&query, &grader, &store, completed, progress).run(&models, &questions);
    if !outcome.failed.is_empty() {
        warn!(failed = outcome.failed.len(), "some cells failed");
    }

    let ranked = rerank(&store).context("failed to finalize results file")?;
    let summary = log_summary(&ranked);

    let finished_ts = Utc::now();
    let manifest_path = args
        .manifest_dir
        .join(format!("eval_run_{}.json", utc_compact_string(started_ts)));
    let manifest = EvalRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        status: if outcome.failed.is_empty() {
            "completed".to_string()
        } else {
            "completed_with_failures".to_string()
        },
        started_at: utc_rfc3339(started_ts),
        finished_at: utc_rfc3339(finished_ts),
        scoring_profile: profile.as_str().to_string(),
        grade_format: args.grade_format.as_str().to_string(),
        missing_field_policy: args.missing_field_policy.as_str().to_string(),
        grader_model: args.grader_model.clone(),
        models,
        question_numbers: questions.iter().map(|question| question.number).collect(),
        questions_fingerprint: fingerprint,
        paths: RunPaths {
            output_csv_path: store.path().display().to_string(),
            questions_dir: args.questions_dir.display().to_string(),
            contexts_dir: args.contexts_dir.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts: RunCounts {
            total_cells: outcome.total_cells,
            skipped: outcome.skipped,
            completed: outcome.results.len(),
            failed: outcome.failed.len(),
            results_in_file: ranked.len(),
        },
        summary,
        failures: outcome.failed,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), run_id = %run_id, "wrote run manifest");
    Ok(())
}
