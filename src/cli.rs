use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "modelgrader",
    version,
    about = "Resumable batch grading of language models against a question set"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query every model with every question, with and without context, and grade the answers.
    Run(RunArgs),
    /// Inspect an existing results file.
    Status(StatusArgs),
    /// Recompute percentile ranks over an existing results file.
    Rank(RankArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ScoringProfile {
    /// Accuracy 50%, completeness 25%, clarity 25%.
    Standard,
    /// Accuracy 50%, completeness 20%, clarity 20%, response time 10%.
    Timed,
}

impl ScoringProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Timed => "timed",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum GradeFormat {
    /// Free text with `LABEL: <score>` lines.
    Text,
    /// A JSON object with one key per score plus `explanation`.
    Json,
}

impl GradeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MissingFieldPolicy {
    /// Reject grading output that lacks a required score.
    Fail,
    /// Substitute the midpoint score and log a warning.
    Default,
}

impl MissingFieldPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Default => "default",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ResultsFileArgs {
    #[arg(
        long,
        env = "MODELGRADER_OUTPUT_CSV_PATH",
        default_value = "llm_grading_results.csv"
    )]
    pub output_csv_path: PathBuf,

    #[arg(long, env = "MODELGRADER_SCORING_PROFILE", value_enum, default_value_t = ScoringProfile::Standard)]
    pub scoring_profile: ScoringProfile,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub results: ResultsFileArgs,

    #[arg(long, env = "MODELGRADER_QUESTIONS_DIR", default_value = "data/questions")]
    pub questions_dir: PathBuf,

    #[arg(long, env = "MODELGRADER_CONTEXTS_DIR", default_value = "data/contexts")]
    pub contexts_dir: PathBuf,

    /// Comma-separated question numbers, e.g. `1,2,3`. All questions when omitted.
    #[arg(long, env = "MODELGRADER_QUESTION_NUMBERS")]
    pub question_numbers: Option<String>,

    #[arg(long = "model", env = "MODELGRADER_MODELS", value_delimiter = ',')]
    pub models: Vec<String>,

    /// JSON catalog of model specs to select chat-capable text models from.
    #[arg(long, env = "MODELGRADER_MODEL_CATALOG")]
    pub model_catalog: Option<PathBuf>,

    /// Command that answers a prompt read from stdin; `{model}` is replaced by the model id.
    #[arg(long, env = "MODELGRADER_QUERY_COMMAND")]
    pub query_command: String,

    /// Command that grades a prompt read from stdin; `{model}` is replaced by the grader model.
    #[arg(long, env = "MODELGRADER_GRADER_COMMAND")]
    pub grader_command: String,

    #[arg(long, env = "MODELGRADER_GRADER_MODEL", default_value = "gemini-2.5-flash-lite")]
    pub grader_model: String,

    #[arg(long, env = "MODELGRADER_GRADE_FORMAT", value_enum, default_value_t = GradeFormat::Text)]
    pub grade_format: GradeFormat,

    #[arg(long, env = "MODELGRADER_MISSING_FIELD_POLICY", value_enum, default_value_t = MissingFieldPolicy::Fail)]
    pub missing_field_policy: MissingFieldPolicy,

    #[arg(long, env = "MODELGRADER_REQUEST_TIMEOUT", default_value_t = 120)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "MODELGRADER_MANIFEST_DIR", default_value = "manifests")]
    pub manifest_dir: PathBuf,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub results: ResultsFileArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RankArgs {
    #[command(flatten)]
    pub results: ResultsFileArgs,
}
