use std::time::Duration;

use super::*;
use crate::cli::{GradeFormat, MissingFieldPolicy, ScoringProfile};

fn template(raw: &str) -> CommandTemplate {
    CommandTemplate::parse(raw).expect("template should parse")
}

fn grader(command: &str) -> CommandGrader {
    let parser = GradeParser::new(
        GradeFormat::Text,
        MissingFieldPolicy::Fail,
        ScoringProfile::Standard,
    )
    .expect("parser should build");
    CommandGrader::new(
        template(command),
        "judge-model",
        parser,
        Duration::from_secs(10),
    )
}

#[test]
fn template_splits_quotes_and_substitutes_model() {
    let parsed = template("llm-cli ask --model {model} --system 'be brief'");
    let (program, args) = parsed.render("granite-3-8b");

    assert_eq!(program, "llm-cli");
    assert_eq!(args, vec!["ask", "--model", "granite-3-8b", "--system", "be brief"]);
}

#[test]
fn template_rejects_empty_and_unbalanced_commands() {
    assert!(matches!(
        CommandTemplate::parse("   "),
        Err(EvalError::Configuration(_))
    ));
    assert!(matches!(
        CommandTemplate::parse("llm-cli 'unterminated"),
        Err(EvalError::Configuration(_))
    ));
}

#[cfg(unix)]
#[test]
fn command_query_returns_stdout_and_elapsed_time() {
    let query = CommandModelQuery::new(
        template("/bin/sh -c 'echo \"model={model}\"; cat'"),
        Duration::from_secs(10),
    );

    let response = query.query("m1", "How do I list open ports?").expect("query succeeds");
    assert_eq!(response.text, "model=m1\nHow do I list open ports?");
    assert!(response.elapsed_secs >= 0.0);
}

#[cfg(unix)]
#[test]
fn command_query_reports_failure_exit_status() {
    let query = CommandModelQuery::new(
        template("/bin/sh -c 'echo quota exceeded >&2; exit 3'"),
        Duration::from_secs(10),
    );

    let err = query.query("m1", "prompt").expect_err("non-zero exit fails");
    match err {
        EvalError::Query { model, message } => {
            assert_eq!(model, "m1");
            assert!(message.contains("exited with 3"));
            assert!(message.contains("quota exceeded"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[cfg(unix)]
#[test]
fn command_query_rejects_empty_output() {
    let query = CommandModelQuery::new(template("/bin/sh -c 'true'"), Duration::from_secs(10));
    assert!(matches!(
        query.query("m1", "prompt"),
        Err(EvalError::Query { .. })
    ));
}

#[cfg(unix)]
#[test]
fn command_query_kills_commands_that_exceed_timeout() {
    let query = CommandModelQuery::new(
        template("/bin/sh -c 'exec sleep 5'"),
        Duration::from_millis(200),
    );

    let err = query.query("slow", "prompt").expect_err("timeout fails");
    assert!(err.to_string().contains("timed out after 200ms"));
}

#[cfg(unix)]
#[test]
fn command_grader_parses_grader_stdout() {
    let grader = grader(
        "/bin/sh -c 'cat >/dev/null; printf \"ACCURACY: 80\\nCOMPLETENESS: 70\\nCLARITY: 60\\n\\nClear but shallow.\\n\"'",
    );

    let grades = grader
        .grade("question", "answer", Some("context"), 3.0)
        .expect("grading succeeds");
    assert_eq!(grades.accuracy(), 80);
    assert_eq!(grades.completeness(), 70);
    assert_eq!(grades.clarity(), 60);
    assert_eq!(grades.explanation(), "Clear but shallow.");
}

#[cfg(unix)]
#[test]
fn command_grader_surfaces_parse_failures() {
    let grader = grader("/bin/sh -c 'cat >/dev/null; echo ACCURACY: 80'");

    let err = grader
        .grade("question", "answer", None, 3.0)
        .expect_err("missing fields fail under the fail policy");
    assert!(matches!(err, EvalError::Parse { .. }));
}
