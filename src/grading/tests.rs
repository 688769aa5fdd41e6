use super::parser::{GradeOutcome, MIDPOINT_SCORE, ScoreField};
use super::*;
use crate::cli::{GradeFormat, MissingFieldPolicy, ScoringProfile};
use crate::errors::EvalError;
use crate::model::NO_EXPLANATION;

fn text_parser(policy: MissingFieldPolicy) -> GradeParser {
    GradeParser::new(GradeFormat::Text, policy, ScoringProfile::Standard)
        .expect("parser should build")
}

fn json_parser(policy: MissingFieldPolicy) -> GradeParser {
    GradeParser::new(GradeFormat::Json, policy, ScoringProfile::Standard)
        .expect("parser should build")
}

#[test]
fn parse_reads_scores_in_any_case_and_order() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let grades = parser
        .parse("clarity: 75\nAccuracy: 70\nCOMPLETENESS: 65\n")
        .expect("all fields present");

    assert_eq!(grades.accuracy(), 70);
    assert_eq!(grades.completeness(), 65);
    assert_eq!(grades.clarity(), 75);
}

#[test]
fn parse_ignores_surrounding_prose() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let raw = "Here are my grades for this response:\n\nACCURACY: 90\nCOMPLETENESS: 85\nCLARITY: 88\n\nThe response was excellent because it covered SELinux contexts.\n";
    let grades = parser.parse(raw).expect("grades should parse");

    assert_eq!(grades.accuracy(), 90);
    assert_eq!(grades.completeness(), 85);
    assert_eq!(grades.clarity(), 88);
    assert_eq!(
        grades.explanation(),
        "The response was excellent because it covered SELinux contexts."
    );
}

#[test]
fn parse_accepts_markdown_and_rubric_decorations() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let raw = "**Accuracy (0-100):** 82\n**Completeness score** = 71\n- Clarity: +64\n";
    let grades = parser.parse(raw).expect("decorated labels should parse");

    assert_eq!(grades.accuracy(), 82);
    assert_eq!(grades.completeness(), 71);
    assert_eq!(grades.clarity(), 64);
}

#[test]
fn parse_clamps_scores_above_range() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let grades = parser
        .parse("ACCURACY: 150\nCOMPLETENESS: 110\nCLARITY: 99999999999999999999999\n")
        .expect("out-of-range scores are clamped, not rejected");

    assert_eq!(grades.accuracy(), 100);
    assert_eq!(grades.completeness(), 100);
    assert_eq!(grades.clarity(), 100);
}

#[test]
fn parse_clamps_negative_scores_to_zero() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let grades = parser
        .parse("ACCURACY: -5\nCOMPLETENESS: -10\nCLARITY: -2\n")
        .expect("negative scores are clamped");

    assert_eq!(grades.accuracy(), 0);
    assert_eq!(grades.completeness(), 0);
    assert_eq!(grades.clarity(), 0);
}

#[test]
fn parse_fails_when_any_single_field_is_missing() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let cases = [
        ("COMPLETENESS: 75\nCLARITY: 80\n", "ACCURACY"),
        ("ACCURACY: 85\nCLARITY: 80\n", "COMPLETENESS"),
        ("ACCURACY: 85\nCOMPLETENESS: 75\n", "CLARITY"),
    ];

    for (raw, expected_missing) in cases {
        let err = parser.parse(raw).expect_err("missing field must fail");
        match err {
            EvalError::Parse { missing } => assert_eq!(missing, vec![expected_missing.to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn match_fields_reports_every_missing_field() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let outcome = parser
        .match_fields("COMPLETENESS: 40\nnothing else")
        .expect("text matching never errors");

    match outcome {
        GradeOutcome::MissingFields { missing, partial } => {
            assert_eq!(missing, vec![ScoreField::Accuracy, ScoreField::Clarity]);
            assert_eq!(partial.get(ScoreField::Completeness), Some(40));
        }
        GradeOutcome::Parsed(grades) => panic!("expected missing fields, got {grades:?}"),
    }
}

#[test]
fn default_policy_substitutes_midpoint_for_missing_fields() {
    let parser = text_parser(MissingFieldPolicy::Default);
    let grades = parser
        .parse("ACCURACY: 85\nCOMPLETENESS: 75\n")
        .expect("default policy never fails on missing fields");

    assert_eq!(grades.accuracy(), 85);
    assert_eq!(grades.completeness(), 75);
    assert_eq!(i64::from(grades.clarity()), MIDPOINT_SCORE);
}

#[test]
fn explanation_is_first_line_after_scores() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let raw = "ACCURACY: 85\nCOMPLETENESS: 75\nCLARITY: 80\n\nJustification: The response was accurate but lacked some detail. It could have included more examples.\nSecond line.\n";
    let grades = parser.parse(raw).expect("grades should parse");

    assert!(grades.explanation().starts_with("The response was accurate"));
    assert!(!grades.explanation().contains("Second line"));
    assert!(grades.explanation().chars().count() <= 200);
}

#[test]
fn explanation_is_truncated_with_ellipsis() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let raw = format!("ACCURACY: 85\nCOMPLETENESS: 75\nCLARITY: 80\n\n{}\n", "A".repeat(300));
    let grades = parser.parse(&raw).expect("grades should parse");

    assert_eq!(grades.explanation().chars().count(), 200);
    assert!(grades.explanation().ends_with("..."));
}

#[test]
fn explanation_placeholder_when_no_free_text_follows() {
    let parser = text_parser(MissingFieldPolicy::Fail);
    let grades = parser
        .parse("ACCURACY: 85\nCOMPLETENESS: 75\nCLARITY: 80\n")
        .expect("grades should parse");

    assert_eq!(grades.explanation(), NO_EXPLANATION);
}

#[test]
fn timed_profile_requires_response_time_field() {
    let parser = GradeParser::new(
        GradeFormat::Text,
        MissingFieldPolicy::Fail,
        ScoringProfile::Timed,
    )
    .expect("parser should build");

    let err = parser
        .parse("ACCURACY: 80\nCOMPLETENESS: 70\nCLARITY: 60\n")
        .expect_err("timed profile needs RESPONSE_TIME");
    assert!(matches!(err, EvalError::Parse { ref missing } if missing == &vec!["RESPONSE_TIME".to_string()]));

    let grades = parser
        .parse("ACCURACY: 80\nCOMPLETENESS: 70\nCLARITY: 60\nRESPONSE_TIME: 95\n")
        .expect("all timed fields present");
    assert_eq!(grades.response_time_score(), Some(95));
    assert_eq!(grades.weighted_score(), 75.5);
}

#[test]
fn json_format_reads_fenced_object() {
    let parser = json_parser(MissingFieldPolicy::Fail);
    let raw = "```json\n{\"accuracy\": 85, \"completeness\": \"75\", \"clarity\": 80.9, \"explanation\": \"Solid answer.\"}\n```";
    let grades = parser.parse(raw).expect("json grades should parse");

    assert_eq!(grades.accuracy(), 85);
    assert_eq!(grades.completeness(), 75);
    assert_eq!(grades.clarity(), 80);
    assert_eq!(grades.explanation(), "Solid answer.");
}

#[test]
fn json_format_defaults_missing_fields_under_default_policy() {
    let parser = json_parser(MissingFieldPolicy::Default);
    let grades = parser
        .parse(r#"{"accuracy": 120, "clarity": 40}"#)
        .expect("default policy fills gaps");

    assert_eq!(grades.accuracy(), 100);
    assert_eq!(grades.completeness(), 50);
    assert_eq!(grades.clarity(), 40);
    assert_eq!(grades.explanation(), NO_EXPLANATION);
}

#[test]
fn json_format_fails_missing_fields_under_fail_policy() {
    let parser = json_parser(MissingFieldPolicy::Fail);
    let err = parser
        .parse(r#"{"accuracy": 90, "completeness": 90}"#)
        .expect_err("clarity missing");
    assert!(matches!(err, EvalError::Parse { .. }));
}

#[test]
fn json_format_rejects_non_json_output() {
    let parser = json_parser(MissingFieldPolicy::Default);
    let err = parser.parse("ACCURACY: 90").expect_err("not json");
    assert!(matches!(err, EvalError::MalformedGrade(_)));
}

#[test]
fn create_prompt_includes_context_only_when_present() {
    let with_context = create_prompt("How do I configure firewalld?", Some("Use firewall-cmd."));
    assert!(with_context.contains("How do I configure firewalld?"));
    assert!(with_context.contains("Context information:"));
    assert!(with_context.contains("Use firewall-cmd."));

    let without = create_prompt("How do I configure firewalld?", None);
    assert!(!without.contains("Context information:"));

    let blank = create_prompt("How do I configure firewalld?", Some("   \n"));
    assert!(!blank.contains("Context information:"));
}

#[test]
fn grading_prompt_mentions_response_time_only_for_timed_profile() {
    let standard = grading_prompt(
        "How do I configure firewalld?",
        "Use firewall-cmd to configure firewalld...",
        4.2,
        ScoringProfile::Standard,
        GradeFormat::Text,
    );
    assert!(standard.contains("How do I configure firewalld?"));
    assert!(standard.contains("ACCURACY"));
    assert!(standard.contains("COMPLETENESS"));
    assert!(standard.contains("CLARITY"));
    assert!(!standard.contains("RESPONSE_TIME"));

    let timed = grading_prompt(
        "q",
        "r",
        4.2,
        ScoringProfile::Timed,
        GradeFormat::Json,
    );
    assert!(timed.contains("response_time"));
    assert!(timed.contains("4.20 seconds"));
}
