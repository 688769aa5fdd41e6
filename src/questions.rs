use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::errors::EvalError;
use crate::model::Question;

pub fn load_questions(questions_dir: &Path, contexts_dir: &Path) -> Result<Vec<Question>> {
    if !questions_dir.is_dir() {
        return Err(EvalError::NotFound {
            what: "questions directory",
            path: questions_dir.to_path_buf(),
        }
        .into());
    }
    if !contexts_dir.is_dir() {
        return Err(EvalError::NotFound {
            what: "contexts directory",
            path: contexts_dir.to_path_buf(),
        }
        .into());
    }

    let pattern = Regex::new(r"^question_(\d+)\.txt$")
        .context("failed to compile question filename regex")?;

    let mut questions = Vec::new();
    let mut seen: HashMap<u32, PathBuf> = HashMap::new();
    let entries = fs::read_dir(questions_dir)
        .with_context(|| format!("failed to read {}", questions_dir.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", questions_dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(captures) = pattern.captures(filename) else {
            debug!(file = %filename, "skipping non-question file");
            continue;
        };
        let number = captures[1]
            .parse::<u32>()
            .with_context(|| format!("invalid question number in filename: {filename}"))?;
        if number == 0 {
            return Err(EvalError::config(format!(
                "question numbers start at 1: {}",
                path.display()
            ))
            .into());
        }
        if let Some(previous) = seen.insert(number, path.clone()) {
            return Err(EvalError::config(format!(
                "question {number} defined twice: {} and {}",
                previous.display(),
                path.display()
            ))
            .into());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?
            .trim()
            .to_string();
        if text.is_empty() {
            warn!(file = %path.display(), "skipping empty question file");
            continue;
        }

        let context_path = contexts_dir.join(format!("context_{number}.txt"));
        questions.push(Question {
            number,
            text,
            context_path: context_path.is_file().then_some(context_path),
        });
    }

    questions.sort_by_key(|question| question.number);

    info!(
        count = questions.len(),
        with_context = questions.iter().filter(|q| q.context_path.is_some()).count(),
        "questions loaded"
    );
    Ok(questions)
}

pub fn parse_question_numbers(raw: &str) -> Result<Vec<u32>, EvalError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<u32>()
                .map_err(|_| EvalError::config(format!("invalid question number: {value:?}")))
        })
        .collect()
}

pub fn select_questions(
    questions: Vec<Question>,
    numbers: Option<&[u32]>,
) -> Result<Vec<Question>, EvalError> {
    let Some(numbers) = numbers else {
        if questions.is_empty() {
            return Err(EvalError::config("no questions found"));
        }
        return Ok(questions);
    };

    let selected: Vec<Question> = questions
        .into_iter()
        .filter(|question| numbers.contains(&question.number))
        .collect();
    if selected.is_empty() {
        return Err(EvalError::config(format!(
            "no questions found matching numbers: {numbers:?}"
        )));
    }
    Ok(selected)
}

pub fn questions_fingerprint(questions: &[Question]) -> String {
    let mut hasher = Sha256::new();
    for question in questions {
        hasher.update(question.number.to_le_bytes());
        hasher.update(question.text.as_bytes());
        hasher.update([0_u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("fixture write");
    }

    fn fixture_dirs() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
        let root = tempfile::tempdir().expect("tempdir");
        let questions = root.path().join("questions");
        let contexts = root.path().join("contexts");
        fs::create_dir_all(&questions).expect("questions dir");
        fs::create_dir_all(&contexts).expect("contexts dir");
        (root, questions, contexts)
    }

    #[test]
    fn load_questions_orders_numerically_and_attaches_contexts() {
        let (_root, questions_dir, contexts_dir) = fixture_dirs();
        write(&questions_dir, "question_10.txt", "  Tenth question?\n");
        write(&questions_dir, "question_2.txt", "How do I troubleshoot SELinux denials?");
        write(&questions_dir, "notes.md", "ignored");
        write(&questions_dir, "question_3.txt", "  \n");
        write(&contexts_dir, "context_2.txt", "SELinux troubleshooting guide");

        let questions = load_questions(&questions_dir, &contexts_dir).expect("load questions");

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].number, 2);
        assert_eq!(questions[1].number, 10);
        assert_eq!(questions[1].text, "Tenth question?");

        let context = questions[0]
            .load_context()
            .expect("context readable")
            .expect("context attached");
        assert!(context.contains("SELinux troubleshooting"));
        assert!(questions[1].context_path.is_none());
    }

    #[test]
    fn load_questions_requires_both_directories() {
        let (root, questions_dir, contexts_dir) = fixture_dirs();

        let missing_questions = load_questions(&root.path().join("nope"), &contexts_dir)
            .expect_err("missing questions dir");
        assert!(matches!(
            missing_questions.downcast_ref::<EvalError>(),
            Some(EvalError::NotFound { what: "questions directory", .. })
        ));

        let missing_contexts = load_questions(&questions_dir, &root.path().join("nope"))
            .expect_err("missing contexts dir");
        assert!(matches!(
            missing_contexts.downcast_ref::<EvalError>(),
            Some(EvalError::NotFound { what: "contexts directory", .. })
        ));
    }

    #[test]
    fn load_questions_rejects_zero_and_repeated_numbers() {
        let (_root, questions_dir, contexts_dir) = fixture_dirs();
        write(&questions_dir, "question_0.txt", "Zeroth?");
        let err = load_questions(&questions_dir, &contexts_dir).expect_err("zero rejected");
        assert!(matches!(
            err.downcast_ref::<EvalError>(),
            Some(EvalError::Configuration(_))
        ));

        fs::remove_file(questions_dir.join("question_0.txt")).expect("remove fixture");
        write(&questions_dir, "question_1.txt", "First?");
        write(&questions_dir, "question_01.txt", "First again?");
        let err = load_questions(&questions_dir, &contexts_dir).expect_err("repeat rejected");
        assert!(err.to_string().contains("question 1 defined twice"));
    }

    #[test]
    fn parse_question_numbers_handles_spacing_and_blanks() {
        assert_eq!(parse_question_numbers("1, 2,3").expect("valid"), vec![1, 2, 3]);
        assert_eq!(parse_question_numbers("5").expect("valid"), vec![5]);
        assert_eq!(parse_question_numbers("4,,").expect("valid"), vec![4]);
        assert!(matches!(
            parse_question_numbers("1,x"),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn select_questions_rejects_empty_selection() {
        let questions = vec![Question {
            number: 1,
            text: "q".to_string(),
            context_path: None,
        }];

        let kept = select_questions(questions.clone(), Some(&[1, 7])).expect("one match");
        assert_eq!(kept.len(), 1);

        let err = select_questions(questions, Some(&[7])).expect_err("no match");
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn fingerprint_changes_with_question_text() {
        let mut questions = vec![Question {
            number: 1,
            text: "q".to_string(),
            context_path: None,
        }];
        let before = questions_fingerprint(&questions);
        questions[0].text.push('!');
        assert_ne!(before, questions_fingerprint(&questions));
    }
}
