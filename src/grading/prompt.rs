use crate::cli::{GradeFormat, ScoringProfile};

const SYSTEM_PREAMBLE: &str = "You are a helpful assistant that answers questions from system administrators using Red Hat Enterprise Linux.";
const RULE: &str = "--------------------------------------------------";

pub fn create_prompt(question: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|text| !text.is_empty()) {
        Some(context) => format!(
            "{SYSTEM_PREAMBLE}\nAdditional context information is provided below to help you answer the question.\n\n\
             Context information:\n{RULE}\n{context}\n{RULE}\n\n\
             Question:\n{RULE}\n{question}\n{RULE}\n\n\
             Please provide a clear, accurate, and complete answer based on the context provided and your existing training.\n"
        ),
        None => format!(
            "{SYSTEM_PREAMBLE}\n\n\
             Question:\n{RULE}\n{question}\n{RULE}\n\n\
             Please provide a clear, accurate, and complete answer.\n"
        ),
    }
}

pub fn grading_prompt(
    question: &str,
    response: &str,
    elapsed_secs: f64,
    profile: ScoringProfile,
    format: GradeFormat,
) -> String {
    let mut prompt = format!(
        "You are a strict expert grader evaluating answers about Red Hat Enterprise Linux system administration.\n\
         Use the full score range and apply identical deductions for identical flaws.\n\n\
         ORIGINAL QUESTION:\n{question}\n\n\
         MODEL'S RESPONSE:\n{response}\n\n"
    );

    if profile == ScoringProfile::Timed {
        prompt.push_str(&format!("RESPONSE TIME: {elapsed_secs:.2} seconds\n\n"));
    }

    prompt.push_str(
        "Score each category from 0 to 100. Scores above 85 are reserved for near-flawless answers; \
         most good answers land between 60 and 80. When unsure between two scores, pick the lower one.\n\n\
         ACCURACY: is the answer technically correct for RHEL? Any technical error caps the score below 70.\n\
         COMPLETENESS: does it cover every aspect of the question, with examples where useful? A partial answer caps at 50.\n\
         CLARITY: is it well organised and easy to follow? Poor structure caps at 60.\n",
    );
    if profile == ScoringProfile::Timed {
        prompt.push_str(
            "RESPONSE_TIME: how acceptable is the response time? Under 10 seconds is excellent, over 2 minutes is poor.\n",
        );
    }

    prompt.push('\n');
    match format {
        GradeFormat::Text => {
            prompt.push_str("Answer in exactly this format:\n");
            prompt.push_str("ACCURACY: <score>\nCOMPLETENESS: <score>\nCLARITY: <score>\n");
            if profile == ScoringProfile::Timed {
                prompt.push_str("RESPONSE_TIME: <score>\n");
            }
            prompt.push_str(
                "\nThen one or two sentences explaining what prevented higher scores.\n",
            );
        }
        GradeFormat::Json => {
            prompt.push_str("Answer with a JSON object only, with these fields:\n");
            prompt.push_str("- accuracy: integer 0-100\n- completeness: integer 0-100\n- clarity: integer 0-100\n");
            if profile == ScoringProfile::Timed {
                prompt.push_str("- response_time: integer 0-100\n");
            }
            prompt.push_str(
                "- explanation: one or two sentences explaining what prevented higher scores\n",
            );
        }
    }

    prompt.push_str(&format!("\n{}\n", weights_note(profile)));
    prompt
}

fn weights_note(profile: ScoringProfile) -> &'static str {
    match profile {
        ScoringProfile::Standard => {
            "Final weighting: accuracy 50%, completeness 25%, clarity 25%."
        }
        ScoringProfile::Timed => {
            "Final weighting: accuracy 50%, completeness 20%, clarity 20%, response time 10%."
        }
    }
}
