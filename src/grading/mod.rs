mod parser;
mod prompt;
#[cfg(test)]
mod tests;

pub use parser::GradeParser;
pub use prompt::{create_prompt, grading_prompt};
