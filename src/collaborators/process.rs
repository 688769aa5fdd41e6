use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::errors::EvalError;

const MODEL_PLACEHOLDER: &str = "{model}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn parse(raw: &str) -> Result<Self, EvalError> {
        let mut parts = shlex::split(raw)
            .ok_or_else(|| EvalError::config(format!("unbalanced quoting in command: {raw}")))?
            .into_iter();
        let program = parts
            .next()
            .ok_or_else(|| EvalError::config("command must not be empty"))?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn render(&self, model: &str) -> (String, Vec<String>) {
        let args = self
            .args
            .iter()
            .map(|arg| arg.replace(MODEL_PLACEHOLDER, model))
            .collect();
        (self.program.replace(MODEL_PLACEHOLDER, model), args)
    }
}

#[derive(Debug)]
pub(super) enum ProcessRun {
    Finished {
        success: bool,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

pub(super) fn run_with_stdin(
    program: &str,
    args: &[String],
    input: &str,
    timeout: Duration,
) -> io::Result<ProcessRun> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdin = child.stdin.take();
    let input = input.to_string();
    let writer = thread::spawn(move || {
        if let Some(mut stdin) = stdin {
            // The child may exit without reading its input.
            let _ = stdin.write_all(input.as_bytes());
        }
    });
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(ProcessRun::TimedOut);
        }
        Err(err) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }
    };

    let _ = writer.join();
    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(ProcessRun::Finished {
        success: status.success(),
        code: status.code(),
        stdout,
        stderr,
    })
}

fn spawn_reader<R>(stream: Option<R>) -> thread::JoinHandle<String>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}
