// src/sys/exec.rs
//
// Thin wrappers over tokio::process so every collaborator reports failures
// the same way: program name, exit code, trimmed stderr.

use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, ToolError};

fn spawn_error(program: &str, source: std::io::Error) -> ToolError {
    ToolError::Spawn { program: program.to_string(), source }
}

fn check(program: &str, output: Output) -> Result<String> {
    if !output.status.success() {
        return Err(ToolError::ExternalCommandFailed {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Runs `cmd` to completion; a non-zero exit becomes `ExternalCommandFailed`.
pub async fn run(mut cmd: Command) -> Result<String> {
    let program = cmd.as_std().get_program().to_string_lossy().to_string();
    tracing::debug!("exec: {:?}", cmd.as_std());

    let output = cmd.output().await.map_err(|e| spawn_error(&program, e))?;
    check(&program, output)
}

/// Like [`run`], but feeds `input` on stdin. Used for SQL so that neither
/// statements nor passwords ever show up in the process table.
pub async fn run_with_stdin(mut cmd: Command, input: &[u8]) -> Result<String> {
    let program = cmd.as_std().get_program().to_string_lossy().to_string();
    tracing::debug!("exec (stdin): {:?}", cmd.as_std());

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(&program, e))?;

    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(input).await {
            Ok(()) => {}
            // The client quit before reading everything (bad credentials,
            // syntax error); its exit status and stderr say why.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("{} closed stdin early", program);
            }
            Err(e) => return Err(spawn_error(&program, e)),
        }
        // Dropping closes the pipe so the client sees EOF.
    }

    let output = child.wait_with_output().await.map_err(|e| spawn_error(&program, e))?;
    check(&program, output)
}

/// Exit status only. `None` when the program is not installed.
pub async fn probe(mut cmd: Command) -> Result<Option<bool>> {
    let program = cmd.as_std().get_program().to_string_lossy().to_string();
    match cmd.stdout(Stdio::null()).stderr(Stdio::null()).status().await {
        Ok(status) => Ok(Some(status.success())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(spawn_error(&program, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_stdout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf hello"]);
        assert_eq!(run(cmd).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn run_reports_exit_code_and_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 3"]);
        match run(cmd).await {
            Err(ToolError::ExternalCommandFailed { program, code, stderr }) => {
                assert_eq!(program, "sh");
                assert_eq!(code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stdin_is_forwarded() {
        let cmd = Command::new("cat");
        assert_eq!(run_with_stdin(cmd, b"SELECT 1;").await.unwrap(), "SELECT 1;");
    }

    #[tokio::test]
    async fn early_exit_keeps_the_child_error() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo 'Access denied' >&2; exit 1"]);
        // Far larger than a pipe buffer, so the write outlives the child.
        let input = vec![b'x'; 4 * 1024 * 1024];
        match run_with_stdin(cmd, &input).await {
            Err(ToolError::ExternalCommandFailed { code, stderr, .. }) => {
                assert_eq!(code, 1);
                assert_eq!(stderr, "Access denied");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn probe_distinguishes_missing_programs() {
        assert_eq!(probe(Command::new("true")).await.unwrap(), Some(true));
        assert_eq!(probe(Command::new("false")).await.unwrap(), Some(false));
        assert_eq!(probe(Command::new("/nonexistent/kari-probe")).await.unwrap(), None);
    }
}
