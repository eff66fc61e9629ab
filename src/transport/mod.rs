//! Remote command execution transport
//!
//! Abstraction over "run this command on host X, get exit code and stdout".
//! Transport failures (the session could not be established or broke) are
//! `Err`; a command that ran and exited non-zero is a protocol success and
//! comes back in `ExecOutput`, so callers choose whether a non-zero exit is
//! fatal. The production implementation shells out to the system `ssh`/`scp`
//! binaries; `ScriptedExecutor` is the test double.

pub mod mock;
pub mod ssh;

pub use mock::ScriptedExecutor;
pub use ssh::SshExecutor;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::Path;

/// Outcome of one remotely executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Remote exit code
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout with surrounding whitespace removed, for single-token output
    /// such as pids and addresses
    pub fn trimmed(&self) -> String {
        self.stdout.trim().to_string()
    }
}

/// Executes commands and uploads files on remote hosts
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command on a host.
    ///
    /// `Err` is reserved for transport failures; command failures are
    /// returned as a non-zero `exit_code`. No retry is attempted here.
    async fn exec(&self, host: &str, command: &str) -> Result<ExecOutput>;

    /// Upload a local file or directory to a path on the host
    async fn upload(&self, host: &str, local: &Path, remote: &str) -> Result<()>;

    /// Run a command and treat a non-zero exit as a command error
    async fn exec_checked(&self, host: &str, command: &str) -> Result<String> {
        let output = self.exec(host, command).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(AppError::command(
                host,
                output.exit_code,
                format!("`{}` failed", command),
            ))
        }
    }

    /// Run an ordered command chain within one logical session.
    ///
    /// The chain short-circuits on the first transport or command failure,
    /// so a later step can never mask an earlier one.
    async fn run_sequence(&self, host: &str, commands: &[String]) -> Result<()> {
        for command in commands {
            self.exec_checked(host, command).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_output_success() {
        let ok = ExecOutput {
            exit_code: 0,
            stdout: "4211\n".to_string(),
        };
        assert!(ok.success());
        assert_eq!(ok.trimmed(), "4211");

        let failed = ExecOutput {
            exit_code: 1,
            stdout: String::new(),
        };
        assert!(!failed.success());
    }

    #[tokio::test]
    async fn test_exec_checked_maps_exit_code() {
        let executor = ScriptedExecutor::new();
        executor.push_exec("147.75.1.2", ExecOutput {
            exit_code: 2,
            stdout: String::new(),
        });

        let err = executor
            .exec_checked("147.75.1.2", "pkill netserver")
            .await
            .unwrap_err();
        match err {
            AppError::Command { host, exit_code, .. } => {
                assert_eq!(host, "147.75.1.2");
                assert_eq!(exit_code, 2);
            }
            other => panic!("expected command error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_sequence_short_circuits() {
        let executor = ScriptedExecutor::new();
        executor.push_exec("h", ExecOutput { exit_code: 0, stdout: String::new() });
        executor.push_exec("h", ExecOutput { exit_code: 1, stdout: String::new() });
        // a third response is queued but must never be consumed
        executor.push_exec("h", ExecOutput { exit_code: 0, stdout: String::new() });

        let commands = vec![
            "step1.sh".to_string(),
            "step2.sh".to_string(),
            "step3.sh".to_string(),
        ];
        let err = executor.run_sequence("h", &commands).await.unwrap_err();
        assert_eq!(err.category(), "COMMAND");

        let calls = executor.exec_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1, "step2.sh");
    }

    #[tokio::test]
    async fn test_run_sequence_runs_all_on_success() {
        let executor = ScriptedExecutor::new();
        for _ in 0..3 {
            executor.push_exec("h", ExecOutput { exit_code: 0, stdout: String::new() });
        }

        let commands = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        executor.run_sequence("h", &commands).await.unwrap();
        assert_eq!(executor.exec_calls().len(), 3);
    }
}
