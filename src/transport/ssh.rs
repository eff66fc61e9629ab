//! SSH/SCP transport shelling out to the system binaries
//!
//! Every remote session is a child process reaped on every exit path, so the
//! underlying connection is released exactly once whether the command
//! succeeds, fails, or the session never comes up. ssh reserves exit status
//! 255 for its own failures; that status and a failure to spawn the binary
//! map to transport errors, everything else is the remote command's result.

use crate::error::{AppError, Result};
use crate::transport::{ExecOutput, RemoteExecutor};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// ssh reserves this exit status for its own connection-level failures
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Remote executor backed by the system `ssh` and `scp` binaries
#[derive(Debug, Clone)]
pub struct SshExecutor {
    user: String,
    key_path: PathBuf,
    connect_timeout_secs: u64,
}

impl SshExecutor {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(user: S, key_path: P) -> Self {
        Self {
            user: user.into(),
            key_path: key_path.into(),
            connect_timeout_secs: 10,
        }
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Common option set for both ssh and scp invocations.
    ///
    /// Fleet hosts are created and destroyed per run, so host keys are never
    /// known in advance and are not recorded.
    fn common_options(&self) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-i".to_string(),
            self.key_path.to_string_lossy().into_owned(),
        ]
    }

    fn destination(&self, host: &str) -> String {
        format!("{}@{}", self.user, host)
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn exec(&self, host: &str, command: &str) -> Result<ExecOutput> {
        let output = Command::new("ssh")
            .args(self.common_options())
            .arg(self.destination(host))
            .arg(command)
            .output()
            .await
            .map_err(|e| AppError::transport(format!("{}: failed to spawn ssh: {}", host, e)))?;

        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code == SSH_TRANSPORT_FAILURE {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::transport(format!(
                "{}: ssh connection failed: {}",
                host,
                stderr.trim()
            )));
        }

        Ok(ExecOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    async fn upload(&self, host: &str, local: &Path, remote: &str) -> Result<()> {
        let output = Command::new("scp")
            .arg("-r")
            .arg("-q")
            .args(self.common_options())
            .arg(local)
            .arg(format!("{}:{}", self.destination(host), remote))
            .output()
            .await
            .map_err(|e| AppError::transport(format!("{}: failed to spawn scp: {}", host, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AppError::transport(format!(
                "{}: scp upload of {} failed: {}",
                host,
                local.display(),
                stderr.trim()
            )))
        }
    }
}
