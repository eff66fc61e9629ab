//! Scripted executor for testing
//!
//! Queues per-host responses and captures executed commands and uploads for
//! verification. Hosts with no queued response answer with exit 0 and empty
//! output, so tests only script the calls they care about.

use crate::error::{AppError, Result};
use crate::transport::{ExecOutput, RemoteExecutor};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One scripted reply for an `exec` call
#[derive(Debug, Clone)]
enum ScriptedReply {
    Output(ExecOutput),
    TransportFailure(String),
}

#[derive(Debug, Default)]
struct ScriptedInner {
    exec_replies: HashMap<String, VecDeque<ScriptedReply>>,
    command_rules: Vec<(String, String, ScriptedReply)>,
    exec_calls: Vec<(String, String)>,
    upload_calls: Vec<(String, PathBuf, String)>,
    upload_failures: HashMap<String, String>,
}

/// Scripted remote executor for tests
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    inner: Arc<Mutex<ScriptedInner>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next `exec` reply for a host
    pub fn push_exec(&self, host: &str, output: ExecOutput) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .exec_replies
            .entry(host.to_string())
            .or_default()
            .push_back(ScriptedReply::Output(output));
    }

    /// Queue a successful `exec` reply with the given stdout
    pub fn push_stdout(&self, host: &str, stdout: &str) {
        self.push_exec(
            host,
            ExecOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
            },
        );
    }

    /// Queue a failing `exec` reply with the given exit code
    pub fn push_exit_code(&self, host: &str, exit_code: i32) {
        self.push_exec(
            host,
            ExecOutput {
                exit_code,
                stdout: String::new(),
            },
        );
    }

    /// Queue a transport failure for the next `exec` on a host
    pub fn push_transport_failure(&self, host: &str, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .exec_replies
            .entry(host.to_string())
            .or_default()
            .push_back(ScriptedReply::TransportFailure(message.to_string()));
    }

    /// Answer every `exec` on `host` whose command contains `pattern` with
    /// the given output. Rules apply when no queued reply is pending and are
    /// matched in insertion order.
    pub fn set_command_rule(&self, host: &str, pattern: &str, output: ExecOutput) {
        let mut inner = self.inner.lock().unwrap();
        inner.command_rules.push((
            host.to_string(),
            pattern.to_string(),
            ScriptedReply::Output(output),
        ));
    }

    /// Rule variant answering with a successful reply and the given stdout
    pub fn set_stdout_rule(&self, host: &str, pattern: &str, stdout: &str) {
        self.set_command_rule(
            host,
            pattern,
            ExecOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
            },
        );
    }

    /// Rule variant answering with the given exit code
    pub fn set_exit_code_rule(&self, host: &str, pattern: &str, exit_code: i32) {
        self.set_command_rule(
            host,
            pattern,
            ExecOutput {
                exit_code,
                stdout: String::new(),
            },
        );
    }

    /// Make every upload to a host fail
    pub fn fail_uploads(&self, host: &str, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .upload_failures
            .insert(host.to_string(), message.to_string());
    }

    /// All executed commands, in call order, as (host, command)
    pub fn exec_calls(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().exec_calls.clone()
    }

    /// Commands executed on one host, in call order
    pub fn commands_for(&self, host: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .exec_calls
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// All uploads, in call order, as (host, local, remote)
    pub fn upload_calls(&self) -> Vec<(String, PathBuf, String)> {
        self.inner.lock().unwrap().upload_calls.clone()
    }
}

impl Clone for ScriptedExecutor {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn exec(&self, host: &str, command: &str) -> Result<ExecOutput> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .exec_calls
            .push((host.to_string(), command.to_string()));

        let queued = inner
            .exec_replies
            .get_mut(host)
            .and_then(VecDeque::pop_front);
        let reply = queued.or_else(|| {
            inner
                .command_rules
                .iter()
                .find(|(h, pattern, _)| h == host && command.contains(pattern.as_str()))
                .map(|(_, _, reply)| reply.clone())
        });

        match reply {
            Some(ScriptedReply::Output(output)) => Ok(output),
            Some(ScriptedReply::TransportFailure(message)) => {
                Err(AppError::transport(format!("{}: {}", host, message)))
            }
            None => Ok(ExecOutput {
                exit_code: 0,
                stdout: String::new(),
            }),
        }
    }

    async fn upload(&self, host: &str, local: &Path, remote: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .upload_calls
            .push((host.to_string(), local.to_path_buf(), remote.to_string()));

        if let Some(message) = inner.upload_failures.get(host) {
            return Err(AppError::transport(format!("{}: {}", host, message)));
        }
        Ok(())
    }
}
