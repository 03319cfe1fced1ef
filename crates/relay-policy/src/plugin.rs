//! External write policy plugin.
//!
//! The plugin is any executable that reads one JSON request per line on
//! stdin and answers with one JSON response per line on stdout:
//!
//! ```text
//! -> {"type":"new","event":{...},"receivedAt":1700000000,"sourceType":"IP4","sourceInfo":"1.2.3.4"}
//! <- {"id":"<event id>","action":"accept"|"reject"|"shadowReject","msg":"..."}
//! ```
//!
//! The process is started on first use and restarted when the executable's
//! modification time changes, so operators can edit rules without
//! restarting the relay.

use crate::error::PolicyError;
use crate::WritePolicy;
use relay_types::{SourceFamily, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::SystemTime;

/// Message sent to the client whenever the plugin itself misbehaves.
const INTERNAL_ERROR: &str = "error: internal error";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PluginRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    event: &'a Value,
    received_at: u64,
    source_type: &'static str,
    source_info: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum PluginAction {
    Accept,
    Reject,
    ShadowReject,
}

#[derive(Deserialize)]
struct PluginResponse {
    id: String,
    action: PluginAction,
    #[serde(default)]
    msg: String,
}

struct RunningPlugin {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// A write policy backed by an external plugin process.
pub struct PluginPolicy {
    command: String,
    running: Option<RunningPlugin>,
    last_modified: Option<SystemTime>,
}

impl PluginPolicy {
    /// Creates a policy for the given executable. Nothing is started until
    /// the first decision.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            running: None,
            last_modified: None,
        }
    }

    /// Whether a plugin process is currently running.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn modified_time(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.command)
            .and_then(|m| m.modified())
            .ok()
    }

    fn restart_if_modified(&mut self) {
        let modified = self.modified_time();
        if self.running.is_some() && modified != self.last_modified {
            tracing::info!(plugin = %self.command, "write policy plugin changed, reloading");
            self.stop();
        }
    }

    fn ensure_running(&mut self) -> Result<&mut RunningPlugin, PolicyError> {
        if self.running.is_none() {
            self.last_modified = self.modified_time();

            let mut child = Command::new(&self.command)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|source| PolicyError::Spawn {
                    command: self.command.clone(),
                    source,
                })?;

            let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PolicyError::Closed);
            };

            tracing::info!(plugin = %self.command, pid = child.id(), "started write policy plugin");

            self.running = Some(RunningPlugin {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            });
        }

        self.running.as_mut().ok_or(PolicyError::Closed)
    }

    fn stop(&mut self) {
        if let Some(mut plugin) = self.running.take() {
            let _ = plugin.child.kill();
            let _ = plugin.child.wait();
        }
    }

    fn decide(
        &mut self,
        event: &Value,
        received_at: u64,
        source: SourceFamily,
        source_addr: &[u8],
    ) -> Result<Verdict, PolicyError> {
        self.restart_if_modified();
        let plugin = self.ensure_running()?;

        let request = PluginRequest {
            kind: "new",
            event,
            received_at,
            source_type: source.as_str(),
            source_info: SourceFamily::format_addr(source_addr),
        };

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        plugin.stdin.write_all(line.as_bytes())?;
        plugin.stdin.flush()?;

        let mut reply = String::new();
        if plugin.stdout.read_line(&mut reply)? == 0 {
            return Err(PolicyError::Closed);
        }

        let response: PluginResponse = serde_json::from_str(reply.trim())?;

        let expected = event["id"].as_str().unwrap_or_default();
        if response.id != expected {
            return Err(PolicyError::IdMismatch {
                expected: expected.to_string(),
                got: response.id,
            });
        }

        Ok(match response.action {
            PluginAction::Accept => Verdict::Accept(response.msg),
            PluginAction::Reject => Verdict::Reject(response.msg),
            PluginAction::ShadowReject => Verdict::ShadowReject(response.msg),
        })
    }
}

impl WritePolicy for PluginPolicy {
    fn accept_event(
        &mut self,
        event: &Value,
        received_at: u64,
        source: SourceFamily,
        source_addr: &[u8],
    ) -> Verdict {
        match self.decide(event, received_at, source, source_addr) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::error!(plugin = %self.command, error = %e, "write policy plugin failed");
                self.stop();
                Verdict::Reject(INTERNAL_ERROR.to_string())
            }
        }
    }
}

impl Drop for PluginPolicy {
    fn drop(&mut self) {
        self.stop();
    }
}
