//! Provider subprocess protocol.
//!
//! This module handles communication with external provider binaries
//! (e.g., `famsync-provider-caldir`) using JSON over stdin/stdout.
//!
//! Any executable that speaks the JSON protocol can be a provider. A
//! provider that cannot be started, hangs, or answers garbage is treated
//! as an unavailable calendar, never as a rejected write.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::event::CalendarId;
use crate::remote::protocol::{Command, ErrorKind, ProviderCommand, Request, Response};

pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn binary_name(&self) -> String {
        format!("famsync-provider-{}", self.0)
    }

    fn binary_path(&self, calendar: &CalendarId) -> SyncResult<PathBuf> {
        let binary_name = self.binary_name();
        which::which(&binary_name).map_err(|_| {
            SyncError::unavailable(
                calendar,
                format!("provider '{}' not found (is {binary_name} in PATH?)", self.0),
            )
        })
    }

    /// Call a typed provider command on behalf of `calendar`.
    ///
    /// The response type is inferred from the command's associated type.
    pub async fn call<C: ProviderCommand>(
        &self,
        calendar: &CalendarId,
        cmd: C,
    ) -> SyncResult<C::Response> {
        timeout(PROVIDER_TIMEOUT, self.call_raw(calendar, C::command(), cmd))
            .await
            .map_err(|_| {
                SyncError::unavailable(
                    calendar,
                    format!("provider timed out after {}s", PROVIDER_TIMEOUT.as_secs()),
                )
            })?
    }

    /// Low-level call that sends a command with params and deserializes the response.
    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        calendar: &CalendarId,
        command: Command,
        params: P,
    ) -> SyncResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| SyncError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json =
            serde_json::to_string(&request).map_err(|e| SyncError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path(calendar)?;
        debug!(provider = %self.0, ?command, calendar = %calendar, "Calling provider");

        let unavailable = |reason: String| SyncError::unavailable(calendar, reason);

        let mut child = TokioCommand::new(&binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| unavailable(format!("failed to spawn {}: {e}", binary_path.display())))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| unavailable("provider stdin not captured".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await
            .map_err(|e| unavailable(format!("failed to write request: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| unavailable(format!("failed to read response: {e}")))?;

        if !output.status.success() {
            return Err(unavailable(format!(
                "provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(unavailable("provider returned no response".into()));
        }

        let response: Response<R> = serde_json::from_str(&response_str)
            .map_err(|e| unavailable(format!("failed to parse response: {e}")))?;

        match response {
            Response::Success { data } => Ok(data),
            Response::Error {
                error,
                kind: ErrorKind::Rejected,
            } => Err(SyncError::rejected(error)),
            Response::Error {
                error,
                kind: ErrorKind::Unavailable,
            } => Err(unavailable(error)),
        }
    }
}
