// src/exec/command.rs

//! The `command` worker: runs a shell command as a child process.

use std::process::Stdio;

use anyhow::{Context, bail};
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tracing::info;

use super::worker::{Worker, WorkerContext};
use crate::types::Payload;

#[derive(Debug, Deserialize)]
struct CommandInput {
    cmd: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandWorker;

impl Worker for CommandWorker {
    fn execute(&mut self, input: &Payload, ctx: &WorkerContext) -> anyhow::Result<Payload> {
        let input: CommandInput =
            serde_json::from_value(input.clone()).context("command input must be { cmd }")?;

        info!(subtask = %ctx.subtask_id, cmd = %input.cmd, "starting command");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&input.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&input.cmd);
            c
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let cancel = ctx.cancellation_token().clone();
        let subtask = ctx.subtask_id.clone();

        let output = ctx.block_on(async move {
            let child = cmd
                .spawn()
                .with_context(|| format!("spawning process for subtask '{subtask}'"))?;

            // Losing the race drops the child, which kills it.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(subtask = %subtask, "cancellation requested; killing command");
                    bail!("command cancelled")
                }
                output = child.wait_with_output() => {
                    output.with_context(|| format!("waiting for process of subtask '{subtask}'"))
                }
            }
        })?;

        let code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        info!(
            subtask = %ctx.subtask_id,
            exit_code = code,
            success = output.status.success(),
            "command exited"
        );

        if !output.status.success() {
            bail!("command exited with code {code}: {}", stderr.trim());
        }

        Ok(json!({
            "exit_code": code,
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}
