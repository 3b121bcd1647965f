//! Script runner
//!
//! Feeds input lines through [`ScriptCommand::parse`] and acts on them:
//! plain lines are posted, `cmd:` lines sleep, wait, or stop the script.
//! Malformed commands are logged and skipped.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use fchat_client::{ChatClient, SendError, WaitOutcome};
use fchat_protocol::ScriptCommand;

/// What to do after a script step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlow {
    /// Keep going (or, from [`ScriptRunner::run`], the input is exhausted)
    Continue,
    /// Stop and exit the process with this code
    Exit(i32),
}

/// Executes script lines against a client
pub struct ScriptRunner<'a> {
    client: &'a ChatClient,
}

impl<'a> ScriptRunner<'a> {
    /// Create a runner for `client`
    pub fn new(client: &'a ChatClient) -> Self {
        Self { client }
    }

    /// Run one line.
    ///
    /// Only a failed send is an error; it is fatal to the script.
    pub async fn run_line(&self, line: &str) -> Result<ScriptFlow, SendError> {
        let command = match ScriptCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Ignoring script line {:?}: {}", line, e);
                return Ok(ScriptFlow::Continue);
            }
        };

        match command {
            ScriptCommand::Sleep(duration) => {
                tracing::info!("Sleeping for {}ms", duration.as_millis());
                tokio::time::sleep(duration).await;
            }
            ScriptCommand::WaitFor(target) => {
                tracing::info!("Waiting for '{}'", target);
                match self.client.wait_for(&target).await {
                    WaitOutcome::Matched => tracing::info!("Got '{}', proceeding", target),
                    WaitOutcome::Interrupted => {
                        tracing::warn!("Stopped waiting for '{}', proceeding", target)
                    }
                }
            }
            ScriptCommand::Exit(code) => {
                tracing::info!("Exiting with exit code {}", code);
                return Ok(ScriptFlow::Exit(code));
            }
            ScriptCommand::Message(text) => {
                self.client.post_message(&text).await?;
            }
        }

        Ok(ScriptFlow::Continue)
    }

    /// Run every line of `input` in order.
    ///
    /// Returns [`ScriptFlow::Exit`] if the script asked to exit, otherwise
    /// [`ScriptFlow::Continue`] once the input is exhausted.
    pub async fn run<R>(&self, input: R) -> Result<ScriptFlow>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read script input")? {
            if let ScriptFlow::Exit(code) = self.run_line(&line).await? {
                return Ok(ScriptFlow::Exit(code));
            }
        }

        tracing::debug!("Script input exhausted");
        Ok(ScriptFlow::Continue)
    }
}
