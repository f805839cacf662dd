//! Runs the long-lived tasks (HTTP server, draft flusher) side by side.
//!
//! Every child gets a child of the shared cancellation token. Ctrl-C, or the
//! first child to fail, cancels the token; `run` returns once all children
//! have finished, with the first error if there was one.

use std::future::Future;

use anyhow::{Error, Result};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

pub struct Supervisor {
    shutdown: CancellationToken,
    tasks: JoinSet<(String, Result<()>)>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Token cancelled when the supervisor shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn spawn<F, Fut>(&mut self, name: &'static str, factory: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let shutdown = self.shutdown.child_token();
        self.tasks.spawn(async move {
            let result = factory(shutdown).await;
            (name.to_string(), result)
        });
    }

    pub async fn run(mut self) -> Result<()> {
        let mut first_err: Option<Error> = None;

        while !self.tasks.is_empty() {
            tokio::select! {
                Some(outcome) = self.tasks.join_next() => {
                    self.handle_task_outcome(&mut first_err, outcome);
                }
                _ = tokio::signal::ctrl_c(), if !self.shutdown.is_cancelled() => {
                    tracing::info!("interrupt received, shutting down");
                    self.shutdown.cancel();
                }
            }
        }

        if let Some(err) = first_err {
            Err(err)
        } else {
            Ok(())
        }
    }

    fn handle_task_outcome(
        &self,
        first_err: &mut Option<Error>,
        outcome: std::result::Result<(String, Result<()>), JoinError>,
    ) {
        match outcome {
            Ok((name, Ok(()))) => {
                tracing::info!("child `{name}` exited gracefully");
            }
            Ok((name, Err(err))) => {
                tracing::error!("child `{name}` exited with error: {err:#}");
                if first_err.is_none() {
                    *first_err = Some(err);
                }
                self.begin_shutdown();
            }
            Err(join_err) => {
                tracing::error!("child panicked: {join_err:?}");
                if first_err.is_none() {
                    *first_err = Some(join_err.into());
                }
                self.begin_shutdown();
            }
        }
    }

    fn begin_shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::warn!("supervisor shutting down");
            self.shutdown.cancel();
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
