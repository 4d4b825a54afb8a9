use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::{AbortHandle, JoinHandle};

use crate::domain::{Job, JobId};

use super::api::{ClientError, JobsApi};
use super::session::SessionState;

/// Running status poll for one job. Dropping it aborts the task.
pub(crate) struct PollHandle {
    pub(crate) job_id: JobId,
    pub(crate) generation: u64,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub(crate) fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) struct Poller {
    pub(crate) api: Arc<dyn JobsApi>,
    pub(crate) state: Arc<RwLock<SessionState>>,
    pub(crate) updates: Arc<watch::Sender<Option<Job>>>,
    pub(crate) interval: Duration,
}

impl Poller {
    pub(crate) fn spawn(self, job_id: JobId, generation: u64) -> PollHandle {
        let task = tokio::spawn(self.run(job_id, generation));
        PollHandle {
            job_id,
            generation,
            task,
        }
    }

    async fn run(self, job_id: JobId, generation: u64) {
        tracing::debug!(job_id = %job_id, "Polling started");
        loop {
            tokio::time::sleep(self.interval).await;

            match self.api.get(job_id).await {
                Ok(job) => {
                    let still_active = job.status.is_active();
                    {
                        let mut state = self.state.write().await;
                        // A response that raced a newer action must not overwrite it.
                        if !state.is_current_poll(generation) {
                            tracing::debug!(job_id = %job_id, "Superseded poll result dropped");
                            return;
                        }
                        state.replace(job.clone());
                    }
                    self.updates.send_replace(Some(job));
                    if !still_active {
                        break;
                    }
                }
                Err(ClientError::NotFound) => {
                    let mut state = self.state.write().await;
                    if !state.is_current_poll(generation) {
                        return;
                    }
                    state.remove(job_id);
                    break;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(job_id = %job_id, error = %e, "Poll failed, retrying");
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Poll stopped");
                    break;
                }
            }
        }

        let finished = {
            let mut state = self.state.write().await;
            state.finish_poll(generation)
        };
        // Dropped outside the lock; aborting our own finishing task is a no-op.
        drop(finished);
        tracing::debug!(job_id = %job_id, "Polling stopped");
    }
}
