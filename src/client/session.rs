use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::AbortHandle;

use crate::domain::{Job, JobId};

use super::api::{ClientError, DeleteOutcome, JobsApi, NewJobRequest};
use super::poller::{PollHandle, Poller};
use super::view::{JobView, view_for};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub page_size: usize,
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            poll_interval: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    List,
    Detail(JobId),
}

pub(crate) struct SessionState {
    jobs: Vec<Job>,
    visible: usize,
    route: Route,
    poll: Option<PollHandle>,
    generation: u64,
}

impl SessionState {
    fn new(visible: usize) -> Self {
        Self {
            jobs: Vec::new(),
            visible,
            route: Route::List,
            poll: None,
            generation: 0,
        }
    }

    /// Replaces the cached copy of `job`, or puts it first when unknown.
    pub(crate) fn replace(&mut self, job: Job) {
        match self.jobs.iter_mut().find(|j| j.id == job.id) {
            Some(slot) => *slot = job,
            None => self.jobs.insert(0, job),
        }
    }

    pub(crate) fn remove(&mut self, id: JobId) {
        self.jobs.retain(|j| j.id != id);
    }

    pub(crate) fn is_current_poll(&self, generation: u64) -> bool {
        self.poll.as_ref().is_some_and(|p| p.generation == generation)
    }

    pub(crate) fn finish_poll(&mut self, generation: u64) -> Option<PollHandle> {
        if self.is_current_poll(generation) {
            self.poll.take()
        } else {
            None
        }
    }

    fn active_job(&self) -> Option<&Job> {
        self.jobs.iter().find(|j| j.status.is_active())
    }

    fn polling(&self) -> Option<JobId> {
        self.poll.as_ref().map(|p| p.job_id)
    }
}

/// Client-side view of one owner's jobs: the cached list, the current route
/// and at most one background status poll.
///
/// Every mutation goes through the server first; the cache only reflects
/// responses. Poll results are also published on [`Self::subscribe`].
pub struct ClientSession {
    api: Arc<dyn JobsApi>,
    config: SessionConfig,
    state: Arc<RwLock<SessionState>>,
    updates: Arc<watch::Sender<Option<Job>>>,
    // Reachable from `Drop` without the async lock.
    poll_abort: Mutex<Option<AbortHandle>>,
}

impl ClientSession {
    pub fn new(api: Arc<dyn JobsApi>, config: SessionConfig) -> Self {
        let (updates, _) = watch::channel(None);
        let visible = config.page_size;
        Self {
            api,
            config,
            state: Arc::new(RwLock::new(SessionState::new(visible))),
            updates: Arc::new(updates),
            poll_abort: Mutex::new(None),
        }
    }

    /// Loads every page of the owner's jobs and resumes polling the active
    /// one, if any, without navigating to it.
    #[tracing::instrument(skip(self))]
    pub async fn mount(&self) -> Result<(), ClientError> {
        let mut jobs = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.api.list(cursor.as_deref()).await?;
            jobs.extend(page.jobs);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let active = {
            let mut state = self.state.write().await;
            state.jobs = jobs;
            state.visible = self.config.page_size;
            state.active_job().map(|j| j.id)
        };

        tracing::debug!(active = ?active, "Session mounted");
        if let Some(id) = active {
            self.start_poll(id).await;
        }
        Ok(())
    }

    pub async fn unmount(&self) {
        let mut state = self.state.write().await;
        state.poll = None;
        state.route = Route::List;
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.state.read().await.jobs.clone()
    }

    /// The display window over the cached list.
    pub async fn visible_jobs(&self) -> Vec<Job> {
        let state = self.state.read().await;
        state.jobs.iter().take(state.visible).cloned().collect()
    }

    pub async fn has_more(&self) -> bool {
        let state = self.state.read().await;
        state.jobs.len() > state.visible
    }

    /// Grows the window by one page. Never fetches.
    pub async fn show_more(&self) {
        let mut state = self.state.write().await;
        if state.jobs.len() > state.visible {
            state.visible += self.config.page_size;
        }
    }

    pub async fn job(&self, id: JobId) -> Option<Job> {
        self.state
            .read()
            .await
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }

    pub async fn view(&self, id: JobId) -> Option<JobView> {
        self.job(id).await.map(|j| view_for(j.status))
    }

    pub async fn active_job(&self) -> Option<Job> {
        self.state.read().await.active_job().cloned()
    }

    pub async fn can_submit(&self) -> bool {
        self.active_job().await.is_none()
    }

    pub async fn route(&self) -> Route {
        self.state.read().await.route
    }

    pub async fn polling_job(&self) -> Option<JobId> {
        self.state.read().await.polling()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Job>> {
        self.updates.subscribe()
    }

    pub async fn submit(&self, request: NewJobRequest) -> Result<Job, ClientError> {
        if let Some(active) = self.active_job().await {
            return Err(ClientError::SubmissionBlocked(Some(active.id)));
        }
        let job = self.api.create(&request).await?;
        self.state.write().await.replace(job.clone());
        Ok(job)
    }

    pub async fn analyze(&self, id: JobId) -> Result<Job, ClientError> {
        let job = self.api.analyze(id).await?;
        self.track(job.clone()).await;
        Ok(job)
    }

    pub async fn start_processing(&self, id: JobId) -> Result<Job, ClientError> {
        let job = self.api.start_processing(id).await?;
        self.track(job.clone()).await;
        Ok(job)
    }

    pub async fn cancel(&self, id: JobId, delete_file: bool) -> Result<Job, ClientError> {
        let job = self.api.cancel(id, delete_file).await?;
        self.track(job.clone()).await;
        Ok(job)
    }

    /// A job the server no longer knows is treated as already deleted and
    /// yields `None`.
    pub async fn delete(
        &self,
        id: JobId,
        cleanup_storage: bool,
    ) -> Result<Option<DeleteOutcome>, ClientError> {
        let outcome = match self.api.delete(id, cleanup_storage).await {
            Ok(outcome) => Some(outcome),
            Err(ClientError::NotFound) => None,
            Err(e) => return Err(e),
        };

        let mut state = self.state.write().await;
        state.remove(id);
        if state.polling() == Some(id) {
            state.poll = None;
        }
        if state.route == Route::Detail(id) {
            state.route = Route::List;
        }
        Ok(outcome)
    }

    /// Switching to another job's detail drops a poll tracking a different
    /// job, then refreshes the target and polls it when active.
    pub async fn navigate(&self, route: Route) -> Result<(), ClientError> {
        {
            let mut state = self.state.write().await;
            state.route = route;
            if let Route::Detail(id) = route {
                if state.polling().is_some_and(|polled| polled != id) {
                    state.poll = None;
                }
            }
        }

        if let Route::Detail(id) = route {
            let job = self.api.get(id).await?;
            self.track(job).await;
        }
        Ok(())
    }

    async fn track(&self, job: Job) {
        let id = job.id;
        let active = job.status.is_active();
        {
            let mut state = self.state.write().await;
            state.replace(job);
            if !active && state.polling() == Some(id) {
                state.poll = None;
            }
        }
        if active {
            self.start_poll(id).await;
        }
    }

    /// Replaces any running poll, including one for the same job: a request
    /// it already has in flight predates the action that got us here.
    async fn start_poll(&self, id: JobId) {
        let mut state = self.state.write().await;
        state.poll = None;
        state.generation += 1;
        let generation = state.generation;
        let poller = Poller {
            api: Arc::clone(&self.api),
            state: Arc::clone(&self.state),
            updates: Arc::clone(&self.updates),
            interval: self.config.poll_interval,
        };
        let handle = poller.spawn(id, generation);
        if let Ok(mut abort) = self.poll_abort.lock() {
            *abort = Some(handle.abort_handle());
        }
        state.poll = Some(handle);
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        let abort = match self.poll_abort.get_mut() {
            Ok(abort) => abort.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(abort) = abort {
            abort.abort();
        }
    }
}
