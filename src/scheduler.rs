//! One recurring poll task per watched chat.
//!
//! A timer moves `Idle -> Scheduled -> Running -> Scheduled ...` until it is
//! cancelled. Each tick carries only the chat id and subscription generation
//! and re-reads the registry, so a stop or restart that lands while a tick is
//! in flight is seen by the next tick and the stale watermark update is
//! rejected by [`WatchRegistry::advance_watermark`].
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use teloxide::types::ChatId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::fetcher::fetch_recent_repos;
use crate::gateway::ChatGateway;
use crate::github::GithubApi;
use crate::registry::{Subscription, WatchRegistry};
use crate::report::{build_report, format_fetch_error, format_report};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Scheduled,
    Running,
    Cancelled,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The subscription was stopped or replaced; nothing was done.
    Vanished,
    /// Listing repositories failed; the error was sent and the watermark kept.
    FetchFailed,
    /// No qualifying activity; nothing was sent, the watermark advanced.
    Quiet,
    /// A report covering this many repositories was sent.
    Reported(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub first_delay: Duration,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_secs(5),
            interval: Duration::from_secs(120),
        }
    }
}

/// Handle to a running poll task. Dropping it also stops the task.
pub struct PollTimer {
    cancel: watch::Sender<bool>,
    state: watch::Receiver<PollState>,
    task: JoinHandle<()>,
}

impl fmt::Debug for PollTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollTimer")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PollTimer {
    pub(crate) fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>, watch::Sender<PollState>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel, cancel_rx) = watch::channel(false);
        let (state_tx, state) = watch::channel(PollState::Idle);
        state_tx.send_replace(PollState::Scheduled);
        let task = tokio::spawn(run(cancel_rx, state_tx));
        Self {
            cancel,
            state,
            task,
        }
    }

    /// Request cancellation. A tick already running finishes first.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

#[derive(Clone)]
pub struct PollScheduler {
    registry: Arc<WatchRegistry>,
    github: Arc<dyn GithubApi>,
    gateway: Arc<dyn ChatGateway>,
    settings: PollSettings,
}

impl fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollScheduler")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PollScheduler {
    pub fn new(
        registry: Arc<WatchRegistry>,
        github: Arc<dyn GithubApi>,
        gateway: Arc<dyn ChatGateway>,
        settings: PollSettings,
    ) -> Self {
        Self {
            registry,
            github,
            gateway,
            settings,
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Track `account` for `chat_id`, replacing any current watch.
    pub fn start_watch(&self, chat_id: ChatId, account: &str) -> Subscription {
        let subscription = self
            .registry
            .start_watch(chat_id, account, |sub| self.arm(sub));
        info!(%chat_id, account, "started watch");
        subscription
    }

    /// Stop tracking for `chat_id`. Returns whether a watch existed.
    pub fn stop_watch(&self, chat_id: ChatId) -> bool {
        let stopped = self.registry.stop_watch(chat_id);
        if stopped {
            info!(%chat_id, "stopped watch");
        }
        stopped
    }

    /// Spawn the recurring timer bound to `subscription`.
    pub fn arm(&self, subscription: &Subscription) -> PollTimer {
        let this = self.clone();
        let chat_id = subscription.chat_id;
        let id = subscription.id;
        PollTimer::spawn(move |cancel, state| this.run_timer(chat_id, id, cancel, state))
    }

    async fn run_timer(
        self,
        chat_id: ChatId,
        id: Uuid,
        mut cancel: watch::Receiver<bool>,
        state: watch::Sender<PollState>,
    ) {
        let mut ticker = time::interval_at(
            Instant::now() + self.settings.first_delay,
            self.settings.interval.max(MIN_INTERVAL),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.changed() => break,
            }
            if *cancel.borrow() {
                break;
            }

            state.send_replace(PollState::Running);
            if self.poll_once(chat_id, id).await == TickOutcome::Vanished {
                break;
            }
            state.send_replace(PollState::Scheduled);
        }

        state.send_replace(PollState::Cancelled);
        debug!(%chat_id, %id, "poll timer finished");
    }

    /// Run one fetch, report and advance cycle for generation `id` of `chat_id`.
    #[instrument(skip(self))]
    pub async fn poll_once(&self, chat_id: ChatId, id: Uuid) -> TickOutcome {
        let Some(subscription) = self.registry.get(chat_id).filter(|s| s.id == id) else {
            debug!("subscription gone; skipping tick");
            return TickOutcome::Vanished;
        };

        let poll_start = self.registry.now();
        let since = subscription.watermark;
        let account = subscription.account.as_str();

        let repos = match fetch_recent_repos(self.github.as_ref(), account, since).await {
            Ok(repos) => repos,
            Err(err) => {
                warn!(%err, account, "failed to list repositories; watermark kept");
                self.gateway
                    .send_message(chat_id, &format_fetch_error(&err), false)
                    .await;
                return TickOutcome::FetchFailed;
            }
        };

        let report = build_report(self.github.as_ref(), account, repos, since).await;
        let outcome = if report.is_empty() {
            TickOutcome::Quiet
        } else {
            self.gateway
                .send_message(chat_id, &format_report(account, &report), true)
                .await;
            info!(account, repos = report.len(), "sent activity report");
            TickOutcome::Reported(report.len())
        };

        if !self.registry.advance_watermark(chat_id, id, poll_start) {
            debug!("subscription replaced during tick; watermark not advanced");
        }
        outcome
    }

    /// Cancel every timer and wait for the tasks to finish.
    pub async fn shutdown(&self) {
        let timers = self.registry.drain();
        info!(timers = timers.len(), "stopping poll timers");
        join_all(timers.into_iter().map(PollTimer::join)).await;
    }
}
