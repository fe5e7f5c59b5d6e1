use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::PollingConfig;
use crate::error::{PortalError, Result};
use crate::models::topic::{Column, SubmitterType, TopicRow};
use crate::services::api::SharedTransport;
use crate::services::topics::{transform_batch, TopicBatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Loading,
    Success,
    Failed,
}

/// What the proposed-topics table renders.
#[derive(Debug, Clone)]
pub struct TopicViewState {
    pub submitter: SubmitterType,
    pub state: FetchState,
    pub rows: Vec<TopicRow>,
    pub columns: Vec<Column>,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TopicViewState {
    fn new(submitter: SubmitterType) -> Self {
        Self {
            submitter,
            state: FetchState::Idle,
            rows: Vec::new(),
            columns: Vec::new(),
            error: None,
            last_updated: None,
        }
    }
}

struct Shared {
    transport: SharedTransport,
    request_timeout: Duration,
    view: Mutex<TopicViewState>,
    in_flight: AtomicBool,
    alive: AtomicBool,
    completed: watch::Sender<u64>,
}

impl Shared {
    /// A panic elsewhere must not take the table down with it.
    fn view(&self) -> MutexGuard<'_, TopicViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A mounted proposed-topics view: one poll timer, at most one fetch in flight.
pub struct TopicView {
    shared: Arc<Shared>,
    ticker: Option<JoinHandle<()>>,
}

impl TopicView {
    /// Mount the view and start polling. The first fetch starts immediately.
    pub fn mount(
        transport: SharedTransport,
        polling: &PollingConfig,
        submitter: SubmitterType,
    ) -> Self {
        let (completed, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            transport,
            request_timeout: polling.request_timeout,
            view: Mutex::new(TopicViewState::new(submitter)),
            in_flight: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            completed,
        });

        let period = polling.interval.max(Duration::from_millis(1));
        let ticker_shared = Arc::clone(&shared);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                trigger_fetch(&ticker_shared);
            }
        });

        log::info!("Topic view mounted for {} topics", submitter);
        Self {
            shared,
            ticker: Some(ticker),
        }
    }

    pub fn snapshot(&self) -> TopicViewState {
        self.shared.view().clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Select another tab and fetch its topics. The poll timer keeps running.
    ///
    /// Returns false when the tab is already selected or the view is shut
    /// down. If a fetch for the old tab is still in flight, its result is
    /// dropped and the fetch for the new tab starts right after it.
    pub fn switch_tab(&self, submitter: SubmitterType) -> bool {
        if !self.shared.alive.load(Ordering::Acquire) {
            return false;
        }
        {
            let mut view = self.shared.view();
            if view.submitter == submitter {
                return false;
            }
            log::info!("Tab: {}", submitter);
            view.submitter = submitter;
        }
        if !trigger_fetch(&self.shared) {
            log::debug!("{} fetch queued behind the one in flight", submitter);
        }
        true
    }

    /// Manual retry after a failure. Skipped while a fetch is in flight.
    pub fn retry(&self) -> bool {
        trigger_fetch(&self.shared)
    }

    pub fn detail(&self, key: &str) -> Option<TopicRow> {
        let view = self.shared.view();
        view.rows.iter().find(|row| row.key == key).cloned()
    }

    /// Counter bumped each time a fetch outcome (rows or error) lands in the
    /// view. Results dropped for a stale tab or after shutdown do not count.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.completed.subscribe()
    }

    /// Stop the timer and drop any result that arrives afterwards.
    pub fn shutdown(&mut self) {
        self.shared.alive.store(false, Ordering::Release);
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            log::info!("Topic view unmounted");
        }
    }
}

impl Drop for TopicView {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn trigger_fetch(shared: &Arc<Shared>) -> bool {
    if !shared.alive.load(Ordering::Acquire) {
        return false;
    }
    if shared
        .in_flight
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        log::debug!("Topic fetch still in flight, skipping");
        return false;
    }

    let submitter = {
        let mut view = shared.view();
        view.state = FetchState::Loading;
        view.error = None;
        view.submitter
    };

    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        let result = fetch_topics(&shared, submitter).await;

        if !shared.alive.load(Ordering::Acquire) {
            log::debug!("Topic view gone, discarding {} fetch result", submitter);
            shared.in_flight.store(false, Ordering::Release);
            return;
        }

        let applied = apply_result(&shared, submitter, result);
        shared.in_flight.store(false, Ordering::Release);

        if applied {
            shared.completed.send_modify(|count| *count += 1);
        } else {
            trigger_fetch(&shared);
        }
    });
    true
}

/// The request runs in its own task and only races the timer. When the timer
/// wins the request keeps going and its answer is ignored.
async fn fetch_topics(shared: &Shared, submitter: SubmitterType) -> Result<TopicBatch> {
    let endpoint = submitter.endpoint();
    let transport = Arc::clone(&shared.transport);
    let request = tokio::spawn(async move { transport.get(&endpoint, None).await });

    let payload = tokio::select! {
        joined = request => match joined {
            Ok(result) => result?,
            Err(err) => return Err(PortalError::Network(format!("Topic request failed: {}", err))),
        },
        _ = tokio::time::sleep(shared.request_timeout) => {
            return Err(PortalError::Timeout("Request timed out".to_string()));
        }
    };
    transform_batch(payload, submitter)
}

/// Returns false when the tab changed while the fetch was running; the result
/// is then dropped and a new fetch is due.
fn apply_result(shared: &Shared, submitter: SubmitterType, result: Result<TopicBatch>) -> bool {
    let mut view = shared.view();
    if view.submitter != submitter {
        log::debug!("Tab changed, discarding {} fetch result", submitter);
        return false;
    }

    match result {
        Ok(batch) => {
            log::debug!("Loaded {} {} topics", batch.rows.len(), submitter);
            view.rows = batch.rows;
            view.columns = batch.columns;
            view.state = FetchState::Success;
            view.last_updated = Some(Utc::now());
        }
        Err(err) => {
            log::error!("Error fetching topics: {}", err);
            view.error = Some(format!("Failed to fetch topics: {}", err));
            view.state = FetchState::Failed;
        }
    }
    true
}
