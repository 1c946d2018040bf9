// FRM Exporter - Poll scheduler
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Periodic polling of one FRM web server.
//!
//! Each address gets its own task. On every tick it runs the train and
//! power collectors in turn; a failing collector is logged and retried on
//! the next tick. Loops end when the shutdown channel flips to `true` or its
//! sender is dropped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::power::PowerCollector;
use crate::train::TrainCollector;

/// Poll progress shared with the HTTP handlers.
#[derive(Debug)]
pub struct PollState {
    /// Completed poll cycles
    pub polls: AtomicUsize,
    /// Collector runs that failed
    pub failures: AtomicUsize,
    /// Whether at least one train poll has succeeded
    pub ready: AtomicBool,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            polls: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub trains_ok: bool,
    pub power_ok: bool,
}

/// Polls a single FRM address on a fixed interval.
#[derive(Debug, Clone)]
pub struct Poller {
    address: String,
    session: String,
    poll_interval: Duration,
    trains: TrainCollector,
    power: PowerCollector,
    state: Arc<PollState>,
}

impl Poller {
    pub fn new(
        address: impl Into<String>,
        session: impl Into<String>,
        poll_interval: Duration,
        trains: TrainCollector,
        power: PowerCollector,
        state: Arc<PollState>,
    ) -> Self {
        Self {
            address: address.into(),
            session: session.into(),
            poll_interval,
            trains,
            power,
            state,
        }
    }

    /// Run one collection cycle against this poller's address.
    pub async fn poll_once(&self) -> PollOutcome {
        let trains_ok = self
            .trains
            .collect(&self.address, &self.session)
            .await
            .is_ok();
        let power_ok = self
            .power
            .collect(&self.address, &self.session)
            .await
            .is_ok();

        if trains_ok {
            self.state.ready.store(true, Ordering::SeqCst);
        }
        let failed = usize::from(!trains_ok) + usize::from(!power_ok);
        self.state.failures.fetch_add(failed, Ordering::SeqCst);
        self.state.polls.fetch_add(1, Ordering::SeqCst);

        PollOutcome {
            trains_ok,
            power_ok,
        }
    }

    /// Poll until `shutdown` reads `true` or its sender goes away.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Polling {} every {}s (session {})",
            self.address,
            self.poll_interval.as_secs(),
            self.session
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        info!("Stopped polling {}", self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FrmClient;
    use crate::power::POWER_ENDPOINT;
    use crate::train::TRAIN_ENDPOINT;
    use frm_companion::ManualClock;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn poller(address: &str, state: Arc<PollState>) -> Poller {
        let client = FrmClient::new(Duration::from_secs(5)).unwrap();
        let timing = Arc::new(frm_companion::TrainCollector::new(Arc::new(
            ManualClock::new(),
        )));
        Poller::new(
            address,
            "default",
            Duration::from_millis(10),
            TrainCollector::new(client.clone(), TRAIN_ENDPOINT, timing),
            PowerCollector::new(client, POWER_ENDPOINT),
            state,
        )
    }

    #[tokio::test]
    async fn test_poll_once_marks_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRAIN_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let state = Arc::new(PollState::default());
        let poller = poller(&server.uri(), Arc::clone(&state));

        let outcome = poller.poll_once().await;
        assert!(outcome.trains_ok);
        // No /getPower mock: that collector fails.
        assert!(!outcome.power_ok);
        assert!(state.ready.load(Ordering::SeqCst));
        assert_eq!(state.polls.load(Ordering::SeqCst), 1);
        assert_eq!(state.failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_ready_until_trains_succeed() {
        let server = MockServer::start().await;
        let state = Arc::new(PollState::default());
        let poller = poller(&server.uri(), Arc::clone(&state));

        let outcome = poller.poll_once().await;
        assert_eq!(outcome, PollOutcome::default());
        assert!(!state.ready.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let server = MockServer::start().await;
        let state = Arc::new(PollState::default());
        let poller = poller(&server.uri(), Arc::clone(&state));
        let (shutdown, receiver) = watch::channel(false);

        let handle = tokio::spawn(async move { poller.run(receiver).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poll loop did not stop")
            .unwrap();

        assert!(state.polls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_shutdown_before_run_is_honoured() {
        let server = MockServer::start().await;
        let state = Arc::new(PollState::default());
        let poller = poller(&server.uri(), Arc::clone(&state));
        let (shutdown, receiver) = watch::channel(false);
        shutdown.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), poller.run(receiver))
            .await
            .expect("poll loop did not stop");

        assert_eq!(state.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_stops_when_sender_dropped() {
        let server = MockServer::start().await;
        let state = Arc::new(PollState::default());
        let poller = poller(&server.uri(), Arc::clone(&state));
        let (shutdown, receiver) = watch::channel(false);
        drop(shutdown);

        tokio::time::timeout(Duration::from_secs(5), poller.run(receiver))
            .await
            .expect("poll loop did not stop");
    }
}
