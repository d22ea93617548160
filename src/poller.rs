//! Poll loop
//!
//! `Idle -> Fetching -> Processing -> Sleeping -> Idle`, forever. One cycle
//! always runs to completion before the next starts.
//!
//! Change detection is gated twice. The in-memory [`StockState`] filters out
//! steady-state products cheaply; only products it reports as changed (or
//! sees for the first time this run) touch the durable [`StockStateStore`].
//! An alert goes out only when both layers agree the product just came back
//! in stock, so a restart never re-alerts on products already announced.

use crate::fetcher::{Fetcher, SnapshotSource};
use crate::notifier::{format_alert, Notifier, TransitionRecord};
use crate::state_store::StockStateStore;
use crate::stock::{normalize, ProductRecord};
use crate::tracker::StockState;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    Processing,
    Sleeping,
}

/// Products handled in one pass over a snapshot
#[derive(Debug, Default)]
pub struct Detection {
    /// Restocks reported by the in-memory layer
    pub candidates: usize,
    /// Restocks confirmed by the durable layer
    pub transitions: Vec<TransitionRecord>,
}

/// Summary of one poll cycle
#[derive(Debug)]
pub struct CycleReport {
    pub source: SnapshotSource,
    pub products: usize,
    pub candidates: usize,
    pub transitions: Vec<TransitionRecord>,
}

pub struct Poller<N: Notifier> {
    fetcher: Fetcher,
    tracker: StockState,
    store: StockStateStore,
    notifier: N,
    interval: Duration,
    jitter: f64,
    state: PollState,
}

impl<N: Notifier> Poller<N> {
    pub fn new(
        fetcher: Fetcher,
        store: StockStateStore,
        notifier: N,
        interval: Duration,
        jitter: f64,
    ) -> Self {
        Self {
            fetcher,
            tracker: StockState::new(),
            store,
            notifier,
            interval,
            jitter: if jitter.is_finite() {
                jitter.clamp(0.0, 1.0)
            } else {
                0.0
            },
            state: PollState::Idle,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn store(&self) -> &StockStateStore {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn enter(&mut self, next: PollState) {
        log::debug!("Poller {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run both change-detection layers over a normalized snapshot.
    pub fn detect(&mut self, products: &[ProductRecord]) -> Detection {
        let mut detection = Detection::default();

        for product in products {
            let seen = self.tracker.observe(product);
            let candidate = seen.is_restock(product.in_stock);
            if candidate {
                detection.candidates += 1;
            }
            if !seen.changed && seen.previous.is_some() {
                continue;
            }

            // Sell-outs and first sightings are written too, so the durable
            // record never holds a stale "in stock" for a later restock.
            let confirmed = match self.store.confirm(&product.id, product.in_stock) {
                Ok(observation) => observation,
                Err(e) => {
                    log::error!("{}; a restart may repeat this alert", e);
                    e.observation
                }
            };

            if candidate && confirmed.is_restock(product.in_stock) {
                detection
                    .transitions
                    .push(TransitionRecord::from_product(product, confirmed.previous));
            }
        }

        detection
    }

    /// Fetch, detect and notify once.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.enter(PollState::Fetching);
        let snapshot = self.fetcher.fetch().await;

        self.enter(PollState::Processing);
        let products = normalize(&snapshot.payload);
        let detection = self.detect(&products);

        for transition in &detection.transitions {
            log::info!(
                "{} ({}) is back in stock (quantity: {:?})",
                transition.name,
                transition.id,
                transition.quantity
            );
            self.notifier.send(&format_alert(transition)).await;
        }

        log::info!(
            "Cycle complete: source={} products={} candidates={} newly_available={}",
            snapshot.source,
            products.len(),
            detection.candidates,
            detection.transitions.len()
        );

        CycleReport {
            source: snapshot.source,
            products: products.len(),
            candidates: detection.candidates,
            transitions: detection.transitions,
        }
    }

    /// Interval plus uniform jitter in `[0, jitter * interval]`
    pub fn sleep_duration(&self) -> Duration {
        if self.jitter <= 0.0 {
            return self.interval;
        }
        let fraction = rand::thread_rng().gen_range(0.0..=self.jitter);
        let extra = Duration::try_from_secs_f64(self.interval.as_secs_f64() * fraction)
            .unwrap_or(Duration::MAX);
        self.interval.saturating_add(extra)
    }

    /// Poll until `shutdown` resolves. Shutdown is only honored while
    /// sleeping; a running cycle always completes first.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            self.run_cycle().await;

            self.enter(PollState::Sleeping);
            let pause = self.sleep_duration();
            log::debug!("Sleeping for {:?}", pause);
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, stopping poller");
                    self.enter(PollState::Idle);
                    return;
                }
                _ = tokio::time::sleep(pause) => {}
            }
            self.enter(PollState::Idle);
        }
    }
}
