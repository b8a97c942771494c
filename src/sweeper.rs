//! Background sweep that closes abandoned rounds.
//!
//! Every interval the sweeper snapshots the rounds past their deadline and
//! finalizes each one independently. A round that was finished, completed
//! or replaced between the snapshot and the finalize step is left alone.

use crate::games::registry::FinalizedRound;
use crate::games::types::GroupId;
use crate::services::PokerDiceService;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// A round closed by the sweeper
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub group_id: GroupId,
    /// Players who never rerolled or passed
    pub auto_passed: Vec<String>,
    pub finalized: FinalizedRound,
}

pub struct ExpirySweeper {
    service: Arc<PokerDiceService>,
    interval: Duration,
    initial_delay: Duration,
    publisher: broadcast::Sender<SweepReport>,
    running: Arc<AtomicBool>,
    shutdown: Notify,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExpirySweeper {
    /// Sweeper that only runs when driven through `sweep_once`
    pub fn new(service: Arc<PokerDiceService>) -> Arc<Self> {
        let config = service.config();
        let interval = config.sweep_interval();
        let initial_delay = config.sweep_initial_delay();
        let (publisher, _) = broadcast::channel(1_024);

        Arc::new(Self {
            service,
            interval,
            initial_delay,
            publisher,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Notify::new(),
            task: Mutex::new(None),
        })
    }

    /// Start the periodic sweep on the current tokio runtime
    pub fn spawn(service: Arc<PokerDiceService>) -> Arc<Self> {
        let sweeper = Self::new(service);
        sweeper.running.store(true, Ordering::SeqCst);
        let handle = sweeper.clone().spawn_task();
        if let Ok(mut task) = sweeper.task.lock() {
            *task = Some(handle);
        }
        sweeper
    }

    /// Receive a report for every round the sweeper closes
    pub fn subscribe(&self) -> broadcast::Receiver<SweepReport> {
        self.publisher.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the task to stop after the sweep in progress, if any
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// Stop and wait for the task to exit
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Expiry sweeper task ended abnormally: {}", e);
            }
        }
    }

    fn spawn_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "🧹 Expiry sweeper started (every {:?}, first run in {:?})",
                self.interval, self.initial_delay
            );

            tokio::select! {
                _ = tokio::time::sleep(self.initial_delay) => {}
                _ = self.shutdown.notified() => {
                    info!("Expiry sweeper stopped before first sweep");
                    return;
                }
            }

            let mut tick = tokio::time::interval(self.interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while self.running.load(Ordering::SeqCst) {
                tokio::select! {
                    biased;
                    _ = self.shutdown.notified() => break,
                    _ = tick.tick() => {
                        self.sweep_once(Utc::now()).await;
                    }
                }
            }

            info!("Expiry sweeper stopped");
        })
    }

    /// Close every round past its deadline at `now`
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Vec<SweepReport> {
        let expired = self.service.registry().expired_rounds(now);
        if expired.is_empty() {
            return Vec::new();
        }
        debug!("Sweep found {} expired rounds", expired.len());

        let finalizations = expired
            .into_iter()
            .map(|(group_id, round_id)| self.service.finalize_expired(group_id, round_id, now));

        let reports: Vec<SweepReport> = join_all(finalizations)
            .await
            .into_iter()
            .flatten()
            .map(|finalized| SweepReport {
                group_id: finalized.group_id,
                auto_passed: finalized.auto_passed.clone(),
                finalized,
            })
            .collect();

        for report in &reports {
            info!(
                "⏰ Round in group {} expired, auto-passed {:?}",
                report.group_id, report.auto_passed
            );
            // No subscribers is fine
            let _ = self.publisher.send(report.clone());
        }

        reports
    }
}
