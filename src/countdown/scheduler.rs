//! Interval-driven tick producer
//!
//! Each started countdown gets a fresh `CountdownId`. Ticks carry that id,
//! so a tick already sitting in the channel when its countdown is cancelled
//! can be recognized as stale and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Identifies one countdown instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountdownId(u64);

impl std::fmt::Display for CountdownId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "countdown-{}", self.0)
    }
}

/// One elapsed interval of a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// The countdown instance that produced this tick
    pub countdown: CountdownId,
}

/// Errors that can occur when starting a countdown
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("{0} is already running")]
    AlreadyRunning(CountdownId),
}

/// A live countdown task
struct ActiveCountdown {
    id: CountdownId,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Starts and cancels countdown tick tasks
pub struct CountdownScheduler {
    period: Duration,
    max_ticks: u8,
    tick_tx: mpsc::Sender<Tick>,
    active: Option<ActiveCountdown>,
    next_id: u64,
}

impl CountdownScheduler {
    /// Create a scheduler that emits up to `max_ticks` ticks, `period` apart
    pub fn new(period: Duration, max_ticks: u8, tick_tx: mpsc::Sender<Tick>) -> Self {
        Self {
            period,
            max_ticks,
            tick_tx,
            active: None,
            next_id: 0,
        }
    }

    /// Start a new countdown instance
    ///
    /// Must be called from within a tokio runtime. Fails if a countdown is
    /// already live; cancel it first.
    pub fn start(&mut self) -> Result<CountdownId, SchedulerError> {
        if let Some(active) = &self.active {
            return Err(SchedulerError::AlreadyRunning(active.id));
        }

        self.next_id += 1;
        let id = CountdownId(self.next_id);
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(run_ticks(
            id,
            self.period,
            self.max_ticks,
            self.tick_tx.clone(),
            cancel_token.clone(),
        ));

        info!(%id, period_ms = self.period.as_millis() as u64, "countdown started");

        self.active = Some(ActiveCountdown {
            id,
            cancel_token,
            handle,
        });
        Ok(id)
    }

    /// Cancel the live countdown, if any
    ///
    /// Returns true if a countdown was cancelled. Once this returns, no tick
    /// from that instance will pass `is_current`.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                active.cancel_token.cancel();
                active.handle.abort();
                info!(id = %active.id, "countdown cancelled");
                true
            }
            None => false,
        }
    }

    /// Check whether a tick belongs to the live countdown
    pub fn is_current(&self, id: CountdownId) -> bool {
        self.current() == Some(id)
    }

    /// Id of the live countdown
    pub fn current(&self) -> Option<CountdownId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Check if a countdown is live
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for CountdownScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Tick loop for a single countdown instance
async fn run_ticks(
    id: CountdownId,
    period: Duration,
    max_ticks: u8,
    tick_tx: mpsc::Sender<Tick>,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for n in 1..=max_ticks {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!(%id, "tick loop cancelled");
                return;
            }
            _ = ticker.tick() => {
                debug!(%id, tick = n, "tick");
                if tick_tx.send(Tick { countdown: id }).await.is_err() {
                    debug!(%id, "tick receiver closed");
                    return;
                }
            }
        }
    }

    debug!(%id, "tick loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const PERIOD: Duration = Duration::from_secs(1);

    fn create_scheduler(max_ticks: u8) -> (CountdownScheduler, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel(16);
        (CountdownScheduler::new(PERIOD, max_ticks, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_bounded_ticks() {
        let (mut scheduler, mut rx) = create_scheduler(3);
        let id = assert_ok!(scheduler.start());

        for _ in 0..3 {
            let tick = rx.recv().await.unwrap();
            assert_eq!(tick.countdown, id);
        }

        // Loop finished, sender clone dropped; the scheduler still holds one
        tokio::time::sleep(PERIOD * 5).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (mut scheduler, mut rx) = create_scheduler(10);
        assert_ok!(scheduler.start());

        tokio::time::sleep(PERIOD / 2).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(PERIOD).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_rejected() {
        let (mut scheduler, _rx) = create_scheduler(10);
        let id = assert_ok!(scheduler.start());

        let SchedulerError::AlreadyRunning(running) = assert_err!(scheduler.start());
        assert_eq!(running, id);
        assert!(scheduler.is_current(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (mut scheduler, mut rx) = create_scheduler(10);
        let id = assert_ok!(scheduler.start());

        rx.recv().await.unwrap();
        assert!(scheduler.cancel());
        assert!(!scheduler.is_current(id));
        assert!(!scheduler.is_running());

        tokio::time::sleep(PERIOD * 3).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (mut scheduler, _rx) = create_scheduler(10);
        assert!(!scheduler.cancel());
        assert_ok!(scheduler.start());
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_gets_fresh_id() {
        let (mut scheduler, _rx) = create_scheduler(10);
        let first = assert_ok!(scheduler.start());
        scheduler.cancel();
        let second = assert_ok!(scheduler.start());

        assert_ne!(first, second);
        assert!(scheduler.is_current(second));
        assert!(!scheduler.is_current(first));
    }
}
