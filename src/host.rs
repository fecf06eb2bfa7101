//! Host event loop for the poller.
//!
//! Delivers the three event sources (recurring tick, focus gained, focus
//! lost) to a [`Poller`] strictly one at a time. The first tick arrives one
//! full period after the loop starts; the startup refresh happens before it.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::poller::{Poller, PollerState};

/// Signals from the window system (or the operator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    FocusGained,
    FocusLost,
    /// Stop the recurring tick and return the poller.
    Shutdown,
}

/// Sending side of the host's event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl HostHandle {
    /// Creates a handle and the receiving end of its queue.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues `event`. Returns `false` once the host loop has stopped.
    pub fn send(&self, event: HostEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn focus_gained(&self) -> bool {
        self.send(HostEvent::FocusGained)
    }

    pub fn focus_lost(&self) -> bool {
        self.send(HostEvent::FocusLost)
    }

    pub fn shutdown(&self) -> bool {
        self.send(HostEvent::Shutdown)
    }
}

/// Owns the tick timer and the event queue for one poller.
pub struct Host {
    period: Duration,
    rx: mpsc::UnboundedReceiver<HostEvent>,
    state_tx: watch::Sender<PollerState>,
}

impl Host {
    pub fn new(period: Duration) -> (Self, HostHandle) {
        let (handle, rx) = HostHandle::channel();
        let (state_tx, _) = watch::channel(PollerState::new());
        (
            Self {
                period,
                rx,
                state_tx,
            },
            handle,
        )
    }

    /// Receives a copy of the poller state after every handled event.
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state_tx.subscribe()
    }

    /// Runs until [`HostEvent::Shutdown`] or until every [`HostHandle`] is
    /// dropped, then hands the poller back.
    pub async fn run(mut self, mut poller: Poller) -> Poller {
        let fired = poller.on_init();
        info!(
            streams = fired.len(),
            period_ms = self.period.as_millis() as u64,
            "initial refresh"
        );
        self.publish(&poller);

        let start = tokio::time::Instant::now() + self.period;
        let mut tick = tokio::time::interval_at(start, self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick_count: u64 = 0;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    tick_count += 1;
                    let t0 = Instant::now();
                    let fired = poller.on_tick();
                    let elapsed = t0.elapsed();
                    if !fired.is_empty() {
                        debug!(tick_count, fired = ?fired, "tick");
                    }
                    if elapsed > self.period / 2 {
                        warn!(
                            duration_ms = elapsed.as_millis() as u64,
                            period_ms = self.period.as_millis() as u64,
                            "tick exceeded 50% of period"
                        );
                    }
                }
                event = self.rx.recv() => match event {
                    Some(HostEvent::FocusGained) => {
                        poller.on_focus_gain();
                        info!("focus gained: refreshing all streams");
                    }
                    Some(HostEvent::FocusLost) => {
                        poller.on_focus_loss();
                        info!("focus lost: slow refresh cadence");
                    }
                    Some(HostEvent::Shutdown) | None => break,
                },
            }
            self.publish(&poller);
        }

        info!(tick_count, "poller stopped");
        poller
    }

    fn publish(&self, poller: &Poller) {
        self.state_tx.send_replace(poller.state().clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::{ActionError, RefreshAction, StreamId, TICK_PERIOD};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<StreamId>>>;

    fn recording_poller(log: &Log) -> Poller {
        let action = |id: StreamId| -> Box<dyn RefreshAction> {
            let log = log.clone();
            Box::new(move || -> Result<(), ActionError> {
                log.lock().unwrap().push(id);
                Ok(())
            })
        };
        Poller::new(
            action(StreamId::Stats),
            action(StreamId::HitsHistogram),
            action(StreamId::DaysHistogram),
        )
    }

    fn count(log: &Log, id: StreamId) -> usize {
        log.lock().unwrap().iter().filter(|&&s| s == id).count()
    }

    async fn sleep_secs(secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_runs_before_first_tick() {
        let log = Log::default();
        let (host, handle) = Host::new(TICK_PERIOD);
        let state = host.subscribe();
        let task = tokio::spawn(host.run(recording_poller(&log)));

        sleep_secs(5.0).await;
        assert_eq!(log.lock().unwrap().len(), 3);
        assert_eq!(state.borrow().stream(StreamId::Stats).counter, 0);

        sleep_secs(2.0).await;
        assert_eq!(state.borrow().stream(StreamId::Stats).counter, 1);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfocused_stats_refresh_every_tenth_tick() {
        let log = Log::default();
        let (host, handle) = Host::new(TICK_PERIOD);
        let task = tokio::spawn(host.run(recording_poller(&log)));

        sleep_secs(6.0 * 10.0 + 1.0).await;
        handle.shutdown();
        let poller = task.await.unwrap();

        // Startup refresh plus the tenth tick.
        assert_eq!(count(&log, StreamId::Stats), 2);
        assert_eq!(count(&log, StreamId::HitsHistogram), 1);
        assert_eq!(poller.state().stream(StreamId::Stats).counter, 0);
        assert_eq!(poller.state().stream(StreamId::HitsHistogram).counter, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focused_refreshes_every_tick() {
        let log = Log::default();
        let (host, handle) = Host::new(TICK_PERIOD);
        let task = tokio::spawn(host.run(recording_poller(&log)));

        handle.focus_gained();
        sleep_secs(6.0 * 3.0 + 1.0).await;
        handle.shutdown();
        let poller = task.await.unwrap();

        assert!(poller.is_focused());
        for &id in StreamId::all() {
            // init + focus gain + 3 ticks
            assert_eq!(count(&log, id), 5, "stream {}", id);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_loss_restarts_slow_cadence() {
        let log = Log::default();
        let (host, handle) = Host::new(TICK_PERIOD);
        let state = host.subscribe();
        let task = tokio::spawn(host.run(recording_poller(&log)));

        handle.focus_gained();
        sleep_secs(6.5).await;
        assert_eq!(count(&log, StreamId::Stats), 3);

        handle.focus_lost();
        sleep_secs(54.0).await;
        assert!(!state.borrow().is_focused());
        assert_eq!(count(&log, StreamId::Stats), 3);
        assert_eq!(state.borrow().stream(StreamId::Stats).counter, 9);

        sleep_secs(6.0).await;
        assert_eq!(count(&log, StreamId::Stats), 4);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_handles_dropped() {
        let log = Log::default();
        let (host, handle) = Host::new(TICK_PERIOD);
        let task = tokio::spawn(host.run(recording_poller(&log)));

        drop(handle);
        let poller = task.await.unwrap();
        assert!(!poller.is_focused());
        assert_eq!(log.lock().unwrap().len(), 3);
    }
}
